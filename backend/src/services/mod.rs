//! Business logic services for the Shop Stock Assistant

pub mod export;
pub mod stocks;
pub mod sync;
pub mod uploads;

pub use export::ExportService;
pub use stocks::StocksService;
pub use sync::SyncService;
pub use uploads::UploadService;
