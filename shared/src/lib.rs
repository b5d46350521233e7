//! Shared types and domain logic for the Shop Stock Assistant
//!
//! This crate contains the canonical stock schema, the article key
//! normalizer, the header alias table used to classify uploaded sheets, and
//! the display structures handed to the chat frontend.

pub mod article;
pub mod models;
pub mod paginate;
pub mod reconcile;
pub mod schema;
pub mod table;

pub use article::*;
pub use models::*;
pub use schema::*;
pub use table::*;
