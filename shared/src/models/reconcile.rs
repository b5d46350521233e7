//! Reconciliation input and output rows

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::article::normalize_article;
use crate::models::stock::StockRecord;

/// A schema-classified row after header-alias resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub supplier_article: String,
    pub product_id: Option<i64>,
    pub location_name: Option<String>,
    pub quantity: Decimal,
    pub brand: Option<String>,
    pub subject: Option<String>,
    pub size: Option<String>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

impl NormalizedRow {
    /// Join key for this row.
    pub fn article_key(&self) -> String {
        normalize_article(&self.supplier_article)
    }
}

impl From<&StockRecord> for NormalizedRow {
    fn from(record: &StockRecord) -> Self {
        Self {
            supplier_article: record.supplier_article.clone(),
            product_id: record.product_id,
            location_name: record.location_name.clone(),
            quantity: Decimal::from(record.quantity),
            brand: record.brand.clone(),
            subject: record.subject.clone(),
            size: record.size.clone(),
            barcode: record.barcode.clone(),
            category: record.category.clone(),
            price: record.price,
            discount: record.discount,
        }
    }
}

/// One row of the reconciled output table.
///
/// Descriptive fields come from the first-seen remote row for the key; the
/// location label is always the configured store name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    pub location_label: String,
    pub article_key: String,
    pub product_id: Option<i64>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub subject: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    /// Aggregated quantity from the local source, 0 when unmatched.
    pub local_quantity: i64,
}

/// Counters describing one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationStats {
    /// Remote rows remaining after blank-article cleanup, before dedup.
    pub remote_rows: usize,
    /// Distinct remote article keys after dedup.
    pub remote_unique: usize,
    /// Local rows remaining after blank-article cleanup.
    pub local_rows: usize,
    /// Remote keys that found at least one local row.
    pub matched_rows: usize,
}

/// Counters for the secondary-source quantity overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub matched: usize,
    pub unmatched: usize,
    pub rows_total: usize,
}
