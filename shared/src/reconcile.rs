//! Reconciliation engine
//!
//! Merges a marketplace-shaped dataset with a local inventory dataset on the
//! normalized article key. The remote side is deduplicated (first occurrence
//! wins), the local side is aggregated (quantities summed per key), and the
//! result is a left-join that keeps every remote key.

use std::collections::{HashMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::article::normalize_article;
use crate::models::{MergeStats, NormalizedRow, ReconciledRow, ReconciliationStats, StockRecord};
use crate::schema::rename_columns;
use crate::table::{parse_decimal_cell, parse_id_cell, SheetTable};

/// A sheet failed required-column validation.
///
/// Classification failure is an expected outcome for user uploads, so it is
/// a value, not a panic; the message names the two required logical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("remote stock format not recognized: supplier article and quantity columns are required")]
    RemoteUnrecognized,
    #[error("local stock format not recognized: supplier article and quantity columns are required")]
    LocalUnrecognized,
}

/// Validate and normalize a marketplace-shaped sheet.
///
/// Rows with a blank article are dropped; everything else is carried through,
/// with unparseable quantities coerced to zero.
pub fn prepare_remote(table: &SheetTable) -> Result<Vec<NormalizedRow>, FormatError> {
    extract_rows(table).ok_or(FormatError::RemoteUnrecognized)
}

/// Validate and normalize a local inventory sheet.
pub fn prepare_local(table: &SheetTable) -> Result<Vec<NormalizedRow>, FormatError> {
    extract_rows(table).ok_or(FormatError::LocalUnrecognized)
}

fn extract_rows(table: &SheetTable) -> Option<Vec<NormalizedRow>> {
    let renamed = rename_columns(table);
    let article_idx = renamed.column_index("supplier_article")?;
    let quantity_idx = renamed.column_index("quantity")?;

    let optional = |name: &str| renamed.column_index(name);
    let product_idx = optional("product_id");
    let location_idx = optional("location_name");
    let brand_idx = optional("brand");
    let subject_idx = optional("subject");
    let size_idx = optional("size");
    let barcode_idx = optional("barcode");
    let category_idx = optional("category");
    let price_idx = optional("price");
    let discount_idx = optional("discount");

    let text_at = |row: &[String], idx: Option<usize>| -> Option<String> {
        let cell = idx.and_then(|i| row.get(i))?.trim();
        (!cell.is_empty()).then(|| cell.to_string())
    };
    let decimal_at = |row: &[String], idx: Option<usize>| -> Option<Decimal> {
        idx.and_then(|i| row.get(i)).and_then(|c| parse_decimal_cell(c))
    };

    let mut rows = Vec::with_capacity(renamed.rows.len());
    for row in &renamed.rows {
        let article = row.get(article_idx).map(|c| c.trim()).unwrap_or("");
        if article.is_empty() {
            continue;
        }
        rows.push(NormalizedRow {
            supplier_article: article.to_string(),
            product_id: product_idx
                .and_then(|i| row.get(i))
                .and_then(|c| parse_id_cell(c)),
            location_name: text_at(row, location_idx),
            quantity: row
                .get(quantity_idx)
                .and_then(|c| parse_decimal_cell(c))
                .unwrap_or(Decimal::ZERO),
            brand: text_at(row, brand_idx),
            subject: text_at(row, subject_idx),
            size: text_at(row, size_idx),
            barcode: text_at(row, barcode_idx),
            category: text_at(row, category_idx),
            price: decimal_at(row, price_idx),
            discount: decimal_at(row, discount_idx),
        });
    }
    Some(rows)
}

/// Round a summed quantity half-up (0.5 away from zero) and cast to integer.
pub fn round_half_up(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Left-join the deduplicated remote set with the aggregated local set.
///
/// Every distinct remote key appears exactly once in the output, sorted by
/// key ascending; unmatched keys carry `local_quantity = 0`. The location
/// label on every row is overwritten with `store_label`.
pub fn reconcile(
    remote_rows: &[NormalizedRow],
    local_rows: &[NormalizedRow],
    store_label: &str,
) -> (Vec<ReconciledRow>, ReconciliationStats) {
    let mut stats = ReconciliationStats {
        remote_rows: remote_rows.len(),
        local_rows: local_rows.len(),
        ..ReconciliationStats::default()
    };

    // First occurrence wins, in original read order.
    let mut seen: HashSet<String> = HashSet::new();
    let mut deduped: Vec<(String, &NormalizedRow)> = Vec::new();
    for row in remote_rows {
        let key = row.article_key();
        if seen.insert(key.clone()) {
            deduped.push((key, row));
        }
    }
    stats.remote_unique = deduped.len();

    let mut local_totals: HashMap<String, Decimal> = HashMap::new();
    for row in local_rows {
        *local_totals.entry(row.article_key()).or_insert(Decimal::ZERO) += row.quantity;
    }

    let mut output: Vec<ReconciledRow> = deduped
        .into_iter()
        .map(|(key, row)| {
            let local_quantity = match local_totals.get(&key) {
                Some(total) => {
                    stats.matched_rows += 1;
                    round_half_up(*total)
                }
                None => 0,
            };
            ReconciledRow {
                location_label: store_label.to_string(),
                article_key: key,
                product_id: row.product_id,
                barcode: row.barcode.clone(),
                category: row.category.clone(),
                subject: row.subject.clone(),
                brand: row.brand.clone(),
                size: row.size.clone(),
                price: row.price,
                discount: row.discount,
                local_quantity,
            }
        })
        .collect();

    output.sort_by(|a, b| a.article_key.cmp(&b.article_key));
    (output, stats)
}

/// Overlay secondary-source quantities onto marketplace records.
///
/// `quantities` must be keyed by normalized article key. Matched records get
/// the half-up-rounded secondary quantity; every record's location is
/// relabelled to the configured store name.
pub fn apply_warehouse_quantities(
    records: &[StockRecord],
    quantities: &HashMap<String, Decimal>,
    store_label: &str,
) -> (Vec<StockRecord>, MergeStats) {
    let mut stats = MergeStats {
        rows_total: records.len(),
        ..MergeStats::default()
    };

    let merged = records
        .iter()
        .map(|record| {
            let mut row = record.clone();
            row.location_name = Some(store_label.to_string());
            match quantities.get(&normalize_article(&record.supplier_article)) {
                Some(quantity) => {
                    row.quantity = round_half_up(*quantity);
                    stats.matched += 1;
                }
                None => stats.unmatched += 1,
            }
            row
        })
        .collect();

    (merged, stats)
}
