//! Spreadsheet exports
//!
//! Renders canonical tables to xlsx: a single sheet, one header row, no
//! index column, column widths sized to content. Files land in the
//! account's exports directory and the raw bytes go back to the caller for
//! download.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

use shared::models::{ReconciledRow, StockRecord};
use shared::table::{parse_decimal_cell, SheetTable};

use crate::error::{AppError, AppResult};
use crate::external::warehouse::WarehouseStockRow;
use crate::storage::AccountStore;

const MAX_COLUMN_WIDTH: usize = 60;

/// Serialize a table to xlsx bytes under the given sheet label.
///
/// Numeric-looking cells are written as numbers so spreadsheet software
/// sorts and sums them; everything else stays text.
pub fn table_to_xlsx_bytes(table: &SheetTable, sheet_label: &str) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let to_xlsx_err = |err: rust_xlsxwriter::XlsxError| AppError::StorageError(err.to_string());

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_label).map_err(to_xlsx_err)?;

        for (col, name) in table.columns.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, name, &header_format)
                .map_err(to_xlsx_err)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                let position = (row_idx as u32 + 1, col as u16);
                match parse_decimal_cell(cell) {
                    Some(value) => {
                        let number = value.to_f64().unwrap_or(0.0);
                        sheet
                            .write_number(position.0, position.1, number)
                            .map_err(to_xlsx_err)?;
                    }
                    None => {
                        sheet
                            .write_string(position.0, position.1, cell)
                            .map_err(to_xlsx_err)?;
                    }
                }
            }
        }

        for (col, name) in table.columns.iter().enumerate() {
            let content_width = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            let width = name.chars().count().max(content_width).min(MAX_COLUMN_WIDTH) + 2;
            sheet
                .set_column_width(col as u16, width as f64)
                .map_err(to_xlsx_err)?;
        }
    }

    workbook.save_to_buffer().map_err(to_xlsx_err)
}

fn opt_str(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

fn opt_id(value: Option<i64>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

/// One row per record without location, sorted by (article, product id).
pub fn stocks_to_table_all(records: &[StockRecord]) -> SheetTable {
    let mut sorted: Vec<&StockRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.supplier_article
            .trim()
            .cmp(b.supplier_article.trim())
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let mut table = SheetTable::new(
        [
            "Article",
            "Product-ID",
            "Barcode",
            "Quantity",
            "In-Transit-To-Customer",
            "In-Transit-From-Customer",
            "Quantity-Full",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    );
    for record in sorted {
        table.push_row(vec![
            record.supplier_article.trim().to_string(),
            opt_id(record.product_id),
            opt_str(&record.barcode),
            record.quantity.to_string(),
            record.in_transit_to_customer.to_string(),
            record.in_transit_from_customer.to_string(),
            record.quantity_full.to_string(),
        ]);
    }
    table
}

/// One row per record with location first, sorted by (location, article,
/// product id).
pub fn stocks_to_table_by_location(records: &[StockRecord]) -> SheetTable {
    let mut sorted: Vec<&StockRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        opt_str(&a.location_name)
            .cmp(&opt_str(&b.location_name))
            .then_with(|| a.supplier_article.trim().cmp(b.supplier_article.trim()))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let mut table = SheetTable::new(
        [
            "Location",
            "Article",
            "Product-ID",
            "Barcode",
            "Quantity",
            "In-Transit-To-Customer",
            "In-Transit-From-Customer",
            "Quantity-Full",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    );
    for record in sorted {
        table.push_row(vec![
            opt_str(&record.location_name),
            record.supplier_article.trim().to_string(),
            opt_id(record.product_id),
            opt_str(&record.barcode),
            record.quantity.to_string(),
            record.in_transit_to_customer.to_string(),
            record.in_transit_from_customer.to_string(),
            record.quantity_full.to_string(),
        ]);
    }
    table
}

/// Full per-record detail in the canonical export column order, sorted by
/// location, quantity descending, article, product id.
pub fn stocks_to_table_detailed(records: &[StockRecord]) -> SheetTable {
    let mut sorted: Vec<&StockRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        opt_str(&a.location_name)
            .cmp(&opt_str(&b.location_name))
            .then_with(|| b.quantity.cmp(&a.quantity))
            .then_with(|| a.supplier_article.trim().cmp(b.supplier_article.trim()))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let mut table = SheetTable::new(
        [
            "Location",
            "Article",
            "Product-ID",
            "Barcode",
            "Quantity",
            "Category",
            "Subject",
            "Brand",
            "Size",
            "Price",
            "Discount",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    );
    for record in sorted {
        table.push_row(vec![
            opt_str(&record.location_name),
            record.supplier_article.trim().to_string(),
            opt_id(record.product_id),
            opt_str(&record.barcode),
            record.quantity.to_string(),
            opt_str(&record.category),
            opt_str(&record.subject),
            opt_str(&record.brand),
            opt_str(&record.size),
            record.price.map(|p| p.to_string()).unwrap_or_default(),
            record.discount.map(|d| d.to_string()).unwrap_or_default(),
        ]);
    }
    table
}

/// Warehouse system stock report, sorted by (article, name).
pub fn warehouse_to_table(rows: &[WarehouseStockRow]) -> SheetTable {
    let mut sorted: Vec<&WarehouseStockRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        a.article
            .trim()
            .cmp(b.article.trim())
            .then_with(|| a.name.trim().cmp(b.name.trim()))
    });

    let mut table = SheetTable::new(
        ["Article", "Name", "Stock", "Reserve", "In-Transit", "Available"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    for row in sorted {
        table.push_row(vec![
            row.article.trim().to_string(),
            row.name.trim().to_string(),
            row.stock.to_string(),
            row.reserve.to_string(),
            row.in_transit.to_string(),
            row.quantity.to_string(),
        ]);
    }
    table
}

/// Reconciled output in the canonical export column order.
pub fn reconciled_to_table(rows: &[ReconciledRow]) -> SheetTable {
    let mut table = SheetTable::new(
        [
            "Location",
            "Article",
            "Product-ID",
            "Barcode",
            "Quantity",
            "Category",
            "Subject",
            "Brand",
            "Size",
            "Price",
            "Discount",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    );
    for row in rows {
        table.push_row(vec![
            row.location_label.clone(),
            row.article_key.clone(),
            opt_id(row.product_id),
            opt_str(&row.barcode),
            row.local_quantity.to_string(),
            opt_str(&row.category),
            opt_str(&row.subject),
            opt_str(&row.brand),
            opt_str(&row.size),
            row.price.map(|p| p.to_string()).unwrap_or_default(),
            row.discount.map(|d| d.to_string()).unwrap_or_default(),
        ]);
    }
    table
}

/// A finished export on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: PathBuf,
    pub rows: usize,
    pub created_at: DateTime<Utc>,
}

/// Writes export files into the account's exports directory.
#[derive(Clone)]
pub struct ExportService {
    store: AccountStore,
}

impl ExportService {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    fn write(
        &self,
        account: &str,
        prefix: &str,
        sheet_label: &str,
        table: &SheetTable,
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        let created_at = Utc::now();
        let filename = format!("{prefix}_{}.xlsx", created_at.format("%Y%m%d_%H%M"));
        let path = self.store.export_path(account, &filename)?;

        let bytes = table_to_xlsx_bytes(table, sheet_label)?;
        AccountStore::write_atomic(&path, &bytes)?;

        let result = ExportResult {
            path,
            rows: table.row_count(),
            created_at,
        };
        tracing::info!(
            account,
            kind = prefix,
            rows = result.rows,
            file = %result.path.display(),
            "export ready"
        );
        Ok((result, bytes))
    }

    pub fn export_stocks_all(
        &self,
        account: &str,
        records: &[StockRecord],
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        self.write(account, "stocks_ALL", "All stocks", &stocks_to_table_all(records))
    }

    pub fn export_stocks_by_location(
        &self,
        account: &str,
        records: &[StockRecord],
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        self.write(
            account,
            "stocks_BY_LOCATION",
            "By location",
            &stocks_to_table_by_location(records),
        )
    }

    pub fn export_store_stocks(
        &self,
        account: &str,
        records: &[StockRecord],
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        self.write(
            account,
            "stocks_STORE",
            "Store stocks",
            &stocks_to_table_detailed(records),
        )
    }

    pub fn export_reconciled(
        &self,
        account: &str,
        rows: &[ReconciledRow],
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        self.write(account, "reconciled", "Reconciled", &reconciled_to_table(rows))
    }

    pub fn export_warehouse_report(
        &self,
        account: &str,
        rows: &[WarehouseStockRow],
    ) -> AppResult<(ExportResult, Vec<u8>)> {
        self.write(account, "warehouse_ALL", "Warehouse", &warehouse_to_table(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(article: &str, location: &str, product_id: i64, quantity: i64) -> StockRecord {
        StockRecord {
            supplier_article: article.into(),
            location_name: Some(location.into()),
            product_id: Some(product_id),
            quantity,
            ..StockRecord::default()
        }
    }

    #[test]
    fn all_table_sorts_by_article_then_product_id() {
        let table = stocks_to_table_all(&[
            record("b", "Moscow", 2, 1),
            record("a", "Kazan", 9, 2),
            record("b", "Kazan", 1, 3),
        ]);
        assert_eq!(table.columns[0], "Article");
        assert_eq!(table.rows[0][0], "a");
        assert_eq!(table.rows[1][0], "b");
        assert_eq!(table.rows[1][1], "1");
        assert_eq!(table.rows[2][1], "2");
    }

    #[test]
    fn by_location_table_leads_with_location() {
        let table = stocks_to_table_by_location(&[
            record("a", "Moscow", 1, 1),
            record("b", "Kazan", 2, 2),
        ]);
        assert_eq!(table.columns[0], "Location");
        assert_eq!(table.rows[0][0], "Kazan");
        assert_eq!(table.rows[1][0], "Moscow");
    }

    #[test]
    fn warehouse_table_sorts_by_article() {
        use rust_decimal::Decimal;
        let row = |article: &str, quantity: i64| WarehouseStockRow {
            article: article.to_string(),
            name: String::new(),
            stock: Decimal::from(quantity),
            reserve: Decimal::ZERO,
            in_transit: Decimal::ZERO,
            quantity: Decimal::from(quantity),
        };
        let table = warehouse_to_table(&[row("b", 1), row("a", 2)]);
        assert_eq!(table.columns[0], "Article");
        assert_eq!(table.rows[0][0], "a");
        assert_eq!(table.rows[1][0], "b");
    }

    #[test]
    fn detailed_table_sorts_quantity_descending_within_location() {
        let table = stocks_to_table_detailed(&[
            record("a", "Moscow", 1, 3),
            record("b", "Moscow", 2, 9),
            record("c", "Kazan", 3, 1),
        ]);
        assert_eq!(table.columns.len(), 11);
        assert_eq!(table.rows[0][0], "Kazan");
        assert_eq!(table.rows[1][1], "b"); // Moscow, quantity 9 first
        assert_eq!(table.rows[2][1], "a");
    }

    #[test]
    fn xlsx_bytes_look_like_a_workbook() {
        let table = stocks_to_table_all(&[record("a", "Moscow", 1, 5)]);
        let bytes = table_to_xlsx_bytes(&table, "All stocks").unwrap();
        // xlsx is a zip container: PK magic.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn export_writes_into_account_dir() {
        let dir = tempfile::tempdir().unwrap();
        let service = ExportService::new(AccountStore::new(dir.path()));
        let (result, bytes) = service
            .export_stocks_all("shop1", &[record("a", "Moscow", 1, 5)])
            .unwrap();
        assert_eq!(result.rows, 1);
        assert!(result.path.exists());
        assert!(!bytes.is_empty());
        assert!(result
            .path
            .to_string_lossy()
            .contains("shop1/exports/stocks_ALL_"));
    }
}
