//! Upload ingestion
//!
//! Users drop in whatever their tooling produces: xlsx workbooks, CSVs with
//! comma/semicolon/tab delimiters, mixed-locale headers. Parsing is a
//! fallback chain; classification runs on the parsed table and the two most
//! recent recognized uploads are stashed per account so reconciliation can be
//! re-run without re-uploading.

use chrono::Utc;
use serde::Serialize;

use calamine::{open_workbook_auto_from_rs, DataType, Reader};

use shared::models::{ReconciledRow, ReconciliationStats};
use shared::reconcile::{prepare_local, prepare_remote, reconcile};
use shared::schema::{classify, rename_columns, TableKind};
use shared::table::SheetTable;

use crate::error::{AppError, AppResult};
use crate::storage::AccountStore;

/// Parse an uploaded byte payload into a table.
///
/// `.csv` goes straight to the CSV reader; anything else is tried as a
/// workbook first with a CSV fallback. The CSV reader itself sniffs the
/// delimiter from the header line before trying comma, semicolon, and tab.
pub fn parse_table(data: &[u8], filename: Option<&str>) -> AppResult<SheetTable> {
    let extension = filename
        .and_then(|name| name.rsplit('.').next())
        .map(str::to_lowercase);

    if extension.as_deref() == Some("csv") {
        return read_csv(data);
    }

    match read_xlsx(data) {
        Ok(table) => Ok(table),
        Err(_) => read_csv(data),
    }
}

fn read_xlsx(data: &[u8]) -> AppResult<SheetTable> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|_| AppError::UnreadableFile)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(AppError::UnreadableFile)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|_| AppError::UnreadableFile)?;

    let mut rows_iter = range.rows();
    let columns: Vec<String> = rows_iter
        .next()
        .ok_or(AppError::UnreadableFile)?
        .iter()
        .map(|cell| cell.as_string().unwrap_or_default())
        .collect();

    let mut table = SheetTable::new(columns);
    for row in rows_iter {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell.as_string().unwrap_or_default())
            .collect();
        if cells.iter().any(|cell| !cell.trim().is_empty()) {
            table.push_row(cells);
        }
    }
    Ok(table)
}

fn read_csv(data: &[u8]) -> AppResult<SheetTable> {
    let mut candidates = vec![sniff_delimiter(data)];
    for delimiter in [b',', b';', b'\t'] {
        if !candidates.contains(&delimiter) {
            candidates.push(delimiter);
        }
    }

    let mut single_column_fallback = None;
    for delimiter in candidates {
        if let Ok(table) = read_csv_with(data, delimiter) {
            if table.columns.len() > 1 {
                return Ok(table);
            }
            single_column_fallback.get_or_insert(table);
        }
    }
    single_column_fallback.ok_or(AppError::UnreadableFile)
}

/// Pick the most frequent candidate delimiter on the header line.
fn sniff_delimiter(data: &[u8]) -> u8 {
    let header = data.split(|byte| *byte == b'\n').next().unwrap_or(data);
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|delimiter| header.iter().filter(|byte| *byte == delimiter).count())
        .filter(|delimiter| header.contains(delimiter))
        .unwrap_or(b',')
}

fn read_csv_with(data: &[u8], delimiter: u8) -> AppResult<SheetTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|_| AppError::UnreadableFile)?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(AppError::UnreadableFile);
    }

    let width = columns.len();
    let mut table = SheetTable::new(columns);
    for record in reader.records() {
        let record = record.map_err(|_| AppError::UnreadableFile)?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(width, String::new());
        table.push_row(cells);
    }
    Ok(table)
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub kind: TableKind,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Stash, reload, and re-reconcile classified uploads for an account.
#[derive(Clone)]
pub struct UploadService {
    store: AccountStore,
}

impl UploadService {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    /// Parse, classify, canonical-rename, and stash one upload.
    pub fn ingest(
        &self,
        account: &str,
        data: &[u8],
        filename: Option<&str>,
    ) -> AppResult<UploadOutcome> {
        let table = parse_table(data, filename)?;
        let kind = classify(&table).ok_or(AppError::UnclassifiedSheet)?;
        let renamed = rename_columns(&table);

        self.stash_table(account, kind_slug(kind), &renamed)?;
        tracing::info!(
            account,
            kind = kind_slug(kind),
            rows = renamed.row_count(),
            "upload stashed"
        );

        Ok(UploadOutcome {
            kind,
            rows: renamed.row_count(),
            columns: renamed.columns,
        })
    }

    fn stash_table(&self, account: &str, kind: &str, table: &SheetTable) -> AppResult<()> {
        let payload = serde_json::to_vec_pretty(table)
            .map_err(|err| AppError::StorageError(err.to_string()))?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();

        AccountStore::write_atomic(&self.store.upload_path(account, kind)?, &payload)?;
        AccountStore::write_atomic(
            &self.store.upload_snapshot_path(account, kind, &stamp)?,
            &payload,
        )
    }

    /// Latest stashed upload of the given kind, if any.
    pub fn load_latest(&self, account: &str, kind: TableKind) -> AppResult<Option<SheetTable>> {
        let path = self.store.upload_path(account, kind_slug(kind))?;
        match AccountStore::read(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| AppError::StorageError(err.to_string())),
            None => Ok(None),
        }
    }

    /// Re-run reconciliation from the stashed remote and local uploads.
    ///
    /// `None` when either stash is missing. The reconciled rows are stashed
    /// as `result.json` alongside the inputs.
    pub fn recompute_result(
        &self,
        account: &str,
        store_label: &str,
    ) -> AppResult<Option<(Vec<ReconciledRow>, ReconciliationStats)>> {
        let Some(remote_table) = self.load_latest(account, TableKind::Remote)? else {
            return Ok(None);
        };
        let Some(local_table) = self.load_latest(account, TableKind::Local)? else {
            return Ok(None);
        };

        let remote_rows = prepare_remote(&remote_table)?;
        let local_rows = prepare_local(&local_table)?;
        let (rows, stats) = reconcile(&remote_rows, &local_rows, store_label);

        let payload = serde_json::to_vec_pretty(&rows)
            .map_err(|err| AppError::StorageError(err.to_string()))?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        AccountStore::write_atomic(&self.store.upload_path(account, "result")?, &payload)?;
        AccountStore::write_atomic(
            &self.store.upload_snapshot_path(account, "result", &stamp)?,
            &payload,
        )?;

        Ok(Some((rows, stats)))
    }
}

fn kind_slug(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Remote => "remote",
        TableKind::Local => "local",
    }
}

/// Preview lines for chat display, capped at `limit` rows.
pub fn build_result_preview(rows: &[ReconciledRow], limit: usize) -> (Vec<String>, usize) {
    let lines = rows
        .iter()
        .take(limit)
        .map(|row| format!("• {} — {}", row.article_key, row.local_quantity))
        .collect();
    (lines, rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_semicolons_is_sniffed() {
        let data = "Артикул;Количество\nsku-1;4\nsku-2;7\n".as_bytes();
        let table = parse_table(data, Some("stock.csv")).unwrap();
        assert_eq!(table.columns, vec!["Артикул", "Количество"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, "Количество"), Some("7"));
    }

    #[test]
    fn csv_with_tabs_falls_through() {
        let data = "article\tqty\nsku-1\t4\n".as_bytes();
        let table = parse_table(data, Some("stock.csv")).unwrap();
        assert_eq!(table.columns, vec!["article", "qty"]);
    }

    #[test]
    fn unknown_extension_falls_back_to_csv() {
        let data = "article,qty\nsku-1,4\n".as_bytes();
        let table = parse_table(data, Some("stock.bin")).unwrap();
        assert_eq!(table.columns, vec!["article", "qty"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn short_rows_are_padded() {
        let data = "article,qty,comment\nsku-1,4\n".as_bytes();
        let table = parse_table(data, Some("stock.csv")).unwrap();
        assert_eq!(table.cell(0, "comment"), Some(""));
    }

    #[test]
    fn ingest_classifies_and_stash_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(AccountStore::new(dir.path()));

        let outcome = service
            .ingest("shop1", "Артикул;Количество\nsku-1;4\n".as_bytes(), Some("local.csv"))
            .unwrap();
        assert_eq!(outcome.kind, TableKind::Local);
        assert_eq!(outcome.rows, 1);
        assert_eq!(outcome.columns, vec!["supplier_article", "quantity"]);

        let stashed = service.load_latest("shop1", TableKind::Local).unwrap().unwrap();
        assert_eq!(stashed.cell(0, "supplier_article"), Some("sku-1"));
    }

    #[test]
    fn ingest_rejects_unclassifiable_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(AccountStore::new(dir.path()));
        let err = service
            .ingest("shop1", b"name,comment\nfoo,bar\n", Some("junk.csv"))
            .unwrap_err();
        assert!(matches!(err, AppError::UnclassifiedSheet));
    }

    #[test]
    fn recompute_needs_both_stashes() {
        let dir = tempfile::tempdir().unwrap();
        let service = UploadService::new(AccountStore::new(dir.path()));
        service
            .ingest("shop1", "Артикул;Количество\nsku-1;4\n".as_bytes(), Some("local.csv"))
            .unwrap();
        assert!(service.recompute_result("shop1", "Store").unwrap().is_none());

        service
            .ingest(
                "shop1",
                "Артикул;nmId;Склад;Кол-во\nsku-1;11;Moscow;5\nsku-2;21;Moscow;9\n".as_bytes(),
                Some("remote.csv"),
            )
            .unwrap();

        let (rows, stats) = service
            .recompute_result("shop1", "Store")
            .unwrap()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(stats.matched_rows, 1);
        let sku1 = rows.iter().find(|r| r.article_key == "SKU-1").unwrap();
        assert_eq!(sku1.local_quantity, 4);
        assert_eq!(sku1.location_label, "Store");
    }
}
