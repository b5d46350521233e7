//! Header aliasing and sheet classification tests
//!
//! Covers the closed alias table, header normalization, and the
//! REMOTE/LOCAL/unrecognized classification rules.

use proptest::prelude::*;

use shared::schema::{classify, normalize_header, rename_columns, resolve_header, Field, TableKind};
use shared::table::SheetTable;

fn table(columns: &[&str]) -> SheetTable {
    SheetTable {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: Vec::new(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_spellings_fold_to_quantity() {
        for spelling in ["Quantity", "quantity", "Количество", "Кол-во", "кол во", "Остаток", "qty"] {
            assert_eq!(resolve_header(spelling), Some(Field::Quantity), "{spelling}");
        }
    }

    #[test]
    fn test_spellings_fold_to_article() {
        for spelling in ["supplierArticle", "Артикул", "article", "Supplier Article"] {
            assert_eq!(
                resolve_header(spelling),
                Some(Field::SupplierArticle),
                "{spelling}"
            );
        }
    }

    #[test]
    fn test_marketplace_export_classifies_remote() {
        let sheet = table(&["Артикул", "nmId", "Склад", "Кол-во", "Бренд", "Размер"]);
        assert_eq!(classify(&sheet), Some(TableKind::Remote));
    }

    #[test]
    fn test_plain_inventory_classifies_local() {
        let sheet = table(&["Артикул", "Остаток", "Комментарий"]);
        assert_eq!(classify(&sheet), Some(TableKind::Local));
    }

    #[test]
    fn test_missing_required_field_unclassifiable() {
        assert_eq!(classify(&table(&["Артикул", "Цена"])), None);
        assert_eq!(classify(&table(&["Кол-во", "Склад"])), None);
    }

    #[test]
    fn test_rename_preserves_unknown_columns_in_place() {
        let renamed = rename_columns(&table(&["id", "Артикул", "note", "Остаток"]));
        assert_eq!(
            renamed.columns,
            vec!["id", "supplier_article", "note", "quantity"]
        );
    }

    #[test]
    fn test_rename_drops_later_duplicates() {
        let renamed = rename_columns(&table(&["Кол-во", "Остаток"]));
        assert_eq!(renamed.columns, vec!["quantity", "Остаток"]);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Header normalization is idempotent.
        #[test]
        fn prop_normalize_header_idempotent(raw in ".*") {
            let once = normalize_header(&raw);
            prop_assert_eq!(normalize_header(&once), once);
        }

        /// Normalized headers never carry separators other than underscores.
        #[test]
        fn prop_no_raw_separators(raw in ".*") {
            let normalized = normalize_header(&raw);
            prop_assert!(!normalized.contains(' '));
            prop_assert!(!normalized.contains('-'));
            prop_assert!(!normalized.contains("__"));
            prop_assert!(!normalized.starts_with('_'));
        }

        /// Renaming is idempotent: a second pass changes nothing.
        #[test]
        fn prop_rename_idempotent(
            columns in proptest::collection::vec("[a-zA-Zа-яА-Я -]{0,12}", 0..6)
        ) {
            let sheet = SheetTable {
                columns,
                rows: Vec::new(),
            };
            let once = rename_columns(&sheet);
            let twice = rename_columns(&once);
            prop_assert_eq!(once.columns, twice.columns);
        }

        /// Classification never panics and is stable under renaming.
        #[test]
        fn prop_classify_total(
            columns in proptest::collection::vec("[a-zA-Zа-яА-Я -]{0,12}", 0..6)
        ) {
            let sheet = SheetTable { columns, rows: Vec::new() };
            let direct = classify(&sheet);
            let renamed = classify(&rename_columns(&sheet));
            prop_assert_eq!(direct, renamed);
        }
    }
}
