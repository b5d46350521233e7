//! Header aliasing and sheet classification
//!
//! Uploaded inventory sheets come from marketplace exports, warehouse
//! software, and hand-maintained spreadsheets, each with its own column
//! naming. A closed alias table maps normalized header spellings onto the
//! canonical field set; classification then only looks at which canonical
//! fields resolved.

use serde::{Deserialize, Serialize};

use crate::table::SheetTable;

/// Canonical fields a sheet column can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SupplierArticle,
    ProductId,
    LocationName,
    Quantity,
    Brand,
    Subject,
    Size,
    Barcode,
    Category,
    Price,
    Discount,
}

impl Field {
    /// Canonical column name used after renaming.
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::SupplierArticle => "supplier_article",
            Field::ProductId => "product_id",
            Field::LocationName => "location_name",
            Field::Quantity => "quantity",
            Field::Brand => "brand",
            Field::Subject => "subject",
            Field::Size => "size",
            Field::Barcode => "barcode",
            Field::Category => "category",
            Field::Price => "price",
            Field::Discount => "discount",
        }
    }
}

/// Classification of an uploaded sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Marketplace-shaped: carries location/product-id/attribute columns.
    Remote,
    /// Generic local inventory sheet: article + quantity only.
    Local,
}

/// Alias table mapping normalized header spellings to canonical fields.
///
/// Keys must already be in `normalize_header` form; several spellings map to
/// one field. The table is data, not logic, so tests can cover it directly.
const HEADER_ALIASES: &[(&str, Field)] = &[
    ("supplierarticle", Field::SupplierArticle),
    ("supplier_article", Field::SupplierArticle),
    ("article", Field::SupplierArticle),
    ("артикул", Field::SupplierArticle),
    ("артикул_поставщика", Field::SupplierArticle),
    ("productid", Field::ProductId),
    ("product_id", Field::ProductId),
    ("nm", Field::ProductId),
    ("nm_id", Field::ProductId),
    ("nmid", Field::ProductId),
    ("код_товара", Field::ProductId),
    ("warehousename", Field::LocationName),
    ("warehouse", Field::LocationName),
    ("warehouse_name", Field::LocationName),
    ("location_name", Field::LocationName),
    ("officename", Field::LocationName),
    ("склад", Field::LocationName),
    ("quantity", Field::Quantity),
    ("qty", Field::Quantity),
    ("stock", Field::Quantity),
    ("amount", Field::Quantity),
    ("количество", Field::Quantity),
    ("кол_во", Field::Quantity),
    ("остаток", Field::Quantity),
    ("brand", Field::Brand),
    ("бренд", Field::Brand),
    ("subject", Field::Subject),
    ("предмет", Field::Subject),
    ("size", Field::Size),
    ("techsize", Field::Size),
    ("tech_size", Field::Size),
    ("размер", Field::Size),
    ("barcode", Field::Barcode),
    ("шк", Field::Barcode),
    ("баркод", Field::Barcode),
    ("штрихкод", Field::Barcode),
    ("category", Field::Category),
    ("категория", Field::Category),
    ("price", Field::Price),
    ("цена", Field::Price),
    ("discount", Field::Discount),
    ("скидка", Field::Discount),
];

/// Columns whose presence marks a sheet as marketplace-shaped.
const REMOTE_HINTS: &[Field] = &[
    Field::ProductId,
    Field::LocationName,
    Field::Brand,
    Field::Subject,
    Field::Size,
];

/// Normalize a raw header for alias lookup: trim, lowercase, fold runs of
/// spaces/hyphens/dashes to a single underscore, collapse repeats.
pub fn normalize_header(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for ch in raw.trim().chars() {
        let is_sep = ch.is_whitespace() || matches!(ch, '-' | '–' | '—' | '_');
        if is_sep {
            pending_sep = true;
            continue;
        }
        if pending_sep && !normalized.is_empty() {
            normalized.push('_');
        }
        pending_sep = false;
        for lower in ch.to_lowercase() {
            normalized.push(lower);
        }
    }

    normalized
}

/// Resolve a raw header against the alias table.
pub fn resolve_header(raw: &str) -> Option<Field> {
    let normalized = normalize_header(raw);
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, field)| *field)
}

/// Rename recognized columns to their canonical names.
///
/// Order-preserving; unrecognized columns pass through untouched. When two
/// original columns would resolve to the same field, the first wins and the
/// later duplicate keeps its original name.
pub fn rename_columns(table: &SheetTable) -> SheetTable {
    let mut seen: Vec<Field> = Vec::new();
    let columns = table
        .columns
        .iter()
        .map(|column| match resolve_header(column) {
            Some(field) if !seen.contains(&field) => {
                seen.push(field);
                field.column_name().to_string()
            }
            _ => column.clone(),
        })
        .collect();

    SheetTable {
        columns,
        rows: table.rows.clone(),
    }
}

/// Classify a sheet by which canonical fields its headers resolve to.
///
/// Unclassifiable (`None`) unless both the article and quantity fields
/// resolve; any remote-hint column then promotes the sheet to `Remote`.
pub fn classify(table: &SheetTable) -> Option<TableKind> {
    let mut resolved: Vec<Field> = Vec::new();
    for column in &table.columns {
        if let Some(field) = resolve_header(column) {
            if !resolved.contains(&field) {
                resolved.push(field);
            }
        }
    }

    if !resolved.contains(&Field::SupplierArticle) || !resolved.contains(&Field::Quantity) {
        return None;
    }

    if REMOTE_HINTS.iter().any(|hint| resolved.contains(hint)) {
        Some(TableKind::Remote)
    } else {
        Some(TableKind::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> SheetTable {
        SheetTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn header_normalization_folds_separators() {
        assert_eq!(normalize_header("  Кол-во  "), "кол_во");
        assert_eq!(normalize_header("nm id"), "nm_id");
        assert_eq!(normalize_header("Tech — Size"), "tech_size");
        assert_eq!(normalize_header("supplier__article"), "supplier_article");
    }

    #[test]
    fn header_normalization_is_idempotent() {
        for raw in ["Кол-во", "nm id", "Warehouse Name", "остаток"] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once);
        }
    }

    #[test]
    fn aliases_resolve_across_locales() {
        assert_eq!(resolve_header("Артикул"), Some(Field::SupplierArticle));
        assert_eq!(resolve_header("supplierArticle"), Some(Field::SupplierArticle));
        assert_eq!(resolve_header("Остаток"), Some(Field::Quantity));
        assert_eq!(resolve_header("Кол-во"), Some(Field::Quantity));
        assert_eq!(resolve_header("Склад"), Some(Field::LocationName));
        assert_eq!(resolve_header("nmId"), Some(Field::ProductId));
        assert_eq!(resolve_header("ШК"), Some(Field::Barcode));
        assert_eq!(resolve_header("что-то"), None);
    }

    #[test]
    fn rename_keeps_first_duplicate_only() {
        let renamed = rename_columns(&table(&["Артикул", "article", "Кол-во"]));
        assert_eq!(
            renamed.columns,
            vec!["supplier_article", "article", "quantity"]
        );
    }

    #[test]
    fn rename_is_idempotent() {
        let once = rename_columns(&table(&["Артикул", "nmId", "Склад", "Остаток"]));
        let twice = rename_columns(&once);
        assert_eq!(once.columns, twice.columns);
    }

    #[test]
    fn classify_requires_article_and_quantity() {
        assert_eq!(classify(&table(&["Артикул"])), None);
        assert_eq!(classify(&table(&["Кол-во"])), None);
        assert_eq!(classify(&table(&["name", "comment"])), None);
    }

    #[test]
    fn classify_local_without_hints() {
        assert_eq!(
            classify(&table(&["Артикул", "Количество"])),
            Some(TableKind::Local)
        );
    }

    #[test]
    fn classify_remote_on_any_hint() {
        assert_eq!(
            classify(&table(&["Артикул", "Кол-во", "Склад"])),
            Some(TableKind::Remote)
        );
        assert_eq!(
            classify(&table(&["article", "qty", "nmId"])),
            Some(TableKind::Remote)
        );
        assert_eq!(
            classify(&table(&["article", "qty", "Бренд"])),
            Some(TableKind::Remote)
        );
    }
}
