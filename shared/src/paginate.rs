//! Grouped pagination for chat display
//!
//! Stock views are grouped by location and chunked so that every page opens
//! with its location header. Chat messages have a hard size ceiling, so a
//! single location that fits is rendered flat instead.

use std::collections::BTreeMap;

use crate::models::{LocationView, Page, PagedView, StockRecord};

/// Chat transports reject messages beyond this many characters.
pub const FLAT_TEXT_BUDGET: usize = 4096;

/// Render one stock record as a display line.
pub fn format_item_line(record: &StockRecord) -> String {
    format!(
        "• {} — {}",
        record.supplier_article.trim(),
        record.quantity.max(0)
    )
}

/// Render a location-group header line.
pub fn format_group_header(location: &str) -> String {
    format!("📍 {location}")
}

fn location_of(record: &StockRecord) -> String {
    match record.location_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "—".to_string(),
    }
}

/// Deterministic within-group order: quantity descending, then article
/// ascending, then product id ascending.
fn sort_group(group: &mut [&StockRecord]) {
    group.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.supplier_article.cmp(&b.supplier_article))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

fn positive_groups(records: &[StockRecord]) -> BTreeMap<String, Vec<&StockRecord>> {
    let mut groups: BTreeMap<String, Vec<&StockRecord>> = BTreeMap::new();
    for record in records {
        if record.quantity > 0 {
            groups.entry(location_of(record)).or_default().push(record);
        }
    }
    for group in groups.values_mut() {
        sort_group(group);
    }
    groups
}

/// Partition records into display pages of at most `per_page` lines.
///
/// Each page's first line is its location header; a location spanning several
/// pages repeats the header on every one. Pages are numbered globally across
/// groups, locations in ascending name order. Only records with strictly
/// positive quantity participate.
///
/// # Panics
///
/// Panics when `per_page < 2`: a page must fit a header plus one item, so a
/// smaller value is a programming error, not a data condition.
pub fn paginate(records: &[StockRecord], per_page: usize) -> PagedView {
    assert!(
        per_page >= 2,
        "per_page must be at least 2 (header line plus one item line)"
    );

    let groups = positive_groups(records);
    let total_items = groups.values().map(Vec::len).sum();

    let mut pages = Vec::new();
    for (location, group) in &groups {
        let header = format_group_header(location);
        for chunk in group.chunks(per_page - 1) {
            let mut lines = Vec::with_capacity(chunk.len() + 1);
            lines.push(header.clone());
            lines.extend(chunk.iter().map(|record| format_item_line(record)));
            pages.push(Page {
                number: pages.len() + 1,
                lines,
            });
        }
    }

    PagedView {
        total_pages: pages.len(),
        total_items,
        pages,
    }
}

/// View a single location: flat text when it fits the message budget,
/// otherwise the paged structure scoped to that location.
pub fn location_view(records: &[StockRecord], location: &str, per_page: usize) -> LocationView {
    let subset: Vec<StockRecord> = records
        .iter()
        .filter(|record| record.quantity > 0 && location_of(record) == location)
        .cloned()
        .collect();

    let mut refs: Vec<&StockRecord> = subset.iter().collect();
    sort_group(&mut refs);

    let mut lines = vec![format_group_header(location)];
    lines.extend(refs.iter().map(|record| format_item_line(record)));
    let flat = lines.join("\n");

    if flat.chars().count() <= FLAT_TEXT_BUDGET {
        LocationView::Flat(flat)
    } else {
        LocationView::Paged(paginate(&subset, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(article: &str, location: &str, quantity: i64) -> StockRecord {
        StockRecord {
            supplier_article: article.into(),
            location_name: Some(location.into()),
            quantity,
            ..StockRecord::default()
        }
    }

    #[test]
    fn five_items_per_page_three_makes_two_pages() {
        let records: Vec<StockRecord> = (1..=5)
            .map(|i| record(&format!("sku-{i}"), "Moscow", i))
            .collect();

        let view = paginate(&records, 3);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.total_items, 5);
        assert_eq!(view.pages[0].lines.len(), 3);
        assert_eq!(view.pages[1].lines.len(), 2);
        assert_eq!(view.pages[0].lines[0], view.pages[1].lines[0]);
        assert_eq!(view.pages[0].lines[0], "📍 Moscow");
    }

    #[test]
    fn every_page_starts_with_its_group_header() {
        let mut records = Vec::new();
        for i in 0..7 {
            records.push(record(&format!("a-{i}"), "Kazan", 10 + i));
        }
        for i in 0..4 {
            records.push(record(&format!("b-{i}"), "Moscow", 5 + i));
        }

        let view = paginate(&records, 4);
        for page in &view.pages {
            assert!(page.lines[0].starts_with("📍 "));
        }
        // Kazan sorts before Moscow; its 7 items need 3 pages of 3.
        assert_eq!(view.pages[0].lines[0], "📍 Kazan");
        assert_eq!(view.pages[2].lines[0], "📍 Kazan");
        assert_eq!(view.pages[3].lines[0], "📍 Moscow");
        let numbers: Vec<usize> = view.pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_and_negative_quantities_are_excluded() {
        let records = vec![
            record("sku-1", "Moscow", 3),
            record("sku-2", "Moscow", 0),
            record("sku-3", "Moscow", -2),
        ];
        let view = paginate(&records, 10);
        assert_eq!(view.total_items, 1);
        assert_eq!(view.pages[0].lines, vec!["📍 Moscow", "• sku-1 — 3"]);
    }

    #[test]
    fn group_order_is_quantity_desc_then_article_then_product_id() {
        let mut a = record("sku-b", "Moscow", 5);
        a.product_id = Some(2);
        let mut b = record("sku-b", "Moscow", 5);
        b.product_id = Some(1);
        let c = record("sku-a", "Moscow", 5);
        let d = record("sku-z", "Moscow", 9);

        let view = paginate(&[a, b, c, d], 10);
        assert_eq!(
            view.pages[0].lines[1..],
            [
                "• sku-z — 9".to_string(),
                "• sku-a — 5".to_string(),
                "• sku-b — 5".to_string(), // product id 1
                "• sku-b — 5".to_string(), // product id 2
            ]
        );
    }

    #[test]
    #[should_panic(expected = "per_page")]
    fn per_page_below_two_is_a_programming_error() {
        paginate(&[], 1);
    }

    #[test]
    fn short_single_location_renders_flat() {
        let records = vec![record("sku-1", "Moscow", 3), record("sku-2", "Moscow", 1)];
        match location_view(&records, "Moscow", 3) {
            LocationView::Flat(text) => {
                assert_eq!(text, "📍 Moscow\n• sku-1 — 3\n• sku-2 — 1");
            }
            LocationView::Paged(_) => panic!("expected flat view"),
        }
    }

    #[test]
    fn oversized_single_location_falls_back_to_pages() {
        let records: Vec<StockRecord> = (0..300)
            .map(|i| record(&format!("very-long-article-number-{i:04}"), "Moscow", i + 1))
            .collect();
        match location_view(&records, "Moscow", 50) {
            LocationView::Paged(view) => {
                assert!(view.total_pages > 1);
                assert!(view.pages.iter().all(|p| p.lines[0] == "📍 Moscow"));
            }
            LocationView::Flat(_) => panic!("expected paged view"),
        }
    }
}
