//! Pagination tests
//!
//! Covers header integrity (no page ever opens with an orphaned item line),
//! chunk sizing, global numbering, and the flat-text shortcut.

use proptest::prelude::*;

use shared::models::{LocationView, StockRecord};
use shared::paginate::{format_group_header, location_view, paginate};

fn record(article: &str, location: &str, quantity: i64) -> StockRecord {
    StockRecord {
        supplier_article: article.to_string(),
        location_name: Some(location.to_string()),
        quantity,
        ..StockRecord::default()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Five items at per_page = 3: header + 2 items, then header + 1 item.
    #[test]
    fn test_paging_scenario() {
        let records: Vec<StockRecord> = (1..=5)
            .map(|i| record(&format!("sku-{i}"), "Moscow", i))
            .collect();

        let view = paginate(&records, 3);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.pages[0].lines.len(), 3);
        assert_eq!(view.pages[1].lines.len(), 2);
        assert_eq!(view.pages[0].lines[0], view.pages[1].lines[0]);
    }

    #[test]
    fn test_locations_emit_in_name_order() {
        let records = vec![
            record("a", "Tver", 1),
            record("b", "Kazan", 2),
            record("c", "Moscow", 3),
        ];
        let view = paginate(&records, 5);
        let headers: Vec<&String> = view.pages.iter().map(|p| &p.lines[0]).collect();
        assert_eq!(
            headers,
            vec![
                &format_group_header("Kazan"),
                &format_group_header("Moscow"),
                &format_group_header("Tver"),
            ]
        );
    }

    #[test]
    fn test_empty_input_has_no_pages() {
        let view = paginate(&[], 5);
        assert_eq!(view.total_pages, 0);
        assert_eq!(view.total_items, 0);
        assert!(view.pages.is_empty());
    }

    #[test]
    fn test_flat_view_for_small_location() {
        let records = vec![record("sku-1", "Moscow", 2)];
        match location_view(&records, "Moscow", 5) {
            LocationView::Flat(text) => assert!(text.starts_with(&format_group_header("Moscow"))),
            LocationView::Paged(_) => panic!("small location should render flat"),
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn records_strategy() -> impl Strategy<Value = Vec<StockRecord>> {
        proptest::collection::vec(
            ("[a-f]{1,4}", "[A-C]", -5i64..50).prop_map(|(article, location, quantity)| {
                record(&article, &location, quantity)
            }),
            0..40,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every page starts with a group header line.
        #[test]
        fn prop_header_integrity(records in records_strategy(), per_page in 2usize..8) {
            let view = paginate(&records, per_page);
            for page in &view.pages {
                prop_assert!(page.lines[0].starts_with("📍 "));
                for line in &page.lines[1..] {
                    prop_assert!(line.starts_with("• "));
                }
            }
        }

        /// No page exceeds per_page lines and none is header-only, except
        /// that no pages exist at all for empty input.
        #[test]
        fn prop_page_sizes(records in records_strategy(), per_page in 2usize..8) {
            let view = paginate(&records, per_page);
            for page in &view.pages {
                prop_assert!(page.lines.len() <= per_page);
                prop_assert!(page.lines.len() >= 2);
            }
        }

        /// Item lines across pages cover exactly the positive-quantity rows.
        #[test]
        fn prop_item_conservation(records in records_strategy(), per_page in 2usize..8) {
            let view = paginate(&records, per_page);
            let item_lines: usize = view.pages.iter().map(|p| p.lines.len() - 1).sum();
            let positive = records.iter().filter(|r| r.quantity > 0).count();
            prop_assert_eq!(item_lines, positive);
            prop_assert_eq!(view.total_items, positive);
        }

        /// Page numbers are global and sequential from 1.
        #[test]
        fn prop_global_numbering(records in records_strategy(), per_page in 2usize..8) {
            let view = paginate(&records, per_page);
            for (index, page) in view.pages.iter().enumerate() {
                prop_assert_eq!(page.number, index + 1);
            }
            prop_assert_eq!(view.total_pages, view.pages.len());
        }
    }
}
