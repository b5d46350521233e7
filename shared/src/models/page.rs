//! Display structures for paginated stock views
//!
//! The chat frontend renders these as-is; it never re-sorts or re-chunks.

use serde::{Deserialize, Serialize};

/// One display page. The first line is always a location-group header;
/// headers repeat when a location's items span multiple pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based global page number across all location groups.
    pub number: usize,
    pub lines: Vec<String>,
}

/// A fully paginated result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedView {
    pub pages: Vec<Page>,
    pub total_items: usize,
    pub total_pages: usize,
}

/// A single-location view: flat text when it fits the message budget,
/// otherwise the paged structure scoped to that location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "body")]
pub enum LocationView {
    Flat(String),
    Paged(PagedView),
}
