//! Article key normalization
//!
//! Supplier article spellings arrive from the marketplace API, uploaded
//! sheets, and the secondary warehouse system with inconsistent casing and
//! whitespace. Every merge and join in the platform runs on the normalized
//! form produced here.

/// Canonicalize a supplier article into the comparison key used for joins.
///
/// Outer whitespace (including non-breaking spaces) is stripped, internal
/// whitespace runs collapse to a single space, and the result is upper-cased.
/// Cyrillic `Ё` folds to `Е` so that `артикул-ё` and `АРТИКУЛ-Е` land on the
/// same key, matching how suppliers actually type these values.
pub fn normalize_article(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !key.is_empty() {
            key.push(' ');
        }
        pending_space = false;
        for upper in ch.to_uppercase() {
            key.push(if upper == 'Ё' { 'Е' } else { upper });
        }
    }

    key
}
