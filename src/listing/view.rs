//! Sorting and filtering of a folder listing.

use std::cmp::Ordering;

use crate::item::{Item, SortBy};

/// Derive the displayed listing from the loaded items.
///
/// Items whose name contains `query` (case-insensitive) are kept; an empty
/// query keeps everything. Folders always come before files, then `sort_by`
/// orders items within each kind. The sort is stable, so ties keep their
/// input order.
pub fn derive_view(items: &[Item], query: &str, sort_by: SortBy) -> Vec<Item> {
    let needle = query.to_lowercase();
    let mut view: Vec<Item> = items
        .iter()
        .filter(|item| needle.is_empty() || item.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    view.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| compare(a, b, sort_by)));
    view
}

fn compare(a: &Item, b: &Item, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Name => compare_names(&a.name, &b.name),
        SortBy::Modified => b.updated_at.cmp(&a.updated_at),
        SortBy::Size => b.size_bytes.cmp(&a.size_bytes),
        SortBy::Type => a
            .media_type
            .as_deref()
            .unwrap_or("")
            .cmp(b.media_type.as_deref().unwrap_or("")),
    }
}

/// Human ordering for names: case-insensitive first, code points second.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
