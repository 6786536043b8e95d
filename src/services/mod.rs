pub mod analytics;
pub mod payments;
pub mod profiles;
pub mod quotes;
pub mod shipments;
pub mod tracking;

/// Zero-based page index for a one-based `page`
pub(crate) fn page_index(page: u64) -> u64 {
    page.max(1) - 1
}

/// `%term%` for a LIKE filter, or `None` for a blank search
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}
