// src/normalizer.rs
// Canonical comparison key shared by deduplication and guess matching.

/// Lowercases, trims and drops every character that is not an ASCII letter or digit.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Keeps the first occurrence of each normalized form, preserving order.
/// Items that normalize to nothing are dropped.
pub fn dedupe_normalized<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = normalize(item);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}
