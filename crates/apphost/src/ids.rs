//! Record identifier normalization.
//!
//! The host wraps GUIDs in braces (`{0000-...}`); everything that crosses the
//! window boundary is brace-free.

pub fn strip_braces(id: &str) -> String {
    id.chars().filter(|c| *c != '{' && *c != '}').collect()
}

pub fn normalize_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|id| strip_braces(id.as_ref())).collect()
}
