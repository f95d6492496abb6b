use base64::{Engine, engine::general_purpose::STANDARD};

use crate::types::Credentials;

/// Value of the `Authorization` header sent to the token endpoint.
pub fn basic_auth_header(credentials: &Credentials) -> String {
    let key = STANDARD.encode(format!(
        "{}:{}",
        credentials.client_id, credentials.client_secret
    ));
    format!("Basic {}", key)
}

/// Redirect URI registered for the local callback listener.
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

/// Number of pages needed to cover `total` items at `page_size` per page.
pub fn total_pages(total: u64, page_size: usize) -> usize {
    let page_size = page_size.max(1) as u64;
    total.div_ceil(page_size) as usize
}

/// Year part of a provider release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
pub fn release_year(release_date: &str) -> Option<String> {
    release_date
        .split('-')
        .next()
        .map(str::trim)
        .filter(|year| !year.is_empty())
        .map(str::to_string)
}

/// Splits a comma or whitespace separated list of track ids.
pub fn parse_ids(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps the first occurrence of every key, preserving order.
pub fn dedupe_by_key<T, K, F>(items: &mut Vec<T>, mut key: F)
where
    K: Eq + std::hash::Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}
