//! Remote store endpoint URL builders

/// Build the single-shot batch submission URL
pub fn batch_url(base_url: &str, group: &str) -> String {
    format!(
        "{}/api/v1/groups/{}/records",
        base_url.trim_end_matches('/'),
        urlencoding::encode(group)
    )
}

/// Build the chunk submission URL
pub fn chunk_url(base_url: &str, group: &str) -> String {
    format!(
        "{}/api/v1/groups/{}/chunks",
        base_url.trim_end_matches('/'),
        urlencoding::encode(group)
    )
}
