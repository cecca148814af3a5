//! Bucket asset URLs and byte-range fetches
//!
//! Archived captures live in storage buckets addressed by byte range. The
//! URL builder is pure string work: the `{bucket}` placeholder was validated
//! at configuration time, so building a URL never fails.

use crate::config::EndpointConfig;
use crate::error::TaggrError;

/// Build the fetch URL for a byte range of a bucket asset.
pub fn build_asset_url(config: &EndpointConfig, bucket_id: &str, offset: u64, len: u64) -> String {
    let base = config.bucket_url_template.replace("{bucket}", bucket_id);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}offset={offset}&len={len}")
}

/// Fetch an asset byte range as text.
///
/// Any non-2xx status or transport failure is one error kind here; the
/// caller treats all of them as "capture unavailable".
pub async fn fetch_asset_text(client: &reqwest::Client, url: &str) -> Result<String, TaggrError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TaggrError::Session(format!("asset fetch failed: {e}")))?;

    if !response.status().is_success() {
        return Err(TaggrError::Session(format!(
            "asset fetch failed ({})",
            response.status().as_u16()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| TaggrError::Session(format!("asset fetch failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BUCKET_URL_TEMPLATE;

    #[test]
    fn test_build_asset_url_substitutes_bucket() {
        let config = EndpointConfig::new("https://icp0.io", "aaaaa-aa", DEFAULT_BUCKET_URL_TEMPLATE);
        assert_eq!(
            build_asset_url(&config, "abcde-aa", 10, 200),
            "https://abcde-aa.raw.icp0.io/asset?offset=10&len=200"
        );
    }

    #[test]
    fn test_build_asset_url_appends_to_existing_query() {
        let config = EndpointConfig::new(
            "https://icp0.io",
            "aaaaa-aa",
            "https://assets.example/fetch?bucket={bucket}",
        );
        assert_eq!(
            build_asset_url(&config, "b-1", 0, 5),
            "https://assets.example/fetch?bucket=b-1&offset=0&len=5"
        );
    }
}
