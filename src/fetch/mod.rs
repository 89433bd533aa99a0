//! HTTP retrieval of remote CSV sources.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::{Result, SeriesError};

/// Fetches `url` and returns the response body.
///
/// # Errors
///
/// Returns [`SeriesError::Fetch`] if the URL is invalid, the request fails,
/// or the server answers with a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed = url
        .parse()
        .map_err(|e| SeriesError::Fetch(format!("invalid URL '{url}': {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SeriesError::Fetch(format!("GET {url} returned {status}")));
    }

    let bytes = resp.bytes().await?;
    debug!(url, bytes = bytes.len(), "Source fetched");
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_fetch_error() {
        let client = BasicClient::new();
        let err = fetch_bytes(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, SeriesError::Fetch(_)));
        assert!(err.to_string().contains("invalid URL"));
    }
}
