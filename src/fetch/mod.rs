mod basic;
mod client;
pub mod auth;
#[cfg(test)]
pub(crate) mod testing;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::debug;

/// GETs `url` and returns the response status. Only transport failures are
/// errors.
pub async fn fetch_status<C: HttpClient>(client: &C, url: &str) -> Result<reqwest::StatusCode> {
    let url: reqwest::Url = url.parse().with_context(|| format!("invalid URL {url}"))?;
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {} failed", url.path()))?;

    let status = resp.status();
    debug!(path = url.path(), %status, "API response");
    Ok(status)
}

/// GETs `url` with `query` appended and decodes the JSON body.
///
/// Non-success statuses are errors carrying the response body.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let mut url: reqwest::Url = url.parse().with_context(|| format!("invalid URL {url}"))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {} failed", url.path()))?;

    let status = resp.status();
    debug!(path = url.path(), %status, "API response");
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{} returned status {}: {}", url.path(), status, body);
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).with_context(|| format!("decoding response from {}", url.path()))
}
