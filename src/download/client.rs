//! HTTP client wrapper for fetching resource bytes.
//!
//! This module provides the `HttpClient` struct which streams a response body
//! into memory while hashing it, so the committer can deduplicate before
//! anything touches the output tree.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT;
use super::error::FetchError;
use crate::hash::{ContentHash, ContentHasher};
use crate::user_agent;

/// Raw bytes of a fetched resource plus their content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// Full response body.
    pub bytes: Vec<u8>,
    /// Digest over `bytes`.
    pub hash: ContentHash,
}

impl FetchedContent {
    /// Wraps an in-memory buffer, hashing it.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let hash = ContentHash::of_bytes(&bytes);
        Self { bytes, hash }
    }
}

/// HTTP client for fetching resources.
///
/// Created once per run and cloned into every resource that needs it, sharing
/// the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend or proxy settings
    /// cannot be initialised.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_connect_timeout(CONNECT_TIMEOUT)
    }

    /// Creates a new HTTP client that gives up on connecting after
    /// `connect_timeout`.
    ///
    /// No total request timeout is set: the caller bounds each fetch end to
    /// end.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the client builder fails.
    #[instrument(level = "debug")]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self { client })
    }

    /// Fetches `url` fully into memory, hashing the body as it streams.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let mut hasher = ContentHasher::new();
        let mut bytes = Vec::with_capacity(
            response
                .content_length()
                .and_then(|len| usize::try_from(len).ok())
                .unwrap_or(0),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }

        debug!(bytes = bytes.len(), "fetch complete");
        Ok(FetchedContent {
            bytes,
            hash: hasher.finalize(),
        })
    }
}
