//! Downloadable resources produced by extraction strategies.

use std::fmt;

use async_trait::async_trait;

use super::url::extension_from_url;
use crate::download::{FetchError, FetchedContent, HttpClient};

/// How a resource obtains its bytes.
///
/// Object-safe via `async_trait` so a [`Resource`] can hold any fetcher.
#[async_trait]
pub trait ResourceFetch: Send + Sync + fmt::Debug {
    /// Fetches the full body for `url`.
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError>;
}

/// Fetches over HTTP with the run's shared client.
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: HttpClient,
}

impl HttpFetch {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetch for HttpFetch {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        self.client.fetch(url).await
    }
}

/// Content already held in memory (e.g. a rendered self post).
#[derive(Debug, Clone)]
pub struct InlineFetch {
    bytes: Vec<u8>,
}

impl InlineFetch {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ResourceFetch for InlineFetch {
    async fn fetch(&self, _url: &str) -> Result<FetchedContent, FetchError> {
        Ok(FetchedContent::from_bytes(self.bytes.clone()))
    }
}

/// One fetchable artifact belonging to a submission.
///
/// Created by a strategy and handed to the committer, which fetches it at
/// most once.
#[derive(Debug)]
pub struct Resource {
    url: String,
    extension: Option<String>,
    fetcher: Box<dyn ResourceFetch>,
}

impl Resource {
    /// Creates a resource with an explicit fetcher; the extension is taken
    /// from the URL's last path segment when it has one.
    #[must_use]
    pub fn new(url: impl Into<String>, fetcher: Box<dyn ResourceFetch>) -> Self {
        let url = url.into();
        let extension = extension_from_url(&url);
        Self {
            url,
            extension,
            fetcher,
        }
    }

    /// Creates a resource fetched over HTTP.
    #[must_use]
    pub fn remote(url: impl Into<String>, client: HttpClient) -> Self {
        Self::new(url, Box::new(HttpFetch::new(client)))
    }

    /// Creates a resource whose bytes are already known.
    #[must_use]
    pub fn inline(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(url, Box::new(InlineFetch::new(bytes)))
    }

    /// Overrides the file extension (without a leading dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = Some(extension.trim_start_matches('.').to_lowercase());
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// File extension without the leading dot, if known.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Fetches the resource's bytes and content hash.
    ///
    /// # Errors
    ///
    /// Returns whatever [`FetchError`] the underlying fetcher produced.
    pub async fn fetch(&self) -> Result<FetchedContent, FetchError> {
        self.fetcher.fetch(&self.url).await
    }
}
