//! Extraction strategies and the dispatch table that selects among them.
//!
//! # Architecture
//!
//! - [`SiteDownloader`] - Async trait every extraction strategy implements
//! - [`StrategyKind`] - A strategy's name paired with its constructor
//! - [`StrategyRegistry`] - Ordered, first-match-wins table of URL rules
//! - [`Resource`] - One fetchable artifact produced by a strategy
//! - [`SelfPost`] - Renders a submission's own text (no network)
//! - [`Direct`] - Treats the submission URL as the file (opt-in)
//!
//! # Example
//!
//! ```no_run
//! use bulkdl_core::site::{RegistryOptions, SiteContext, StrategyRegistry};
//! use bulkdl_core::Submission;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = StrategyRegistry::with_defaults(RegistryOptions::default());
//! let submission = Submission::new("abc123", "test", "https://reddit.com/r/test/abc123");
//! let kind = registry.select(&submission.url)?;
//! let resources = kind
//!     .strategy()
//!     .find_resources(&submission, &SiteContext::new()?)
//!     .await?;
//! println!("{} resource(s) from {}", resources.len(), kind.name());
//! # Ok(())
//! # }
//! ```

mod direct;
mod error;
mod registry;
mod resource;
mod self_post;
pub mod url;

pub use direct::Direct;
pub use error::{DispatchError, SiteDownloaderError};
pub use registry::{DispatchRule, RegistryOptions, StrategyRegistry, UrlPredicate};
pub use resource::{HttpFetch, InlineFetch, Resource, ResourceFetch};
pub use self_post::SelfPost;

use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::download::{FetchError, HttpClient};
use crate::submission::Submission;

/// Builds a fresh strategy instance.
pub type StrategyConstructor = fn() -> Box<dyn SiteDownloader>;

/// A dispatchable strategy: a stable name and the constructor behind it.
///
/// Two kinds are equal when their names are equal.
#[derive(Clone, Copy)]
pub struct StrategyKind {
    name: &'static str,
    construct: StrategyConstructor,
}

impl StrategyKind {
    /// The submission URL is a file.
    pub const DIRECT: Self = Self::new("direct", new_direct);
    /// Feed-internal text post.
    pub const SELF_POST: Self = Self::new("selfpost", new_self_post);

    /// Pairs a lowercase `name` with the constructor for its strategy.
    #[must_use]
    pub const fn new(name: &'static str, construct: StrategyConstructor) -> Self {
        Self { name, construct }
    }

    /// Stable lowercase name, matched against the disabled-module list.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Constructs the strategy implementation for this kind.
    #[must_use]
    pub fn strategy(self) -> Box<dyn SiteDownloader> {
        (self.construct)()
    }
}

impl PartialEq for StrategyKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for StrategyKind {}

impl Hash for StrategyKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrategyKind").field(&self.name).finish()
    }
}

fn new_direct() -> Box<dyn SiteDownloader> {
    Box::new(Direct::new())
}

fn new_self_post() -> Box<dyn SiteDownloader> {
    Box::new(SelfPost::new())
}

/// Session handles strategies may use while extracting.
#[derive(Debug, Clone)]
pub struct SiteContext {
    client: HttpClient,
}

impl SiteContext {
    /// Creates a context with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    #[must_use]
    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

/// Trait that all extraction strategies implement.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn SiteDownloader>`.
#[async_trait]
pub trait SiteDownloader: Send + Sync {
    /// Returns the strategy's name (e.g., "selfpost", "direct").
    fn name(&self) -> &str;

    /// Produces the resources for `submission`.
    async fn find_resources(
        &self,
        submission: &Submission,
        ctx: &SiteContext,
    ) -> Result<Vec<Resource>, SiteDownloaderError>;
}
