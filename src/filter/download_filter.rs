//! URL- and resource-level download filter.

use std::fmt;

use url::Url;

use crate::site::Resource;

/// Read-only predicates consulted before a submission or resource is fetched.
pub trait DownloadFilter: Send + Sync + fmt::Debug {
    /// Returns false if nothing at `url` should be downloaded.
    fn check_url(&self, url: &str) -> bool;

    /// Returns false if this particular resource should be skipped.
    fn check_resource(&self, resource: &Resource) -> bool;
}

/// Filter by file extension and by host.
///
/// An empty filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct ExtensionDomainFilter {
    excluded_extensions: Vec<String>,
    excluded_domains: Vec<String>,
}

impl ExtensionDomainFilter {
    /// Creates a filter. Extensions may be given with or without a leading
    /// dot; matching is case-insensitive for both lists.
    #[must_use]
    pub fn new<E, D>(excluded_extensions: E, excluded_domains: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            excluded_extensions: excluded_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            excluded_domains: excluded_domains
                .into_iter()
                .map(|domain| domain.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
        }
    }

    fn extension_allowed(&self, url: &str) -> bool {
        if self.excluded_extensions.is_empty() {
            return true;
        }
        let path = Url::parse(url).map_or_else(
            |_| url.split(['?', '#']).next().unwrap_or_default().to_lowercase(),
            |parsed| parsed.path().to_lowercase(),
        );
        !self
            .excluded_extensions
            .iter()
            .any(|ext| path.ends_with(&format!(".{ext}")))
    }

    fn domain_allowed(&self, url: &str) -> bool {
        if self.excluded_domains.is_empty() {
            return true;
        }
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        else {
            return true;
        };
        !self
            .excluded_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

impl DownloadFilter for ExtensionDomainFilter {
    fn check_url(&self, url: &str) -> bool {
        self.extension_allowed(url) && self.domain_allowed(url)
    }

    fn check_resource(&self, resource: &Resource) -> bool {
        if let Some(extension) = resource.extension()
            && self
                .excluded_extensions
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(extension))
        {
            return false;
        }
        self.check_url(resource.url())
    }
}
