//! Direct strategy - the submission URL is itself the file.
//!
//! Only reachable when direct links are opted in on the registry.

use async_trait::async_trait;
use url::Url;

use super::{Resource, SiteContext, SiteDownloader, SiteDownloaderError};
use crate::submission::Submission;

/// Strategy that fetches the submission URL as a single resource.
#[derive(Debug, Default)]
pub struct Direct;

impl Direct {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteDownloader for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    #[tracing::instrument(skip(self, submission, ctx), fields(strategy = "direct", submission_id = %submission.id))]
    async fn find_resources(
        &self,
        submission: &Submission,
        ctx: &SiteContext,
    ) -> Result<Vec<Resource>, SiteDownloaderError> {
        Url::parse(&submission.url).map_err(|e| {
            SiteDownloaderError::extraction(self.name(), &submission.url, e.to_string())
        })?;
        Ok(vec![Resource::remote(
            submission.url.clone(),
            ctx.client().clone(),
        )])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_yields_url_resource() {
        let ctx = SiteContext::new().unwrap();
        let submission = Submission::new("d1", "pics", "https://i.redd.it/affyv0axd5k61.png");
        let resources = Direct::new().find_resources(&submission, &ctx).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].url(), "https://i.redd.it/affyv0axd5k61.png");
        assert_eq!(resources[0].extension(), Some("png"));
    }

    #[tokio::test]
    async fn test_direct_rejects_unparseable_url() {
        let ctx = SiteContext::new().unwrap();
        let submission = Submission::new("d2", "pics", "not a url.png");
        let result = Direct::new().find_resources(&submission, &ctx).await;
        assert!(matches!(
            result,
            Err(SiteDownloaderError::Extraction { .. })
        ));
    }
}
