//! Self-post strategy - renders the submission's own text.
//!
//! No network access: the single resource is a markdown document built from
//! the submission's title, body, and attribution.

use async_trait::async_trait;

use super::{Resource, SiteContext, SiteDownloader, SiteDownloaderError};
use crate::submission::Submission;

/// Strategy for feed-internal text posts.
#[derive(Debug, Default)]
pub struct SelfPost;

impl SelfPost {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn render(submission: &Submission) -> String {
        let author = submission.author_name();
        let subreddit = &submission.subreddit;
        // Link the heading to the post itself when the listing carries it.
        let link = submission.permalink.as_deref().map_or_else(
            || submission.url.clone(),
            |permalink| format!("https://www.reddit.com{permalink}"),
        );
        format!(
            "## [{title}]({link})\n\n{body}\n\n---\n\nsubmitted to [r/{subreddit}](https://www.reddit.com/r/{subreddit}) by [u/{author}](https://www.reddit.com/user/{author})\n",
            title = submission.title,
            body = submission.selftext,
        )
    }
}

#[async_trait]
impl SiteDownloader for SelfPost {
    fn name(&self) -> &'static str {
        "selfpost"
    }

    #[tracing::instrument(skip(self, submission, _ctx), fields(strategy = "selfpost", submission_id = %submission.id))]
    async fn find_resources(
        &self,
        submission: &Submission,
        _ctx: &SiteContext,
    ) -> Result<Vec<Resource>, SiteDownloaderError> {
        let body = Self::render(submission).into_bytes();
        Ok(vec![
            Resource::inline(submission.url.clone(), body).with_extension("txt"),
        ])
    }
}
