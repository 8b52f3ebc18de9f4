//! Integration tests for the full submission pipeline.
//!
//! These tests drive a [`Downloader`] end to end against temp directories and
//! mock HTTP servers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bulkdl_core::site::{DispatchRule, ResourceFetch};
use bulkdl_core::{
    ContentHash, Downloader, DownloaderSettings, ExtensionDomainFilter, FetchError,
    FetchedContent, FileNameFormatter, PathFormatter, RegistryOptions, RejectReason, Resource,
    ResourceTally, SiteContext, SiteDownloader, SiteDownloaderError, StrategyKind,
    StrategyRegistry, Submission, SubmissionOutcome, VecSource,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn build(settings: DownloaderSettings) -> Downloader {
    Downloader::new(
        settings,
        Arc::new(ExtensionDomainFilter::default()),
        Box::new(FileNameFormatter::new("{POSTID}", "{SUBREDDIT}", "ISO").unwrap()),
        SiteContext::new().unwrap(),
    )
    .await
    .expect("downloader should build")
}

fn self_post(id: &str, score: i64) -> Submission {
    let mut submission = Submission::new(id, "test", format!("https://reddit.com/r/test/{id}"));
    submission.score = score;
    submission.author = Some("poster".to_string());
    submission.title = "A title".to_string();
    submission.selftext = "Some body".to_string();
    submission.created_utc = 1_614_000_000.0;
    submission
}

async fn mock_image(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn direct_submission(id: &str, url: String) -> Submission {
    let mut submission = Submission::new(id, "pics", url);
    submission.score = 100;
    submission
}

#[tokio::test]
async fn test_scenario_passing_submission_written_as_self_post() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.filter.min_score = Some(10);
    let mut downloader = build(settings).await;

    let mut submission = self_post("abc123", 50);
    submission.url = "http://reddit.com/r/test/abc123".to_string();
    let outcome = downloader.process_submission(&submission).await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::Processed { strategy, .. } if strategy == StrategyKind::SELF_POST
    ));
    let written = temp.path().join("test/abc123.txt");
    let text = std::fs::read_to_string(&written).unwrap();
    assert!(text.contains("Some body"));
}

#[tokio::test]
async fn test_scenario_low_score_never_reaches_disk() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.filter.min_score = Some(10);
    let mut downloader = build(settings).await;

    let outcome = downloader.process_submission(&self_post("abc123", 5)).await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::Filtered(RejectReason::ScoreBelowMinimum { .. })
    ));
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_direct_links_fetched_when_opted_in() {
    let server = MockServer::start().await;
    mock_image(&server, "/media/pic.png", b"\x89PNG fake image").await;
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.registry.direct_links = true;
    let mut downloader = build(settings).await;

    let submission = direct_submission("img001", format!("{}/media/pic.png", server.uri()));
    let outcome = downloader.process_submission(&submission).await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::Processed { strategy, .. } if strategy == StrategyKind::DIRECT
    ));
    let written = temp.path().join("pics/img001.png");
    assert_eq!(std::fs::read(written).unwrap(), b"\x89PNG fake image");
}

#[tokio::test]
async fn test_direct_links_ignored_without_opt_in() {
    let server = MockServer::start().await;
    mock_image(&server, "/media/pic.png", b"bytes").await;
    let temp = TempDir::new().unwrap();
    let mut downloader = build(DownloaderSettings::new(temp.path())).await;

    let submission = direct_submission("img001", format!("{}/media/pic.png", server.uri()));
    let outcome = downloader.process_submission(&submission).await;

    assert_eq!(outcome, SubmissionOutcome::NoStrategy);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_http_error_counts_as_failed_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.registry.direct_links = true;
    let mut downloader = build(settings).await;

    let submission = direct_submission("gone01", format!("{}/gone.jpg", server.uri()));
    let outcome = downloader.process_submission(&submission).await;

    match outcome {
        SubmissionOutcome::Processed {
            resources, aborted, ..
        } => {
            assert_eq!(resources.failed, 1);
            assert!(aborted);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!temp.path().join("pics/gone01.jpg").exists());
}

#[tokio::test]
async fn test_no_dupes_is_idempotent_across_runs() {
    let server = MockServer::start().await;
    mock_image(&server, "/a.jpg", b"identical bytes").await;
    mock_image(&server, "/b.jpg", b"identical bytes").await;
    let temp = TempDir::new().unwrap();

    let settings = || {
        let mut settings = DownloaderSettings::new(temp.path());
        settings.registry.direct_links = true;
        settings.commit.no_dupes = true;
        settings.search_existing = true;
        settings
    };

    let mut first_run = build(settings()).await;
    let stats = first_run
        .run(&mut VecSource::new([direct_submission(
            "first1",
            format!("{}/a.jpg", server.uri()),
        )]))
        .await;
    assert_eq!(stats.resources.written, 1);

    let mut second_run = build(settings()).await;
    assert_eq!(second_run.hash_index().len(), 1);
    let stats = second_run
        .run(&mut VecSource::new([direct_submission(
            "second",
            format!("{}/b.jpg", server.uri()),
        )]))
        .await;

    assert_eq!(stats.resources.written, 0);
    assert_eq!(stats.resources.duplicates, 1);
    assert!(temp.path().join("pics/first1.jpg").exists());
    assert!(!temp.path().join("pics/second.jpg").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_hard_links_share_content_between_submissions() {
    use std::os::unix::fs::MetadataExt;

    let server = MockServer::start().await;
    mock_image(&server, "/one.gif", b"GIF89a same").await;
    mock_image(&server, "/two.gif", b"GIF89a same").await;
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.registry.direct_links = true;
    settings.commit.make_hard_links = true;
    let mut downloader = build(settings).await;

    let stats = downloader
        .run(&mut VecSource::new([
            direct_submission("link01", format!("{}/one.gif", server.uri())),
            direct_submission("link02", format!("{}/two.gif", server.uri())),
        ]))
        .await;

    assert_eq!(stats.resources.written, 1);
    assert_eq!(stats.resources.linked, 1);
    let first = temp.path().join("pics/link01.gif");
    let second = temp.path().join("pics/link02.gif");
    assert_eq!(
        ContentHash::of_file(&first).unwrap(),
        ContentHash::of_file(&second).unwrap()
    );
    assert_eq!(
        std::fs::metadata(&first).unwrap().ino(),
        std::fs::metadata(&second).unwrap().ino()
    );
}

#[tokio::test]
async fn test_skip_extension_filters_submission_url() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.registry.direct_links = true;
    let mut downloader = Downloader::new(
        settings,
        Arc::new(ExtensionDomainFilter::new(["mp4"], Vec::<String>::new())),
        Box::new(FileNameFormatter::default()),
        SiteContext::new().unwrap(),
    )
    .await
    .unwrap();

    let submission = direct_submission("vid001", "https://v.example.com/clip.mp4".to_string());
    let outcome = downloader.process_submission(&submission).await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::Filtered(RejectReason::UrlFiltered { .. })
    ));
}

#[tokio::test]
async fn test_run_continues_past_failures() {
    let temp = TempDir::new().unwrap();
    let mut downloader = build(DownloaderSettings::new(temp.path())).await;

    let stats = downloader
        .run(&mut VecSource::new([
            Submission::new("nomatch", "test", "https://unknown.example/thing"),
            self_post("ok0001", 1),
        ]))
        .await;

    assert_eq!(stats.submissions, 2);
    assert_eq!(stats.no_strategy, 1);
    assert_eq!(stats.processed, 1);
    assert!(Path::new(&temp.path().join("test/ok0001.txt")).exists());
}

/// Test strategy: one `.jpg` resource per comma-separated item in the
/// submission body. The item `FAIL` yields a resource whose fetch fails.
#[derive(Debug)]
struct Gallery;

#[derive(Debug)]
struct Unreachable;

#[async_trait]
impl ResourceFetch for Unreachable {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        Err(FetchError::http_status(url, 503))
    }
}

#[async_trait]
impl SiteDownloader for Gallery {
    fn name(&self) -> &str {
        "gallery"
    }

    async fn find_resources(
        &self,
        submission: &Submission,
        _ctx: &SiteContext,
    ) -> Result<Vec<Resource>, SiteDownloaderError> {
        Ok(submission
            .selftext
            .split(',')
            .enumerate()
            .map(|(i, item)| {
                let url = format!("https://gallery.example/{}/{i}.jpg", submission.id);
                if item == "FAIL" {
                    Resource::new(url, Box::new(Unreachable))
                } else {
                    Resource::inline(url, item.as_bytes().to_vec())
                }
            })
            .collect())
    }
}

fn new_gallery() -> Box<dyn SiteDownloader> {
    Box::new(Gallery)
}

fn is_gallery(normalized: &str) -> bool {
    normalized.starts_with("gallery.example/")
}

fn gallery_registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_defaults(RegistryOptions::default());
    registry.register(DispatchRule::new(
        "gallery",
        is_gallery,
        StrategyKind::new("gallery", new_gallery),
    ));
    registry
}

fn gallery_submission(items: &str) -> Submission {
    let mut submission = Submission::new("gal001", "pics", "https://gallery.example/album/gal001");
    submission.selftext = items.to_string();
    submission
}

async fn gallery_downloader(settings: DownloaderSettings) -> Downloader {
    build(settings).await.with_registry(gallery_registry())
}

fn processed(outcome: SubmissionOutcome) -> (ResourceTally, bool) {
    match outcome {
        SubmissionOutcome::Processed {
            strategy,
            resources,
            aborted,
        } => {
            assert_eq!(strategy.name(), "gallery");
            (resources, aborted)
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_gallery_resources_committed_in_order() {
    let temp = TempDir::new().unwrap();
    let mut downloader = gallery_downloader(DownloaderSettings::new(temp.path())).await;

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("one,two,three")).await);

    assert_eq!(tally.written, 3);
    assert!(!aborted);
    for (n, body) in [(1, "one"), (2, "two"), (3, "three")] {
        let path = temp.path().join(format!("pics/gal001_{n}.jpg"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), body);
    }
}

#[tokio::test]
async fn test_gallery_duplicate_stops_remaining_resources() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.commit.no_dupes = true;
    let mut downloader = gallery_downloader(settings).await;

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("same,same,last")).await);

    assert_eq!(tally.written, 1);
    assert_eq!(tally.duplicates, 1);
    assert!(aborted);
    assert!(temp.path().join("pics/gal001_1.jpg").exists());
    assert!(!temp.path().join("pics/gal001_2.jpg").exists());
    assert!(!temp.path().join("pics/gal001_3.jpg").exists());
}

#[tokio::test]
async fn test_gallery_duplicate_of_earlier_submission_stops_at_first_resource() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.commit.no_dupes = true;
    let mut downloader = gallery_downloader(settings).await;
    let mut earlier = gallery_submission("seen");
    earlier.id = "earlier".to_string();
    processed(downloader.process_submission(&earlier).await);

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("seen,new,newer")).await);

    assert_eq!(tally, ResourceTally {
        duplicates: 1,
        ..ResourceTally::default()
    });
    assert!(aborted);
    assert!(!temp.path().join("pics/gal001_2.jpg").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_gallery_hard_link_stops_remaining_resources() {
    let temp = TempDir::new().unwrap();
    let mut settings = DownloaderSettings::new(temp.path());
    settings.commit.make_hard_links = true;
    let mut downloader = gallery_downloader(settings).await;

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("same,same,last")).await);

    assert_eq!(tally.written, 1);
    assert_eq!(tally.linked, 1);
    assert!(aborted);
    assert!(temp.path().join("pics/gal001_2.jpg").exists());
    assert!(!temp.path().join("pics/gal001_3.jpg").exists());
}

#[tokio::test]
async fn test_gallery_fetch_failure_stops_remaining_resources() {
    let temp = TempDir::new().unwrap();
    let mut downloader = gallery_downloader(DownloaderSettings::new(temp.path())).await;

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("one,FAIL,three")).await);

    assert_eq!(tally.written, 1);
    assert_eq!(tally.failed, 1);
    assert!(aborted);
    assert!(!temp.path().join("pics/gal001_3.jpg").exists());
}

/// Sends the second resource below a regular file so its directory cannot
/// be created.
#[derive(Debug)]
struct BlockedSecond {
    inner: FileNameFormatter,
    blocker: PathBuf,
}

impl PathFormatter for BlockedSecond {
    fn format_resource_paths(
        &self,
        submission: &Submission,
        resources: Vec<Resource>,
        destination: &Path,
    ) -> Vec<(PathBuf, Resource)> {
        let mut paths = self
            .inner
            .format_resource_paths(submission, resources, destination);
        if let Some((path, _)) = paths.get_mut(1) {
            *path = self.blocker.join(path.file_name().unwrap());
        }
        paths
    }
}

#[tokio::test]
async fn test_gallery_write_failure_continues_with_next_resource() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"regular file").unwrap();
    let formatter = BlockedSecond {
        inner: FileNameFormatter::new("{POSTID}", "{SUBREDDIT}", "ISO").unwrap(),
        blocker,
    };
    let mut downloader = Downloader::new(
        DownloaderSettings::new(temp.path()),
        Arc::new(ExtensionDomainFilter::default()),
        Box::new(formatter),
        SiteContext::new().unwrap(),
    )
    .await
    .unwrap()
    .with_registry(gallery_registry());

    let (tally, aborted) =
        processed(downloader.process_submission(&gallery_submission("one,two,three")).await);

    assert_eq!(tally.written, 2);
    assert_eq!(tally.failed, 1);
    assert!(!aborted);
    assert!(temp.path().join("pics/gal001_1.jpg").exists());
    assert!(temp.path().join("pics/gal001_3.jpg").exists());
}
