//! Clip sourcing: search, accept, download.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use reel_media::{download_to_file, remove_all_quietly, unique_path};
use reel_models::{CandidateClip, ProgressBand, ProgressSink, SourcedClip, Stage};
use tracing::{debug, info, warn};

use crate::client::StockProvider;
use crate::error::{StockError, StockResult};
use crate::selection::accept_video;

/// Fewer accepted clips than this fails the run.
pub const MIN_CLIPS: usize = 6;
/// Stop searching once this many candidates are accepted.
pub const MAX_CANDIDATES: usize = 8;
/// Results requested per search term.
pub const PAGE_SIZE: u32 = 15;

/// Archival terms searched before the topic itself.
pub const GENERIC_TERMS: [&str; 4] = [
    "vintage film footage",
    "old historical city",
    "ancient ruins",
    "black and white archive",
];

/// Ordered search terms for `topic`: generic terms first, topic last.
pub fn search_terms(topic: &str) -> Vec<String> {
    let mut terms: Vec<String> = GENERIC_TERMS.iter().map(|t| t.to_string()).collect();
    let topic = topic.trim();
    if !topic.is_empty() && !GENERIC_TERMS.contains(&topic) {
        terms.push(topic.to_string());
    }
    terms
}

/// Sourcing limits and destination.
#[derive(Debug, Clone)]
pub struct SourcingConfig {
    pub work_dir: PathBuf,
    pub min_clips: usize,
    pub max_candidates: usize,
    pub page_size: u32,
}

impl SourcingConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            min_clips: MIN_CLIPS,
            max_candidates: MAX_CANDIDATES,
            page_size: PAGE_SIZE,
        }
    }
}

/// Finds and downloads stock clips for a topic.
pub struct ClipSourcer {
    provider: Arc<dyn StockProvider>,
    http: reqwest::Client,
    config: SourcingConfig,
}

impl ClipSourcer {
    pub fn new(provider: Arc<dyn StockProvider>, http: reqwest::Client, config: SourcingConfig) -> Self {
        Self {
            provider,
            http,
            config,
        }
    }

    pub fn config(&self) -> &SourcingConfig {
        &self.config
    }

    /// Run every search term and keep acceptable, distinct candidates.
    ///
    /// A failing term is logged and skipped.
    pub async fn collect_candidates(&self, topic: &str) -> Vec<CandidateClip> {
        let mut accepted: Vec<CandidateClip> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for term in search_terms(topic) {
            if accepted.len() >= self.config.max_candidates {
                break;
            }

            let videos = match self.provider.search(&term, self.config.page_size).await {
                Ok(videos) => videos,
                Err(e) => {
                    warn!(term = %term, "Stock search failed, skipping term: {}", e);
                    continue;
                }
            };

            let mut rejected = 0usize;
            for video in &videos {
                if accepted.len() >= self.config.max_candidates {
                    break;
                }
                match accept_video(video) {
                    Some(clip) if seen.insert(clip.remote_url.clone()) => accepted.push(clip),
                    Some(_) => {}
                    None => rejected += 1,
                }
            }

            debug!(
                term = %term,
                results = videos.len(),
                rejected,
                accepted = accepted.len(),
                "Processed search term"
            );
        }

        accepted
    }

    /// Source at least `min_clips` clips for `topic` into the work directory.
    ///
    /// Download progress is reported in the 5-30 band. If any download fails,
    /// clips already written by this call are removed before returning.
    pub async fn fetch_clips(&self, topic: &str, sink: &dyn ProgressSink) -> StockResult<Vec<SourcedClip>> {
        let band = ProgressBand::SOURCING;
        sink.report(Stage::Sourcing, "Searching stock footage", band.start);

        let candidates = self.collect_candidates(topic).await;
        if candidates.len() < self.config.min_clips {
            return Err(StockError::InsufficientClips {
                found: candidates.len(),
                required: self.config.min_clips,
            });
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let stamp = chrono::Utc::now().timestamp_millis();
        let total = candidates.len();
        let mut sourced: Vec<SourcedClip> = Vec::with_capacity(total);

        for (i, candidate) in candidates.iter().enumerate() {
            let dest = unique_path(&self.config.work_dir, "clip", stamp, "mp4");

            if let Err(e) = download_to_file(&self.http, &candidate.remote_url, &dest).await {
                let written: Vec<PathBuf> = sourced.iter().map(|c| c.local_path.clone()).collect();
                let removed = remove_all_quietly(&written).await;
                warn!(
                    url = %candidate.remote_url,
                    removed,
                    "Clip download failed, discarding sourced clips: {}",
                    e
                );
                return Err(StockError::download_failed(&candidate.remote_url, e.to_string()));
            }

            sourced.push(SourcedClip::new(dest, candidate.reported_duration_secs));

            let done = i + 1;
            sink.report(
                Stage::Sourcing,
                &format!("Downloaded clip {}/{}", done, total),
                band.map_fraction(done as f64 / total as f64),
            );
        }

        info!(topic, clips = sourced.len(), "Sourced clips");
        Ok(sourced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProviderVideo, Rendition};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Canned results per term; unknown terms fail.
    struct FakeProvider {
        results: HashMap<String, Vec<ProviderVideo>>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(results: HashMap<String, Vec<ProviderVideo>>) -> Self {
            Self {
                results,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl StockProvider for FakeProvider {
        async fn search(&self, term: &str, page_size: u32) -> StockResult<Vec<ProviderVideo>> {
            assert_eq!(page_size, PAGE_SIZE);
            self.queries.lock().unwrap().push(term.to_string());
            self.results
                .get(term)
                .cloned()
                .ok_or_else(|| StockError::provider_failed("boom"))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        percents: Mutex<Vec<u8>>,
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, _stage: Stage, _label: &str, percent: u8) {
            self.percents.lock().unwrap().push(percent);
        }
    }

    fn portrait(link: String) -> ProviderVideo {
        ProviderVideo {
            width: 1080,
            height: 1920,
            duration: 9.0,
            video_files: vec![Rendition {
                quality: Some("hd".into()),
                width: Some(1080),
                height: Some(1920),
                link,
            }],
        }
    }

    fn landscape(link: String) -> ProviderVideo {
        ProviderVideo {
            width: 1920,
            height: 1080,
            ..portrait(link)
        }
    }

    async fn clip_server(status: impl Fn(usize) -> u16) -> MockServer {
        let server = MockServer::start().await;
        for i in 0..10 {
            Mock::given(method("GET"))
                .and(path(format!("/clip{i}.mp4")))
                .respond_with(ResponseTemplate::new(status(i)).set_body_bytes(vec![0u8; 256]))
                .mount(&server)
                .await;
        }
        server
    }

    fn sourcer(provider: FakeProvider, dir: &TempDir) -> (ClipSourcer, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let sourcer = ClipSourcer::new(
            provider.clone(),
            reqwest::Client::new(),
            SourcingConfig::new(dir.path()),
        );
        (sourcer, provider)
    }

    #[test]
    fn test_search_terms_put_topic_last() {
        let terms = search_terms("  gold rush tale ");
        assert_eq!(terms.len(), 5);
        assert_eq!(terms[0], "vintage film footage");
        assert_eq!(terms[4], "gold rush tale");
        assert_eq!(search_terms("ancient ruins").len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_caps_at_eight_and_reports_band() {
        let server = clip_server(|_| 200).await;
        let uri = server.uri();

        let mut results = HashMap::new();
        results.insert(
            "vintage film footage".to_string(),
            (0..5).map(|i| portrait(format!("{uri}/clip{i}.mp4"))).collect(),
        );
        // Duplicates of already accepted links are ignored
        results.insert(
            "old historical city".to_string(),
            (3..10).map(|i| portrait(format!("{uri}/clip{i}.mp4"))).collect(),
        );

        let dir = TempDir::new().unwrap();
        let (sourcer, provider) = sourcer(FakeProvider::new(results), &dir);
        let sink = RecordingSink::default();

        let clips = sourcer.fetch_clips("gold rush tale", &sink).await.unwrap();

        assert_eq!(clips.len(), 8);
        assert!(clips.iter().all(|c| c.local_path.exists()));
        let names: HashSet<_> = clips.iter().map(|c| c.local_path.clone()).collect();
        assert_eq!(names.len(), 8);

        // Cap reached after the second term
        assert_eq!(provider.queries.lock().unwrap().len(), 2);

        let percents = sink.percents.lock().unwrap().clone();
        assert_eq!(percents.first(), Some(&5));
        assert_eq!(percents.last(), Some(&30));
        assert_eq!(percents[1], 8);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_failed_terms_are_skipped() {
        let server = clip_server(|_| 200).await;
        let uri = server.uri();

        // Only the topic term succeeds
        let mut results = HashMap::new();
        results.insert(
            "lost roman legion".to_string(),
            (0..6).map(|i| portrait(format!("{uri}/clip{i}.mp4"))).collect(),
        );

        let dir = TempDir::new().unwrap();
        let (sourcer, provider) = sourcer(FakeProvider::new(results), &dir);

        let clips = sourcer
            .fetch_clips("lost roman legion", &RecordingSink::default())
            .await
            .unwrap();

        assert_eq!(clips.len(), 6);
        assert_eq!(provider.queries.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_insufficient_when_mostly_landscape() {
        let mut results = HashMap::new();
        let mut videos: Vec<ProviderVideo> = (0..12)
            .map(|i| landscape(format!("https://cdn/land{i}.mp4")))
            .collect();
        videos.extend((0..5).map(|i| portrait(format!("https://cdn/port{i}.mp4"))));
        results.insert("vintage film footage".to_string(), videos);

        let dir = TempDir::new().unwrap();
        let (sourcer, _) = sourcer(FakeProvider::new(results), &dir);

        let err = sourcer
            .fetch_clips("gold rush tale", &RecordingSink::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StockError::InsufficientClips {
                found: 5,
                required: 6
            }
        ));
    }

    #[tokio::test]
    async fn test_download_failure_removes_written_clips() {
        // Fourth clip fails
        let server = clip_server(|i| if i == 3 { 500 } else { 200 }).await;
        let uri = server.uri();

        let mut results = HashMap::new();
        results.insert(
            "vintage film footage".to_string(),
            (0..8).map(|i| portrait(format!("{uri}/clip{i}.mp4"))).collect(),
        );

        let dir = TempDir::new().unwrap();
        let (sourcer, _) = sourcer(FakeProvider::new(results), &dir);

        let err = sourcer
            .fetch_clips("gold rush tale", &RecordingSink::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StockError::DownloadFailed { .. }));
        assert!(err.to_string().contains("clip3.mp4"));

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
