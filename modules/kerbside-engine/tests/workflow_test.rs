//! Workflow tests against an in-memory remote service and a stub decoder.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

use kerbside_engine::{
    ExtractError, ExtractedFrame, FrameSource, PollPolicy, SearchWorkflow, VehicleQuery,
    VideoUnderstanding, WorkflowError,
};
use twelvelabs_client::error::Result as ClientResult;
use twelvelabs_client::{
    AnalyzeEvent, AnalyzeEventType, AssetHandle, HlsInfo, IndexHandle, IndexModel, IndexedAsset,
    IndexingStatus, SearchMatch,
};

// ---------------------------------------------------------------------------
// In-memory remote service
// ---------------------------------------------------------------------------

struct FakeRemote {
    /// Statuses returned by successive status polls; the last one sticks.
    statuses: Mutex<Vec<IndexingStatus>>,
    status_cursor: AtomicUsize,
    matches: Vec<SearchMatch>,
    thumbnails: Vec<String>,
    fragments: Vec<String>,
    analyze_calls: AtomicUsize,
    search_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeRemote {
    fn new(statuses: Vec<IndexingStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses),
            status_cursor: AtomicUsize::new(0),
            matches: Vec::new(),
            thumbnails: Vec::new(),
            fragments: vec!["The video shows ".to_string(), "a red Toyota Camry.".to_string()],
            analyze_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    fn with_matches(mut self, matches: Vec<SearchMatch>) -> Self {
        self.matches = matches;
        self
    }

    fn with_thumbnails(mut self, thumbnails: Vec<String>) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    fn next_status(&self) -> IndexingStatus {
        let statuses = self.statuses.lock().unwrap();
        let cursor = self.status_cursor.fetch_add(1, Ordering::SeqCst);
        statuses[cursor.min(statuses.len() - 1)]
    }

    fn indexed_asset(&self, status: IndexingStatus) -> IndexedAsset {
        IndexedAsset {
            id: "vid-1".to_string(),
            status,
            hls: if self.thumbnails.is_empty() {
                None
            } else {
                Some(HlsInfo {
                    thumbnail_urls: self.thumbnails.clone(),
                })
            },
            created_at: None,
        }
    }
}

#[async_trait]
impl VideoUnderstanding for FakeRemote {
    async fn create_index(
        &self,
        _index_name: &str,
        _models: Vec<IndexModel>,
    ) -> ClientResult<IndexHandle> {
        Ok(IndexHandle {
            id: "idx-1".to_string(),
        })
    }

    async fn upload_asset(&self, path: &Path) -> ClientResult<AssetHandle> {
        // The orchestrator must have persisted the upload before handing it over.
        assert!(path.exists(), "upload not persisted before remote upload");
        Ok(AssetHandle {
            id: "asset-1".to_string(),
        })
    }

    async fn attach_asset(
        &self,
        _index_id: &str,
        _asset_id: &str,
        enable_video_stream: bool,
    ) -> ClientResult<IndexedAsset> {
        assert!(enable_video_stream, "streaming must be enabled on attach");
        Ok(self.indexed_asset(IndexingStatus::Queued))
    }

    async fn get_indexed_asset(
        &self,
        _index_id: &str,
        _indexed_asset_id: &str,
    ) -> ClientResult<IndexedAsset> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.indexed_asset(self.next_status()))
    }

    async fn analyze_stream(
        &self,
        _video_id: &str,
        _prompt: &str,
    ) -> ClientResult<BoxStream<'static, ClientResult<AnalyzeEvent>>> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        let mut events = vec![AnalyzeEvent {
            event_type: AnalyzeEventType::StreamStart,
            text: String::new(),
        }];
        events.extend(self.fragments.iter().map(|f| AnalyzeEvent {
            event_type: AnalyzeEventType::TextGeneration,
            text: f.clone(),
        }));
        events.push(AnalyzeEvent {
            event_type: AnalyzeEventType::StreamEnd,
            text: String::new(),
        });
        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }

    async fn search(
        &self,
        _index_id: &str,
        _query_text: &str,
        _search_options: &[&str],
        _page_limit: u32,
    ) -> ClientResult<Vec<SearchMatch>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matches.clone())
    }
}

// ---------------------------------------------------------------------------
// Stub frame decoder
// ---------------------------------------------------------------------------

struct StubFrames {
    /// Bytes to emit as the extracted frame, or None to fail every call.
    frame: Option<Vec<u8>>,
}

#[async_trait]
impl FrameSource for StubFrames {
    async fn extract(
        &self,
        _video_path: &Path,
        _seconds: f64,
        frame_path: &Path,
    ) -> Result<ExtractedFrame, ExtractError> {
        match &self.frame {
            Some(bytes) => {
                std::fs::write(frame_path, bytes).unwrap();
                Ok(ExtractedFrame {
                    bytes: bytes.clone(),
                    width: 1920,
                    height: 1080,
                })
            }
            None => Err(ExtractError::DecodeFailure("stub decoder".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn query() -> VehicleQuery {
    VehicleQuery {
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        color: "red".to_string(),
    }
}

fn single_match(start: f64, score: f64) -> SearchMatch {
    SearchMatch {
        start,
        end: start + 3.0,
        score,
        video_id: Some("vid-1".to_string()),
    }
}

fn fast_poll() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        deadline: Duration::from_secs(5),
    }
}

fn workflow(
    remote: Arc<FakeRemote>,
    frame: Option<Vec<u8>>,
    poll: PollPolicy,
) -> SearchWorkflow<Arc<FakeRemote>, StubFrames> {
    SearchWorkflow::new(remote, StubFrames { frame }, poll)
}

const FRAME_BYTES: &[u8] = b"\xff\xd8\xff fake jpeg payload";

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn full_success_returns_data_uri_screenshot() {
    let remote = Arc::new(
        FakeRemote::new(vec![
            IndexingStatus::Queued,
            IndexingStatus::Processing,
            IndexingStatus::Ready,
        ])
        .with_matches(vec![single_match(22.5, 0.87)]),
    );
    let wf = workflow(remote.clone(), Some(FRAME_BYTES.to_vec()), fast_poll());

    let output = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap();

    assert_eq!(output.analysis, "The video shows a red Toyota Camry.");
    assert_eq!(output.timestamp, Some(22.5));

    let expected = format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(FRAME_BYTES)
    );
    assert_eq!(output.screenshot, Some(expected));

    // Poller observed queued → processing → ready.
    assert!(remote.status_calls.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn failed_indexing_aborts_before_analysis_and_search() {
    let remote = Arc::new(FakeRemote::new(vec![IndexingStatus::Failed]));
    let wf = workflow(remote.clone(), Some(FRAME_BYTES.to_vec()), fast_poll());

    let err = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::IndexingFailed));
    assert_eq!(remote.analyze_calls.load(Ordering::SeqCst), 0);
    assert_eq!(remote.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stuck_indexing_times_out_at_deadline() {
    let remote = Arc::new(FakeRemote::new(vec![IndexingStatus::Processing]));
    let poll = PollPolicy {
        interval: Duration::from_millis(10),
        deadline: Duration::from_millis(35),
    };
    let wf = workflow(remote.clone(), Some(FRAME_BYTES.to_vec()), poll);

    let err = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::IndexingTimeout(_)));
    assert_eq!(remote.analyze_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_search_still_succeeds_with_null_fields() {
    let remote = Arc::new(FakeRemote::new(vec![IndexingStatus::Ready]));
    let wf = workflow(remote.clone(), Some(FRAME_BYTES.to_vec()), fast_poll());

    let output = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap();

    assert_eq!(output.analysis, "The video shows a red Toyota Camry.");
    assert_eq!(output.screenshot, None);
    assert_eq!(output.timestamp, None);
    assert_eq!(remote.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn extraction_failure_falls_back_to_hls_thumbnail() {
    let remote = Arc::new(
        FakeRemote::new(vec![IndexingStatus::Ready])
            .with_matches(vec![single_match(12.0, 0.9)])
            .with_thumbnails(vec![
                "https://cdn.example/thumb-0.jpg".to_string(),
                "https://cdn.example/thumb-1.jpg".to_string(),
            ]),
    );
    let wf = workflow(remote.clone(), None, fast_poll());

    let output = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap();

    assert_eq!(
        output.screenshot,
        Some("https://cdn.example/thumb-0.jpg".to_string())
    );
    assert_eq!(output.timestamp, Some(12.0));
}

#[tokio::test]
async fn extraction_failure_without_thumbnails_keeps_timestamp() {
    let remote = Arc::new(
        FakeRemote::new(vec![IndexingStatus::Ready]).with_matches(vec![single_match(12.0, 0.9)]),
    );
    let wf = workflow(remote.clone(), None, fast_poll());

    let output = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap();

    assert_eq!(output.screenshot, None);
    assert_eq!(output.timestamp, Some(12.0));
    assert!(!output.analysis.is_empty());
}

#[tokio::test]
async fn first_listed_match_wins_over_higher_scored_later_match() {
    let remote = Arc::new(FakeRemote::new(vec![IndexingStatus::Ready]).with_matches(vec![
        single_match(12.0, 0.9),
        single_match(30.0, 0.95),
    ]));
    let wf = workflow(remote.clone(), Some(FRAME_BYTES.to_vec()), fast_poll());

    let output = wf
        .run(Bytes::from_static(b"fake video bytes"), "clip.mp4", &query())
        .await
        .unwrap();

    // Provider order is trusted: position 0, not max-by-score.
    assert_eq!(output.timestamp, Some(12.0));
}
