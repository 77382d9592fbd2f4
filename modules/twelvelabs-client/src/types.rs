use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A model enabled on an index, together with the modalities it runs over.
#[derive(Debug, Clone, Serialize)]
pub struct IndexModel {
    pub model_name: String,
    pub model_options: Vec<String>,
}

impl IndexModel {
    pub fn new(model_name: &str, model_options: &[&str]) -> Self {
        Self {
            model_name: model_name.to_string(),
            model_options: model_options.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// Request body for index creation.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateIndexRequest {
    pub index_name: String,
    pub models: Vec<IndexModel>,
}

/// A newly created index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexHandle {
    #[serde(rename = "_id")]
    pub id: String,
}

/// An uploaded video asset, not yet attached to any index.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetHandle {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Processing status of an asset within an index.
///
/// `Ready` and `Failed` are terminal. Statuses this client does not know
/// about deserialize to `Unknown` and are treated as still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingStatus {
    Queued,
    Processing,
    Ready,
    Failed,
    #[serde(other)]
    Unknown,
}

impl IndexingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, IndexingStatus::Ready | IndexingStatus::Failed)
    }
}

/// Request body for attaching an asset to an index.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttachAssetRequest {
    pub asset_id: String,
    pub enable_video_stream: bool,
}

/// HLS streaming info exposed on an indexed asset once video streaming is
/// enabled. Thumbnails may be absent or empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HlsInfo {
    #[serde(default)]
    pub thumbnail_urls: Vec<String>,
}

/// The association of an asset with an index, carrying its own status.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedAsset {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: IndexingStatus,
    #[serde(default)]
    pub hls: Option<HlsInfo>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl IndexedAsset {
    /// First provider-hosted preview image, if streaming thumbnails exist.
    pub fn first_thumbnail(&self) -> Option<&str> {
        self.hls
            .as_ref()
            .and_then(|hls| hls.thumbnail_urls.first())
            .map(String::as_str)
    }
}

/// Request body for a search query.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchRequest {
    pub index_id: String,
    pub query_text: String,
    pub search_options: Vec<String>,
    pub page_limit: u32,
}

/// A single ranked search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchMatch {
    /// Offset of the matching segment from start of file, fractional seconds.
    pub start: f64,
    pub end: f64,
    pub score: f64,
    #[serde(default)]
    pub video_id: Option<String>,
}

/// First page of search results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchMatch>,
}

/// Request body for the streaming analyze endpoint.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyzeRequest {
    pub video_id: String,
    pub prompt: String,
    pub stream: bool,
}

/// Kind of event arriving on the analyze stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeEventType {
    StreamStart,
    TextGeneration,
    StreamEnd,
    #[serde(other)]
    Unknown,
}

/// One event from the analyze stream. Only `text_generation` events carry
/// text; everything else is framing.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeEvent {
    pub event_type: AnalyzeEventType,
    #[serde(default)]
    pub text: String,
}

impl AnalyzeEvent {
    pub fn is_text(&self) -> bool {
        self.event_type == AnalyzeEventType::TextGeneration
    }
}
