pub mod error;
pub mod types;

pub use error::{Result, TwelveLabsError};
pub use types::{
    AnalyzeEvent, AnalyzeEventType, AssetHandle, HlsInfo, IndexHandle, IndexModel, IndexedAsset,
    IndexingStatus, SearchMatch,
};

use std::path::Path;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use types::{AnalyzeRequest, AttachAssetRequest, CreateIndexRequest, SearchRequest, SearchResponse};

const BASE_URL: &str = "https://api.twelvelabs.io/v1.3";

const API_KEY_HEADER: &str = "x-api-key";

/// Model name for natural-language video analysis (Pegasus).
pub const ANALYSIS_MODEL: &str = "pegasus1.2";

/// Model name for visual search (Marengo).
pub const SEARCH_MODEL: &str = "marengo2.7";

pub struct TwelveLabsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TwelveLabsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Create a new index with the given enabled models.
    pub async fn create_index(&self, index_name: &str, models: Vec<IndexModel>) -> Result<IndexHandle> {
        let body = CreateIndexRequest {
            index_name: index_name.to_string(),
            models,
        };

        let resp = self
            .client
            .post(format!("{}/indexes", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let index: IndexHandle = parse_response(resp).await?;
        tracing::info!(index_id = %index.id, index_name, "Index created");
        Ok(index)
    }

    /// Upload a local video file as a direct asset.
    pub async fn upload_asset(&self, path: &Path) -> Result<AssetHandle> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TwelveLabsError::Upload(format!("read {}: {e}", path.display())))?;

        tracing::info!(file_name, bytes = bytes.len(), "Uploading asset");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("method", "direct")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/assets", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let asset: AssetHandle = parse_response(resp).await?;
        tracing::info!(asset_id = %asset.id, "Asset uploaded");
        Ok(asset)
    }

    /// Attach an uploaded asset to an index. Returns the indexed asset with
    /// its initial, typically non-terminal, status.
    pub async fn attach_asset(
        &self,
        index_id: &str,
        asset_id: &str,
        enable_video_stream: bool,
    ) -> Result<IndexedAsset> {
        let body = AttachAssetRequest {
            asset_id: asset_id.to_string(),
            enable_video_stream,
        };

        let resp = self
            .client
            .post(format!("{}/indexes/{index_id}/indexed-assets", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// Retrieve the current status of an indexed asset.
    pub async fn get_indexed_asset(
        &self,
        index_id: &str,
        indexed_asset_id: &str,
    ) -> Result<IndexedAsset> {
        let resp = self
            .client
            .get(format!(
                "{}/indexes/{index_id}/indexed-assets/{indexed_asset_id}",
                self.base_url
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// Run a free-text search over an index. Only the first page is ever
    /// requested; results arrive in the provider's relevance order.
    pub async fn search(
        &self,
        index_id: &str,
        query_text: &str,
        search_options: &[&str],
        page_limit: u32,
    ) -> Result<Vec<SearchMatch>> {
        let body = SearchRequest {
            index_id: index_id.to_string(),
            query_text: query_text.to_string(),
            search_options: search_options.iter().map(|o| o.to_string()).collect(),
            page_limit,
        };

        let resp = self
            .client
            .post(format!("{}/search", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let results: SearchResponse = parse_response(resp).await?;
        tracing::info!(query_text, count = results.data.len(), "Search complete");
        Ok(results.data)
    }

    /// Open the streaming analyze call for an indexed asset.
    ///
    /// Yields events in arrival order until the provider closes the stream.
    /// Restartable only by issuing a new call.
    pub fn analyze_stream(
        &self,
        video_id: &str,
        prompt: &str,
    ) -> BoxStream<'static, Result<AnalyzeEvent>> {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = format!("{}/analyze", self.base_url);
        let body = AnalyzeRequest {
            video_id: video_id.to_string(),
            prompt: prompt.to_string(),
            stream: true,
        };

        let stream = async_stream::try_stream! {
            let resp = client
                .post(&url)
                .header(API_KEY_HEADER, &api_key)
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                Err(TwelveLabsError::Api {
                    status: status.as_u16(),
                    message,
                })?;
            } else {
                let mut chunks = resp.bytes_stream();
                let mut buf: Vec<u8> = Vec::new();
                while let Some(chunk) = chunks.next().await {
                    buf.extend_from_slice(&chunk?);
                    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        if let Some(event) = parse_event_line(&line)? {
                            yield event;
                        }
                    }
                }
                if let Some(event) = parse_event_line(&buf)? {
                    yield event;
                }
            }
        };

        stream.boxed()
    }
}

/// Parse one line of the analyze stream. Lines may be bare JSON or carry an
/// SSE-style `data:` prefix; blank lines are keep-alive framing.
fn parse_event_line(line: &[u8]) -> Result<Option<AnalyzeEvent>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| TwelveLabsError::Parse(e.to_string()))?
        .trim();
    let text = text.strip_prefix("data:").map(str::trim).unwrap_or(text);
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(TwelveLabsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_parses_bare_json() {
        let event = parse_event_line(br#"{"event_type": "text_generation", "text": "hi"}"#)
            .unwrap()
            .unwrap();
        assert!(event.is_text());
        assert_eq!(event.text, "hi");
    }

    #[test]
    fn event_line_strips_sse_prefix() {
        let event = parse_event_line(b"data: {\"event_type\": \"stream_start\"}\n")
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type, AnalyzeEventType::StreamStart);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_event_line(b"").unwrap().is_none());
        assert!(parse_event_line(b"\n").unwrap().is_none());
        assert!(parse_event_line(b"data:\n").unwrap().is_none());
    }

    #[test]
    fn malformed_line_is_a_parse_error() {
        let err = parse_event_line(b"not json\n").unwrap_err();
        assert!(matches!(err, TwelveLabsError::Parse(_)));
    }
}
