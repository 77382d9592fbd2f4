//! Seams between the workflow and its external collaborators.
//!
//! The remote video-understanding service and the local frame decoder are
//! injected through these traits so the workflow can be exercised against
//! in-memory substitutes.

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use twelvelabs_client::error::Result as ClientResult;
use twelvelabs_client::{
    AnalyzeEvent, AssetHandle, IndexHandle, IndexModel, IndexedAsset, SearchMatch,
    TwelveLabsClient,
};

use crate::extract::{ExtractError, ExtractedFrame};

/// Remote index/search/analysis capability.
///
/// Implemented by [`TwelveLabsClient`] in production and by in-memory fakes
/// in tests.
#[async_trait]
pub trait VideoUnderstanding: Send + Sync {
    async fn create_index(
        &self,
        index_name: &str,
        models: Vec<IndexModel>,
    ) -> ClientResult<IndexHandle>;

    async fn upload_asset(&self, path: &Path) -> ClientResult<AssetHandle>;

    async fn attach_asset(
        &self,
        index_id: &str,
        asset_id: &str,
        enable_video_stream: bool,
    ) -> ClientResult<IndexedAsset>;

    async fn get_indexed_asset(
        &self,
        index_id: &str,
        indexed_asset_id: &str,
    ) -> ClientResult<IndexedAsset>;

    async fn analyze_stream(
        &self,
        video_id: &str,
        prompt: &str,
    ) -> ClientResult<BoxStream<'static, ClientResult<AnalyzeEvent>>>;

    async fn search(
        &self,
        index_id: &str,
        query_text: &str,
        search_options: &[&str],
        page_limit: u32,
    ) -> ClientResult<Vec<SearchMatch>>;
}

#[async_trait]
impl VideoUnderstanding for TwelveLabsClient {
    async fn create_index(
        &self,
        index_name: &str,
        models: Vec<IndexModel>,
    ) -> ClientResult<IndexHandle> {
        TwelveLabsClient::create_index(self, index_name, models).await
    }

    async fn upload_asset(&self, path: &Path) -> ClientResult<AssetHandle> {
        TwelveLabsClient::upload_asset(self, path).await
    }

    async fn attach_asset(
        &self,
        index_id: &str,
        asset_id: &str,
        enable_video_stream: bool,
    ) -> ClientResult<IndexedAsset> {
        TwelveLabsClient::attach_asset(self, index_id, asset_id, enable_video_stream).await
    }

    async fn get_indexed_asset(
        &self,
        index_id: &str,
        indexed_asset_id: &str,
    ) -> ClientResult<IndexedAsset> {
        TwelveLabsClient::get_indexed_asset(self, index_id, indexed_asset_id).await
    }

    async fn analyze_stream(
        &self,
        video_id: &str,
        prompt: &str,
    ) -> ClientResult<BoxStream<'static, ClientResult<AnalyzeEvent>>> {
        Ok(TwelveLabsClient::analyze_stream(self, video_id, prompt))
    }

    async fn search(
        &self,
        index_id: &str,
        query_text: &str,
        search_options: &[&str],
        page_limit: u32,
    ) -> ClientResult<Vec<SearchMatch>> {
        TwelveLabsClient::search(self, index_id, query_text, search_options, page_limit).await
    }
}

// Delegation so a shared client can be handed to the workflow while the
// caller keeps a handle for assertions (tests) or reuse.
#[async_trait]
impl<T: VideoUnderstanding + ?Sized> VideoUnderstanding for std::sync::Arc<T> {
    async fn create_index(
        &self,
        index_name: &str,
        models: Vec<IndexModel>,
    ) -> ClientResult<IndexHandle> {
        (**self).create_index(index_name, models).await
    }

    async fn upload_asset(&self, path: &Path) -> ClientResult<AssetHandle> {
        (**self).upload_asset(path).await
    }

    async fn attach_asset(
        &self,
        index_id: &str,
        asset_id: &str,
        enable_video_stream: bool,
    ) -> ClientResult<IndexedAsset> {
        (**self).attach_asset(index_id, asset_id, enable_video_stream).await
    }

    async fn get_indexed_asset(
        &self,
        index_id: &str,
        indexed_asset_id: &str,
    ) -> ClientResult<IndexedAsset> {
        (**self).get_indexed_asset(index_id, indexed_asset_id).await
    }

    async fn analyze_stream(
        &self,
        video_id: &str,
        prompt: &str,
    ) -> ClientResult<BoxStream<'static, ClientResult<AnalyzeEvent>>> {
        (**self).analyze_stream(video_id, prompt).await
    }

    async fn search(
        &self,
        index_id: &str,
        query_text: &str,
        search_options: &[&str],
        page_limit: u32,
    ) -> ClientResult<Vec<SearchMatch>> {
        (**self)
            .search(index_id, query_text, search_options, page_limit)
            .await
    }
}

/// Local decode-one-frame capability: seek, decode, encode as JPEG.
///
/// `frame_path` is caller-owned; implementations write the encoded image
/// there so the orchestrator's artifact tracking covers it.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn extract(
        &self,
        video_path: &Path,
        seconds: f64,
        frame_path: &Path,
    ) -> std::result::Result<ExtractedFrame, ExtractError>;
}

#[async_trait]
impl<T: FrameSource + ?Sized> FrameSource for std::sync::Arc<T> {
    async fn extract(
        &self,
        video_path: &Path,
        seconds: f64,
        frame_path: &Path,
    ) -> std::result::Result<ExtractedFrame, ExtractError> {
        (**self).extract(video_path, seconds, frame_path).await
    }
}
