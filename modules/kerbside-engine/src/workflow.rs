//! One-request orchestration: persist, index, poll, analyze, resolve, clean up.

use std::path::Path;

use bytes::Bytes;
use futures::StreamExt;
use tracing::info;
use uuid::Uuid;

use kerbside_common::ArtifactSet;
use twelvelabs_client::{IndexModel, ANALYSIS_MODEL, SEARCH_MODEL};

use crate::error::{Result, WorkflowError};
use crate::poller::{wait_for_indexing, PollPolicy};
use crate::resolve::resolve_match;
use crate::traits::{FrameSource, VideoUnderstanding};

/// The vehicle the caller is looking for.
#[derive(Debug, Clone)]
pub struct VehicleQuery {
    pub make: String,
    pub model: String,
    pub color: String,
}

impl VehicleQuery {
    /// Prompt for the analysis model.
    pub fn analysis_prompt(&self) -> String {
        format!(
            "Analyze the video completely. Is there a {} {} {}?",
            self.color, self.make, self.model
        )
    }

    /// Free-text query for the visual search.
    pub fn search_query(&self) -> String {
        format!("a {} {} {}", self.color, self.make, self.model)
    }
}

/// Everything the caller gets back on success.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub analysis: String,
    pub screenshot: Option<String>,
    pub timestamp: Option<f64>,
}

/// Sequences one search request end to end. The remote client and frame
/// decoder are injected so the whole workflow runs against substitutes in
/// tests.
pub struct SearchWorkflow<C, F> {
    client: C,
    frames: F,
    poll: PollPolicy,
}

impl<C, F> SearchWorkflow<C, F>
where
    C: VideoUnderstanding,
    F: FrameSource,
{
    pub fn new(client: C, frames: F, poll: PollPolicy) -> Self {
        Self {
            client,
            frames,
            poll,
        }
    }

    /// Run the whole workflow for one uploaded video.
    ///
    /// Errors up to and including the analysis abort the request; search and
    /// extraction failures degrade to null response fields. Every temporary
    /// file is removed on both exit paths.
    pub async fn run(
        &self,
        video: Bytes,
        file_name: &str,
        query: &VehicleQuery,
    ) -> Result<WorkflowOutput> {
        let mut artifacts =
            ArtifactSet::create().map_err(|e| WorkflowError::PersistUpload(e.to_string()))?;
        let result = self.execute(&mut artifacts, video, file_name, query).await;
        artifacts.cleanup();
        result
    }

    async fn execute(
        &self,
        artifacts: &mut ArtifactSet,
        video: Bytes,
        file_name: &str,
        query: &VehicleQuery,
    ) -> Result<WorkflowOutput> {
        let video_path = artifacts.register(&upload_suffix(file_name));
        tokio::fs::write(&video_path, &video)
            .await
            .map_err(|e| WorkflowError::PersistUpload(e.to_string()))?;
        info!(path = %video_path.display(), bytes = video.len(), "Upload persisted");

        let index_name = format!("index_{}", Uuid::new_v4());
        let models = vec![
            // Pegasus for the text analysis
            IndexModel::new(ANALYSIS_MODEL, &["visual", "audio"]),
            // Marengo for the search/screenshot capability
            IndexModel::new(SEARCH_MODEL, &["visual", "audio"]),
        ];
        let index = self.client.create_index(&index_name, models).await?;

        let asset = self.client.upload_asset(&video_path).await?;

        let indexed = self.client.attach_asset(&index.id, &asset.id, true).await?;
        info!(indexed_asset_id = %indexed.id, "Indexing started");

        let indexed = wait_for_indexing(&self.client, self.poll, &index.id, &indexed.id).await?;

        let prompt = query.analysis_prompt();
        let analysis = self.collect_analysis(&indexed.id, &prompt).await?;
        info!(chars = analysis.len(), "Analysis complete");

        let frame_path = artifacts.register(".jpg");
        let resolved = resolve_match(
            &self.client,
            &self.frames,
            &index.id,
            &indexed.id,
            &video_path,
            &frame_path,
            &query.search_query(),
        )
        .await;

        Ok(WorkflowOutput {
            analysis,
            screenshot: resolved.screenshot,
            timestamp: resolved.timestamp,
        })
    }

    /// Concatenate the generated-text fragments of the analyze stream, in
    /// arrival order.
    async fn collect_analysis(&self, video_id: &str, prompt: &str) -> Result<String> {
        let mut stream = self.client.analyze_stream(video_id, prompt).await?;
        let mut full = String::new();
        while let Some(event) = stream.next().await {
            let event = event?;
            if event.is_text() {
                full.push_str(&event.text);
            }
        }
        Ok(full)
    }
}

/// Keep the upload's container extension so the decoder sees a familiar name.
fn upload_suffix(file_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => ".mp4".to_string(),
    }
}
