//! Best-match selection and screenshot production.
//!
//! Failures in here never abort the request: a matching analysis without a
//! screenshot is still a valid response, so every error degrades to a null
//! field instead of propagating.

use std::path::Path;

use base64::Engine;
use tracing::{info, warn};

use crate::traits::{FrameSource, VideoUnderstanding};

/// Page size for the visual search; only the first page is consulted.
const SEARCH_PAGE_LIMIT: u32 = 5;

/// Modalities the search runs over.
const SEARCH_OPTIONS: &[&str] = &["visual"];

/// Outcome of match resolution. Both fields absent means "no match found",
/// which is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMatch {
    pub screenshot: Option<String>,
    pub timestamp: Option<f64>,
}

/// Search the index for the vehicle and produce a screenshot for the best
/// match: a locally extracted high-quality frame when possible, the
/// provider's first HLS thumbnail as backup, no image as last resort.
pub async fn resolve_match<C, F>(
    client: &C,
    frames: &F,
    index_id: &str,
    indexed_asset_id: &str,
    video_path: &Path,
    frame_path: &Path,
    query: &str,
) -> ResolvedMatch
where
    C: VideoUnderstanding + ?Sized,
    F: FrameSource + ?Sized,
{
    let matches = match client
        .search(index_id, query, SEARCH_OPTIONS, SEARCH_PAGE_LIMIT)
        .await
    {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, query, "Search failed; responding without a match");
            return ResolvedMatch::default();
        }
    };

    // The provider returns results ranked by relevance score, descending, so
    // the head of the first page is the best match.
    let Some(best) = matches.first() else {
        info!(query, "No search results");
        return ResolvedMatch::default();
    };
    let timestamp = best.start;
    info!(timestamp, score = best.score, "Best match located");

    match frames.extract(video_path, timestamp, frame_path).await {
        Ok(frame) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&frame.bytes);
            ResolvedMatch {
                screenshot: Some(format!("data:image/jpeg;base64,{encoded}")),
                timestamp: Some(timestamp),
            }
        }
        Err(e) => {
            warn!(error = %e, "Frame extraction failed, falling back to HLS thumbnail");
            ResolvedMatch {
                screenshot: thumbnail_fallback(client, index_id, indexed_asset_id).await,
                timestamp: Some(timestamp),
            }
        }
    }
}

/// Re-fetch the indexed asset and take its first streaming thumbnail, if the
/// provider exposes any.
async fn thumbnail_fallback<C>(
    client: &C,
    index_id: &str,
    indexed_asset_id: &str,
) -> Option<String>
where
    C: VideoUnderstanding + ?Sized,
{
    match client.get_indexed_asset(index_id, indexed_asset_id).await {
        Ok(asset) => {
            let thumbnail = asset.first_thumbnail().map(str::to_string);
            if let Some(ref url) = thumbnail {
                info!(url, "Using HLS thumbnail");
            }
            thumbnail
        }
        Err(e) => {
            warn!(error = %e, "Could not refresh indexed asset for thumbnail");
            None
        }
    }
}
