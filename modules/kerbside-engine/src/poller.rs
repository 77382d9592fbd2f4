//! Drives a freshly attached asset to a terminal indexing state.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use twelvelabs_client::{IndexedAsset, IndexingStatus};

use crate::error::{Result, WorkflowError};
use crate::traits::VideoUnderstanding;

/// Polling cadence and deadline for remote indexing.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            deadline: Duration::from_secs(600),
        }
    }
}

/// Poll until the indexed asset reaches `ready` or `failed`.
///
/// `failed` aborts the whole request before analysis or search run. The
/// deadline bounds the wait so a stuck remote job cannot hang the request;
/// unknown statuses count as still in progress.
pub async fn wait_for_indexing<C>(
    client: &C,
    policy: PollPolicy,
    index_id: &str,
    indexed_asset_id: &str,
) -> Result<IndexedAsset>
where
    C: VideoUnderstanding + ?Sized,
{
    let started = Instant::now();
    loop {
        let asset = client.get_indexed_asset(index_id, indexed_asset_id).await?;
        match asset.status {
            IndexingStatus::Ready => {
                info!(
                    indexed_asset_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Indexing complete"
                );
                return Ok(asset);
            }
            IndexingStatus::Failed => return Err(WorkflowError::IndexingFailed),
            status => {
                debug!(indexed_asset_id, ?status, "Indexing in progress");
            }
        }

        if started.elapsed() >= policy.deadline {
            return Err(WorkflowError::IndexingTimeout(policy.deadline.as_secs()));
        }
        sleep(policy.interval).await;
    }
}
