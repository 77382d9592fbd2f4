/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Fatal workflow failures. Anything here aborts the request; search and
/// frame-extraction failures degrade to null response fields instead and
/// never appear in this enum.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Could not persist upload: {0}")]
    PersistUpload(String),

    #[error("Video indexing failed")]
    IndexingFailed,

    #[error("Video indexing did not finish within {0} seconds")]
    IndexingTimeout(u64),

    #[error(transparent)]
    Remote(#[from] twelvelabs_client::TwelveLabsError),
}
