use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwelveLabsError>;

#[derive(Debug, Error)]
pub enum TwelveLabsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upload error: {0}")]
    Upload(String),
}

impl From<reqwest::Error> for TwelveLabsError {
    fn from(err: reqwest::Error) -> Self {
        TwelveLabsError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TwelveLabsError {
    fn from(err: serde_json::Error) -> Self {
        TwelveLabsError::Parse(err.to_string())
    }
}
