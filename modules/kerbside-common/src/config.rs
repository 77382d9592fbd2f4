use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Twelve Labs
    pub twelve_key: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub max_upload_bytes: usize,

    // Frame extraction
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,

    // Indexing poll loop
    pub poll_interval: Duration,
    pub indexing_deadline: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            twelve_key: required_env("TWELVE_KEY"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            max_upload_bytes: env_u64("MAX_UPLOAD_MB", 512) as usize * 1024 * 1024,
            ffmpeg_bin: env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_bin: env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string()),
            poll_interval: Duration::from_secs(env_u64("INDEXING_POLL_SECS", 5)),
            indexing_deadline: Duration::from_secs(env_u64("INDEXING_DEADLINE_SECS", 600)),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
