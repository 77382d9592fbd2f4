//! High-quality single-frame extraction via ffmpeg.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::traits::FrameSource;

/// JPEG quantizer handed to ffmpeg. 2 on ffmpeg's 2-31 scale is roughly
/// JPEG quality 95; fixed so every caller gets the same fidelity.
const JPEG_QUALITY: &str = "2";

/// Hard cap on a single ffmpeg/ffprobe invocation.
const DECODE_TIMEOUT: Duration = Duration::from_secs(30);

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Frame-extraction failures. Both variants are non-fatal to the request:
/// the caller substitutes a fallback image source or responds without one.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Could not open video source: {0}")]
    SourceUnavailable(String),

    #[error("Could not decode frame: {0}")]
    DecodeFailure(String),
}

/// A single decoded frame, JPEG-encoded, with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Seek-and-decode against the ffmpeg/ffprobe binaries.
pub struct FfmpegExtractor {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_bin: &str, ffprobe_bin: &str) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.to_string(),
            ffprobe_bin: ffprobe_bin.to_string(),
        }
    }

    /// Probe the first video stream for dimensions and frame statistics.
    async fn probe(&self, video_path: &Path) -> ExtractResult<ProbeStream> {
        let result = tokio::time::timeout(
            DECODE_TIMEOUT,
            tokio::process::Command::new(&self.ffprobe_bin)
                .arg("-v")
                .arg("error")
                .arg("-select_streams")
                .arg("v:0")
                .arg("-show_entries")
                .arg("stream=width,height,avg_frame_rate,nb_frames")
                .arg("-of")
                .arg("json")
                .arg(video_path)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractError::SourceUnavailable(format!(
                    "failed to run {}: {e}",
                    self.ffprobe_bin
                )))
            }
            Err(_) => {
                return Err(ExtractError::SourceUnavailable(format!(
                    "probe timed out after {}s",
                    DECODE_TIMEOUT.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::SourceUnavailable(stderr.trim().to_string()));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::SourceUnavailable(format!("probe parse: {e}")))?;

        probe
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| ExtractError::SourceUnavailable("no video stream".to_string()))
    }

    /// Seek and decode one frame into `frame_path` as a JPEG.
    async fn decode_frame(
        &self,
        video_path: &Path,
        seconds: f64,
        frame_path: &Path,
    ) -> ExtractResult<()> {
        let result = tokio::time::timeout(
            DECODE_TIMEOUT,
            tokio::process::Command::new(&self.ffmpeg_bin)
                .arg("-y")
                .arg("-ss")
                .arg(format!("{seconds}"))
                .arg("-i")
                .arg(video_path)
                .arg("-frames:v")
                .arg("1")
                .arg("-q:v")
                .arg(JPEG_QUALITY)
                .arg("-f")
                .arg("image2")
                .arg(frame_path)
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractError::DecodeFailure(format!(
                    "failed to run {}: {e}",
                    self.ffmpeg_bin
                )))
            }
            Err(_) => {
                return Err(ExtractError::DecodeFailure(format!(
                    "decode timed out after {}s",
                    DECODE_TIMEOUT.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::DecodeFailure(stderr.trim().to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegExtractor {
    /// Single seek-and-read attempt, no retries; the caller decides whether
    /// to substitute a fallback image source.
    async fn extract(
        &self,
        video_path: &Path,
        seconds: f64,
        frame_path: &Path,
    ) -> ExtractResult<ExtractedFrame> {
        if seconds < 0.0 {
            return Err(ExtractError::DecodeFailure(format!(
                "negative timestamp {seconds}"
            )));
        }

        let stream = self.probe(video_path).await?;
        info!(
            path = %video_path.display(),
            fps = stream.avg_frame_rate.as_deref().unwrap_or("?"),
            frames = stream.nb_frames.as_deref().unwrap_or("?"),
            seconds,
            "Extracting frame"
        );

        self.decode_frame(video_path, seconds, frame_path).await?;

        let bytes = tokio::fs::read(frame_path)
            .await
            .map_err(|e| ExtractError::DecodeFailure(format!("read frame: {e}")))?;
        // Seeking past end-of-stream makes ffmpeg exit cleanly with an empty
        // output file; treat that the same as a decode error.
        if bytes.is_empty() {
            return Err(ExtractError::DecodeFailure(
                "no decodable frame at timestamp".to_string(),
            ));
        }

        let (width, height) = (stream.width.unwrap_or(0), stream.height.unwrap_or(0));
        info!(bytes = bytes.len(), width, height, "Frame extracted");

        Ok(ExtractedFrame {
            bytes,
            width,
            height,
        })
    }
}
