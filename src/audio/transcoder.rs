use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{AudioError, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

/// External step that rewrites an arbitrary audio file as a canonical
/// 16 kHz / mono / PCM16 WAV file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), AudioError>;

    fn name(&self) -> &str;
}

/// Shells out to an `ffmpeg` binary.
pub struct FfmpegTranscoder {
    bin_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(bin_path: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), AudioError> {
        let started = std::time::Instant::now();

        // kill_on_drop: an abandoned request must not leave ffmpeg running
        // against a scratch file that is about to be deleted.
        let result = Command::new(&self.bin_path)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-ar")
            .arg(CANONICAL_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg(CANONICAL_CHANNELS.to_string())
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg("-f")
            .arg("wav")
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AudioError::Transcoder(format!(
                    "failed to launch {}: {}",
                    self.bin_path.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AudioError::Transcoder(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg transcoding finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
