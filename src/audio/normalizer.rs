use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::convert::to_canonical_samples;
use super::transcoder::Transcoder;
use super::wav::{is_canonical, open_wav, read_pcm16, read_scaled};
use super::{AudioError, CanonicalAudioFrame};

/// Turns uploaded audio of any container into a [`CanonicalAudioFrame`].
pub struct AudioNormalizer {
    scratch_dir: PathBuf,
    transcoder: Arc<dyn Transcoder>,
}

impl AudioNormalizer {
    pub fn new(scratch_dir: impl Into<PathBuf>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            transcoder,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub async fn normalize(
        &self,
        bytes: &[u8],
        mimetype: &str,
    ) -> Result<CanonicalAudioFrame, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::Decode("empty audio buffer".to_string()));
        }

        if is_wav_mimetype(mimetype) {
            match frame_from_wav(bytes) {
                Ok(frame) => {
                    tracing::debug!(
                        samples = frame.len(),
                        duration_secs = frame.duration_secs(),
                        "WAV decoded in-process"
                    );
                    return Ok(frame);
                }
                // Valid RIFF with a codec we don't read (ADPCM, mu-law, ...).
                Err(AudioError::Unsupported(reason)) => {
                    tracing::debug!(%reason, "WAV encoding not handled in-process, transcoding");
                }
                Err(e) => return Err(e),
            }
        }

        self.transcode_to_frame(bytes, mimetype).await
    }

    async fn transcode_to_frame(
        &self,
        bytes: &[u8],
        mimetype: &str,
    ) -> Result<CanonicalAudioFrame, AudioError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        // Both scratch files are removed when these guards drop, on success,
        // on error and when the request future is cancelled.
        let stem = scratch_stem();
        let input = tempfile::Builder::new()
            .prefix(&format!("speech_in_{}_", stem))
            .suffix(&format!(".{}", extension_for(mimetype)))
            .tempfile_in(&self.scratch_dir)?;
        let output = tempfile::Builder::new()
            .prefix(&format!("speech_out_{}_", stem))
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)?;

        tokio::fs::write(input.path(), bytes).await?;

        tracing::info!(
            transcoder = self.transcoder.name(),
            mimetype,
            bytes = bytes.len(),
            "Transcoding audio to canonical WAV"
        );
        self.transcoder
            .transcode(input.path(), output.path())
            .await?;

        let wav_bytes = tokio::fs::read(output.path()).await?;
        frame_from_wav(&wav_bytes)
    }
}

/// Parse a WAV buffer into a canonical frame. Already-canonical input is
/// passed through sample for sample.
pub fn frame_from_wav(bytes: &[u8]) -> Result<CanonicalAudioFrame, AudioError> {
    let mut reader = open_wav(bytes)?;
    let spec = reader.spec();
    if is_canonical(&spec) {
        return Ok(CanonicalAudioFrame::from_samples(read_pcm16(&mut reader)?));
    }

    tracing::debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "Converting WAV to canonical format"
    );
    let interleaved = read_scaled(&mut reader)?;
    Ok(CanonicalAudioFrame::from_samples(to_canonical_samples(
        &interleaved,
        spec.channels,
        spec.sample_rate,
    )))
}

pub fn is_wav_mimetype(mimetype: &str) -> bool {
    let lower = mimetype.to_ascii_lowercase();
    lower.contains("wav") || lower.contains("wave")
}

fn extension_for(mimetype: &str) -> &'static str {
    let lower = mimetype.to_ascii_lowercase();
    if lower.contains("webm") {
        "webm"
    } else if lower.contains("ogg") || lower.contains("opus") {
        "ogg"
    } else if lower.contains("mpeg") || lower.contains("mp3") {
        "mp3"
    } else if lower.contains("m4a") || lower.contains("mp4") || lower.contains("aac") {
        "m4a"
    } else if is_wav_mimetype(&lower) {
        "wav"
    } else {
        "bin"
    }
}

// Millisecond timestamp plus a random suffix keeps names unique across
// concurrent requests sharing one scratch directory.
fn scratch_stem() -> String {
    format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}
