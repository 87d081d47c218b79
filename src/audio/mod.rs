pub mod convert;
pub mod frame;
pub mod normalizer;
pub mod transcoder;
pub mod wav;

pub use frame::CanonicalAudioFrame;
pub use normalizer::{frame_from_wav, AudioNormalizer};
pub use transcoder::{FfmpegTranscoder, Transcoder};
pub use wav::{encode_pcm16_wav, open_wav};

use thiserror::Error;

pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;
pub const CANONICAL_CHANNELS: u16 = 1;

/// Failures while turning uploaded bytes into canonical PCM. None of these
/// are engine specific, so none are retried against another engine.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("unsupported audio encoding: {0}")]
    Unsupported(String),

    #[error("transcoding failed: {0}")]
    Transcoder(String),

    #[error("scratch file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
