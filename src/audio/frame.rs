use super::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

/// Canonical PCM clip: 16 kHz, mono, signed 16-bit samples.
///
/// Built once by the normalizer and handed to engines by reference; there is
/// no mutable access after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAudioFrame {
    samples: Vec<i16>,
}

impl CanonicalAudioFrame {
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        CANONICAL_SAMPLE_RATE
    }

    pub fn channels(&self) -> u16 {
        CANONICAL_CHANNELS
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / CANONICAL_SAMPLE_RATE as f32
    }

    /// Little-endian PCM16 bytes, as fed to byte-oriented decoders.
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// Samples scaled to `[-1.0, 1.0]` for float-input models.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }
}
