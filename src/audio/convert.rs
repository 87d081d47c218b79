// In-process conversion of decoded WAV samples to the canonical shape:
// fold channels to mono, resample linearly, requantize to i16.

use super::CANONICAL_SAMPLE_RATE;

/// Convert interleaved samples in `[-1.0, 1.0]` into canonical mono 16 kHz PCM16.
pub fn to_canonical_samples(interleaved: &[f32], channels: u16, sample_rate: u32) -> Vec<i16> {
    let mono = fold_to_mono(interleaved, channels as usize);
    let resampled = resample_linear(&mono, sample_rate, CANONICAL_SAMPLE_RATE);
    requantize(&resampled)
}

/// Average interleaved channels into one.
pub fn fold_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler. Adequate for short speech clips headed to ASR.
pub fn resample_linear(mono: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || mono.is_empty() {
        return mono.to_vec();
    }

    let src_rate = src_rate.max(1) as f64;
    let dst_rate = dst_rate as f64;
    let out_len = ((mono.len() as f64) * dst_rate / src_rate).ceil() as usize;
    let ratio = src_rate / dst_rate;

    let mut resampled = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let s0 = mono.get(idx).copied().unwrap_or(0.0);
        let s1 = mono.get(idx + 1).copied().unwrap_or(s0);
        resampled.push(s0 + (s1 - s0) * frac);
    }
    resampled
}

/// Clamp to `[-1.0, 1.0]` and scale to signed 16-bit.
pub fn requantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}
