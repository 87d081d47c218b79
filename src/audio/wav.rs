// WAV reading through hound, plus the PCM16 encoder used for uploads.
//
// hound walks the RIFF sub-chunks by tag and skips LIST, fact and other
// metadata ahead of the sample data, so no fixed header size is assumed.

use hound::{SampleFormat, WavReader, WavSpec};
use std::io::Cursor;

use super::{AudioError, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

const WAVE_FORMAT_PCM: u16 = 0x0001;

pub type WavBytesReader<'a> = WavReader<Cursor<&'a [u8]>>;

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        match e {
            // Valid RIFF with a codec or container width we don't read in-process.
            hound::Error::Unsupported | hound::Error::TooWide => {
                AudioError::Unsupported(e.to_string())
            }
            hound::Error::IoError(io) => {
                AudioError::Decode(format!("truncated WAV or no data chunk: {}", io))
            }
            other => AudioError::Decode(other.to_string()),
        }
    }
}

/// Read the header and position the reader at the first sample.
pub fn open_wav(bytes: &[u8]) -> Result<WavBytesReader<'_>, AudioError> {
    Ok(WavReader::new(Cursor::new(bytes))?)
}

/// 16 kHz, mono, 16-bit signed integer.
pub fn is_canonical(spec: &WavSpec) -> bool {
    spec.sample_format == SampleFormat::Int
        && spec.channels == CANONICAL_CHANNELS
        && spec.sample_rate == CANONICAL_SAMPLE_RATE
        && spec.bits_per_sample == 16
}

/// Samples exactly as stored. Fails with `Unsupported` when the frames are
/// wider than two bytes, so padding is never read as audio.
pub fn read_pcm16(reader: &mut WavBytesReader<'_>) -> Result<Vec<i16>, AudioError> {
    let channels = reader.spec().channels as usize;
    whole_frames(reader.samples::<i16>(), channels)
}

/// Interleaved samples scaled to `[-1.0, 1.0]`, whatever the stored width.
pub fn read_scaled(reader: &mut WavBytesReader<'_>) -> Result<Vec<f32>, AudioError> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    match spec.sample_format {
        SampleFormat::Float => whole_frames(reader.samples::<f32>(), channels),
        SampleFormat::Int => {
            let full_scale = 2f32.powi(spec.bits_per_sample as i32 - 1);
            let ints = whole_frames(reader.samples::<i32>(), channels)?;
            Ok(ints.into_iter().map(|s| s as f32 / full_scale).collect())
        }
    }
}

// A data chunk whose declared length runs past the upload keeps the frames
// that did arrive. The reader is in memory, so an I/O error here only means
// the bytes ran out.
fn whole_frames<S>(
    samples: impl Iterator<Item = hound::Result<S>>,
    channels: usize,
) -> Result<Vec<S>, AudioError> {
    let mut out = Vec::new();
    for sample in samples {
        match sample {
            Ok(s) => out.push(s),
            Err(hound::Error::IoError(_)) => {
                tracing::debug!(read = out.len(), "WAV data shorter than declared");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    out.truncate(out.len() - out.len() % channels.max(1));
    Ok(out)
}

/// Encode interleaved PCM16 samples as a minimal 44-byte-header WAV file.
pub fn encode_pcm16_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_size = (samples.len() * 2) as u32;
    let mut wav = Vec::with_capacity(44 + samples.len() * 2);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * channels as u32 * 2;
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&(channels * 2).to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_list_chunk(samples: &[i16]) -> Vec<u8> {
        let plain = encode_pcm16_wav(samples, 16_000, 1);
        let mut out = Vec::new();
        out.extend_from_slice(&plain[..36]); // RIFF + WAVE + fmt chunk
        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(b"INFO");
        out.extend_from_slice(&plain[36..]);
        let riff_size = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&riff_size.to_le_bytes());
        out
    }

    /// Overwrite the fmt fields of a canonical fixture.
    fn with_fmt(channels: u16, bits: u16, block_align: u16) -> Vec<u8> {
        let mut wav = encode_pcm16_wav(&[0; 8], 16_000, 1);
        let byte_rate = 16_000u32 * block_align as u32;
        wav[22..24].copy_from_slice(&channels.to_le_bytes());
        wav[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        wav[32..34].copy_from_slice(&block_align.to_le_bytes());
        wav[34..36].copy_from_slice(&bits.to_le_bytes());
        wav
    }

    #[test]
    fn reads_canonical_samples() {
        let wav = encode_pcm16_wav(&[1, 2, 3], 16_000, 1);
        let mut reader = open_wav(&wav).unwrap();
        assert!(is_canonical(&reader.spec()));
        assert_eq!(read_pcm16(&mut reader).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn finds_data_after_metadata_chunks() {
        let wav = with_list_chunk(&[7, -7, 300]);
        let mut reader = open_wav(&wav).unwrap();
        assert_eq!(read_pcm16(&mut reader).unwrap(), vec![7, -7, 300]);
    }

    #[test]
    fn missing_data_chunk_is_a_decode_error() {
        let wav = encode_pcm16_wav(&[1, 2], 16_000, 1);
        let err = open_wav(&wav[..36]).err().unwrap();
        assert!(matches!(err, AudioError::Decode(msg) if msg.contains("data")));
    }

    #[test]
    fn rejects_non_riff_input() {
        let err = open_wav(b"OggS\0\0\0\0\0\0\0\0\0\0").err().unwrap();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn compressed_formats_are_unsupported_not_corrupt() {
        let mut wav = encode_pcm16_wav(&[0; 4], 8_000, 1);
        wav[20..22].copy_from_slice(&0x0011u16.to_le_bytes()); // IMA ADPCM
        let err = open_wav(&wav).err().unwrap();
        assert!(matches!(err, AudioError::Unsupported(_)));
    }

    #[test]
    fn huge_channel_count_is_a_decode_error() {
        let err = open_wav(&with_fmt(40_000, 16, 2)).err().unwrap();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn block_align_narrower_than_frame_is_a_decode_error() {
        let err = open_wav(&with_fmt(32_768, 32, 4)).err().unwrap();
        assert!(matches!(err, AudioError::Decode(_)));

        let err = open_wav(&with_fmt(2, 16, 2)).err().unwrap();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn padded_frames_are_not_read_as_pcm16() {
        // 16 valid bits in a 4-byte container: [100, pad, 200, pad].
        let mut wav = with_fmt(1, 16, 4);
        wav[44..52].copy_from_slice(&[100, 0, 0, 0, 200, 0, 0, 0]);
        let mut reader = open_wav(&wav).unwrap();
        assert!(is_canonical(&reader.spec()));
        let err = read_pcm16(&mut reader).unwrap_err();
        assert!(matches!(err, AudioError::Unsupported(_)));
    }

    #[test]
    fn data_shorter_than_declared_keeps_what_arrived() {
        let mut wav = encode_pcm16_wav(&[5, 6, 7], 16_000, 1);
        wav[40..44].copy_from_slice(&1000u32.to_le_bytes());
        let mut reader = open_wav(&wav).unwrap();
        assert_eq!(read_pcm16(&mut reader).unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn odd_data_length_is_a_decode_error() {
        let mut wav = encode_pcm16_wav(&[5, 6], 16_000, 1);
        wav.push(0x7f);
        wav[40..44].copy_from_slice(&5u32.to_le_bytes());
        let err = open_wav(&wav).err().unwrap();
        assert!(matches!(err, AudioError::Decode(_)));
    }

    #[test]
    fn scales_float_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..10 {
                writer.write_sample(0.25f32).unwrap();
                writer.write_sample(-0.25f32).unwrap();
            }
            writer.finalize().unwrap();
        }
        let bytes = cursor.into_inner();

        let mut reader = open_wav(&bytes).unwrap();
        assert!(!is_canonical(&reader.spec()));
        let samples = read_scaled(&mut reader).unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(&samples[..2], &[0.25, -0.25]);
    }

    #[test]
    fn scales_by_stored_bit_depth() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            writer.write_sample(-8_388_608i32).unwrap();
            writer.write_sample(4_194_304i32).unwrap();
            writer.finalize().unwrap();
        }
        let bytes = cursor.into_inner();

        let samples = read_scaled(&mut open_wav(&bytes).unwrap()).unwrap();
        assert_eq!(samples, vec![-1.0, 0.5]);
    }
}
