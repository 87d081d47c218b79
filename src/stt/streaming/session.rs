use super::{Decoder, FinalResult};
use crate::stt::STTError;

/// Running/partial results are inspected after every this many chunks and
/// after the last one.
pub const INSPECT_EVERY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Finalized,
    Released,
}

/// Per-utterance decoding state. Owned by exactly one transcription call.
///
/// Bytes are fed in arbitrary chunks. A chunk ending in the middle of a
/// sample leaves its odd byte in `carry`, which is borrowed by the next chunk,
/// so the decoder only ever sees whole samples. A carry still pending at
/// finalization is dropped.
pub struct StreamingDecodeSession {
    decoder: Option<Box<dyn Decoder>>,
    state: SessionState,
    carry: Option<u8>,
    chunks_fed: usize,
    intermediates: Vec<String>,
    last_partial: String,
}

impl StreamingDecodeSession {
    pub fn open(decoder: Box<dyn Decoder>) -> Self {
        Self {
            decoder: Some(decoder),
            state: SessionState::Open,
            carry: None,
            chunks_fed: 0,
            intermediates: Vec::new(),
            last_partial: String::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chunks_fed(&self) -> usize {
        self.chunks_fed
    }

    pub fn intermediates(&self) -> &[String] {
        &self.intermediates
    }

    pub fn last_partial(&self) -> &str {
        &self.last_partial
    }

    fn open_decoder(&mut self) -> Result<&mut Box<dyn Decoder>, STTError> {
        if self.state != SessionState::Open {
            return Err(STTError::DecodeSessionError(format!(
                "session is {:?}, not accepting audio",
                self.state
            )));
        }
        self.decoder
            .as_mut()
            .ok_or_else(|| STTError::DecodeSessionError("decoder already released".to_string()))
    }

    /// Feed one chunk of little-endian PCM16 bytes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), STTError> {
        let carry = self.carry.take();
        let decoder = self.open_decoder()?;

        let mut bytes = chunk;
        let mut samples = Vec::with_capacity(chunk.len() / 2 + 1);

        if let Some(low) = carry {
            match bytes.split_first() {
                Some((&high, rest)) => {
                    samples.push(i16::from_le_bytes([low, high]));
                    bytes = rest;
                }
                None => {
                    self.carry = Some(low);
                    return Ok(());
                }
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        samples.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
        let remainder = pairs.remainder().first().copied();

        if !samples.is_empty() {
            decoder.accept_waveform(&samples)?;
        }
        self.carry = remainder;
        self.chunks_fed += 1;
        Ok(())
    }

    /// Record any new running or partial text seen by the decoder.
    pub fn inspect(&mut self) -> Result<(), STTError> {
        let decoder = self.open_decoder()?;
        let result = decoder.result();
        let partial = decoder.partial_result();

        let result = result.trim();
        if !result.is_empty() {
            tracing::debug!(text = %result, "Streaming decoder: intermediate result");
            self.intermediates.push(result.to_string());
        }

        let partial = partial.trim();
        if !partial.is_empty() && partial != self.last_partial {
            tracing::debug!(text = %partial, "Streaming decoder: partial result");
            self.last_partial = partial.to_string();
        }
        Ok(())
    }

    /// Split `pcm` into `chunk_bytes`-sized chunks and feed them all,
    /// inspecting periodically.
    pub fn feed_all(&mut self, pcm: &[u8], chunk_bytes: usize) -> Result<(), STTError> {
        let chunk_bytes = chunk_bytes.max(1);
        let total = pcm.len().div_ceil(chunk_bytes);

        for (i, chunk) in pcm.chunks(chunk_bytes).enumerate() {
            self.feed(chunk)?;
            if self.chunks_fed % INSPECT_EVERY == 0 || i + 1 == total {
                self.inspect()?;
            }
        }
        Ok(())
    }

    /// Close the utterance and pick the best available text.
    ///
    /// Short utterances often come back with an empty final result even
    /// though speech was heard, so the choice goes: non-empty final (or its
    /// first alternative), then a non-empty partial, then the recorded
    /// intermediates, then one more final-result call, then empty.
    pub fn finalize(&mut self) -> Result<String, STTError> {
        if self.carry.take().is_some() {
            tracing::debug!("Streaming decoder: dropped trailing odd byte");
        }
        let decoder = self.open_decoder()?;

        let final_text = decoder.final_result().best_text();
        let late_partial = decoder.partial_result().trim().to_string();
        self.state = SessionState::Finalized;

        if !final_text.is_empty() {
            return Ok(final_text);
        }

        let partial = if late_partial.is_empty() {
            self.last_partial.clone()
        } else {
            late_partial
        };
        if partial.chars().count() > final_text.chars().count() {
            tracing::info!("Streaming decoder: using partial result over empty final");
            return Ok(partial);
        }

        if let Some(last) = self.intermediates.last() {
            let mut text = last.clone();
            if self.intermediates.len() > 1 {
                let combined = self.intermediates.join(" ");
                if combined.chars().count() > text.chars().count() {
                    text = combined;
                }
            }
            tracing::info!("Streaming decoder: using intermediate results");
            return Ok(text);
        }

        let retry = self.retry_final();
        if retry.is_empty() {
            tracing::warn!("Streaming decoder: no text after all salvage attempts");
        }
        Ok(retry)
    }

    fn retry_final(&mut self) -> String {
        self.decoder
            .as_mut()
            .map(|d| d.final_result())
            .map(|r: FinalResult| r.best_text())
            .unwrap_or_default()
    }

    /// Free the decoder. Idempotent; later feeds and finalizes fail.
    pub fn release(&mut self) {
        if self.decoder.take().is_some() {
            tracing::trace!("Streaming decoder: session released");
        }
        self.state = SessionState::Released;
    }
}

impl Drop for StreamingDecodeSession {
    fn drop(&mut self) {
        self.release();
    }
}
