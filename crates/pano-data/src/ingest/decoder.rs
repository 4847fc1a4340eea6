//! Incremental gzip decoding of a byte source into text fragments

use std::io::Write;

use flate2::write::GzDecoder;

use super::progress::ProgressTracker;
use crate::sources::ByteSource;
use crate::IngestError;

/// Wraps a [`ByteSource`], counts compressed bytes for progress, and yields
/// decoded UTF-8 text fragments of arbitrary length and alignment
///
/// Multi-byte characters split across chunks are carried over to the next
/// fragment, so every fragment is valid UTF-8.
pub struct ChunkDecoder<S> {
    source: S,
    decoder: GzDecoder<Vec<u8>>,
    progress: ProgressTracker,
    carry: Vec<u8>,
    decompressed: u64,
    finished: bool,
}

impl<S: ByteSource> ChunkDecoder<S> {
    /// Decode `source`, measuring progress against `total_compressed` bytes
    pub fn new(source: S, total_compressed: u64) -> Self {
        Self {
            source,
            decoder: GzDecoder::new(Vec::new()),
            progress: ProgressTracker::new(total_compressed),
            carry: Vec::new(),
            decompressed: 0,
            finished: false,
        }
    }

    pub fn resource(&self) -> &str {
        self.source.resource()
    }

    /// Compressed bytes pulled from the source so far
    pub fn compressed_bytes(&self) -> u64 {
        self.progress.received()
    }

    /// Decompressed bytes produced so far
    pub fn decompressed_bytes(&self) -> u64 {
        self.decompressed
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Report completion once the stream has been fully consumed
    pub fn finish_progress(&mut self) -> u8 {
        self.progress.finish()
    }

    /// Pull chunks until some text is decoded or the source is exhausted
    ///
    /// `on_progress` is called once per compressed chunk. Returns `Ok(None)`
    /// after the end of the stream; a fragment may be empty only when a
    /// chunk produced no complete character.
    pub async fn next_fragment(
        &mut self,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<Option<String>, IngestError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            match self.source.next_chunk().await? {
                Some(chunk) => {
                    on_progress(self.progress.advance(chunk.len() as u64));
                    self.decoder
                        .write_all(&chunk)
                        .map_err(|e| self.decode_error(e))?;
                    if let Some(text) = self.drain()? {
                        return Ok(Some(text));
                    }
                }
                None => {
                    self.finished = true;
                    self.decoder.try_finish().map_err(|e| self.decode_error(e))?;
                    let text = self.drain()?;
                    if !self.carry.is_empty() {
                        let err = std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "stream ends inside a multi-byte character",
                        );
                        return Err(self.decode_error(err));
                    }
                    return Ok(text);
                }
            }
        }
    }

    /// Move decoded bytes out of the decoder, keeping any incomplete
    /// trailing character for later
    fn drain(&mut self) -> Result<Option<String>, IngestError> {
        let output = self.decoder.get_mut();
        if output.is_empty() {
            return Ok(None);
        }
        self.decompressed += output.len() as u64;

        let mut bytes = std::mem::take(&mut self.carry);
        bytes.append(output);

        let keep = incomplete_suffix_len(&bytes);
        self.carry = bytes.split_off(bytes.len() - keep);
        if bytes.is_empty() {
            return Ok(None);
        }

        String::from_utf8(bytes).map(Some).map_err(|e| {
            self.decode_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn decode_error(&self, source: std::io::Error) -> IngestError {
        IngestError::Decode {
            resource: self.source.resource().to_string(),
            source,
        }
    }
}

/// Length of an unfinished UTF-8 sequence at the end of `bytes`
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}
