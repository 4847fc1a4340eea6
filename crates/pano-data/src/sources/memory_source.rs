use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;

use super::ByteSource;
use crate::IngestError;

/// Source over chunks already held in memory
pub struct MemorySource {
    resource: String,
    chunks: VecDeque<Bytes>,
    total: u64,
}

impl MemorySource {
    /// Create a source that yields `chunks` in order
    pub fn new<I, B>(resource: impl Into<String>, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: VecDeque<Bytes> = chunks.into_iter().map(Into::into).collect();
        let total = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            resource: resource.into(),
            chunks,
            total,
        }
    }

    /// Split one buffer into chunks of at most `chunk_size` bytes
    pub fn split(resource: impl Into<String>, data: &[u8], chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self::new(
            resource,
            data.chunks(chunk_size)
                .map(Bytes::copy_from_slice)
                .collect::<Vec<_>>(),
        )
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        Ok(self.chunks.pop_front())
    }

    fn resource(&self) -> &str {
        &self.resource
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.total)
    }
}
