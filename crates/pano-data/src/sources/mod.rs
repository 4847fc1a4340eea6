//! Byte sources feeding the ingestion pipeline

pub mod fetcher;
pub mod file_source;
pub mod http_source;
pub mod memory_source;

pub use fetcher::{DataLocation, ResourceFetcher};
pub use file_source::FileSource;
pub use http_source::HttpSource;
pub use memory_source::MemorySource;

use async_trait::async_trait;
use bytes::Bytes;

use crate::IngestError;

/// Lazy, pull-based sequence of raw byte chunks
///
/// Chunk sizes are whatever the provider hands out. `Ok(None)` marks the end
/// of the sequence; awaiting `next_chunk` is the only suspension point of a
/// load.
#[async_trait]
pub trait ByteSource: Send {
    /// Pull the next chunk
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError>;

    /// Name of the resource, used in errors and logs
    fn resource(&self) -> &str;

    /// Advertised total size, if the provider knows it
    fn content_length(&self) -> Option<u64> {
        None
    }
}

#[async_trait]
impl ByteSource for Box<dyn ByteSource> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        (**self).next_chunk().await
    }

    fn resource(&self) -> &str {
        (**self).resource()
    }

    fn content_length(&self) -> Option<u64> {
        (**self).content_length()
    }
}

/// Drain a source into one buffer; only for small resources such as metadata
pub async fn read_to_end<S: ByteSource + ?Sized>(source: &mut S) -> Result<Vec<u8>, IngestError> {
    let mut data = Vec::new();
    while let Some(chunk) = source.next_chunk().await? {
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}
