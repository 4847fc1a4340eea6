use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::ByteSource;
use crate::IngestError;

/// Source reading a local file in fixed-size chunks
pub struct FileSource {
    path: PathBuf,
    label: String,
    file: File,
    chunk_size: usize,
    length: Option<u64>,
}

impl FileSource {
    /// Open a file; a missing file is reported like an HTTP 404
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let label = path.display().to_string();

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(IngestError::Load {
                    resource: label,
                    status: 404,
                });
            }
            Err(e) => return Err(IngestError::Io(e)),
        };
        let length = file.metadata().await.ok().map(|m| m.len());

        Ok(Self {
            path,
            label,
            file,
            chunk_size: chunk_size.max(1),
            length,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        let mut buffer = vec![0u8; self.chunk_size];
        let read = self.file.read(&mut buffer).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok(Some(Bytes::from(buffer)))
    }

    fn resource(&self) -> &str {
        &self.label
    }

    fn content_length(&self) -> Option<u64> {
        self.length
    }
}
