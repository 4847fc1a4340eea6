//! Opening named resources from the configured data location

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{read_to_end, ByteSource, FileSource, HttpSource};
use crate::IngestError;

/// Where dataset tables and metadata live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataLocation {
    /// Resources are served below an HTTP base URL
    Http { base_url: String },
    /// Resources are files in a local directory
    Directory { root: PathBuf },
}

impl DataLocation {
    /// Full URL or path of a named resource
    pub fn locate(&self, name: &str) -> String {
        match self {
            DataLocation::Http { base_url } => {
                format!("{}/{}", base_url.trim_end_matches('/'), name.trim_start_matches('/'))
            }
            DataLocation::Directory { root } => root.join(name).display().to_string(),
        }
    }
}

/// Opens byte sources for named resources relative to one location
pub struct ResourceFetcher {
    location: DataLocation,
    client: reqwest::Client,
    chunk_size: usize,
}

impl ResourceFetcher {
    /// Create a fetcher; `chunk_size` applies to local reads only
    pub fn new(location: DataLocation, chunk_size: usize) -> Self {
        Self {
            location,
            client: reqwest::Client::new(),
            chunk_size,
        }
    }

    pub fn location(&self) -> &DataLocation {
        &self.location
    }

    /// Open a resource as a lazy chunk sequence
    pub async fn open(&self, name: &str) -> Result<Box<dyn ByteSource>, IngestError> {
        tracing::debug!("Opening {}", self.location.locate(name));
        match &self.location {
            DataLocation::Http { .. } => {
                let source = HttpSource::open(&self.client, self.location.locate(name)).await?;
                Ok(Box::new(source))
            }
            DataLocation::Directory { root } => {
                let source = FileSource::open(root.join(name), self.chunk_size).await?;
                Ok(Box::new(source))
            }
        }
    }

    /// Read a whole (small) resource into memory
    pub async fn read_all(&self, name: &str) -> Result<Vec<u8>, IngestError> {
        let mut source = self.open(name).await?;
        read_to_end(&mut source).await
    }
}
