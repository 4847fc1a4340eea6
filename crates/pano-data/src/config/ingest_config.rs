//! Record filter and reader settings

use serde::{Deserialize, Serialize};

use super::null_handling::NullConfig;

/// Status value the collection tooling writes for a successful lookup
pub const SUCCESS_STATUS: &str = "OK";

/// Attribution substring a record needs to count as first-party imagery
pub const REQUIRED_ATTRIBUTION: &str = "Google";

/// Default read size for local table files
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows whose status differs are rejected
    pub success_status: String,

    /// Rows whose attribution does not contain this are rejected
    pub required_attribution: String,

    /// Null handling for every field
    pub null_config: NullConfig,

    /// Chunk size used when reading local files
    pub read_chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            success_status: SUCCESS_STATUS.to_string(),
            required_attribution: REQUIRED_ATTRIBUTION.to_string(),
            null_config: NullConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl IngestConfig {
    /// Config with a different required attribution
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.required_attribution = attribution.into();
        self
    }
}
