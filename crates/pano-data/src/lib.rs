//! Data handling for the panorama coverage explorer
//!
//! Streaming ingestion of gzip-compressed capture tables, dataset metadata
//! (directory and per-dataset sidecars) and fuzzy location resolution.

pub mod config;
pub mod directory;
pub mod index;
pub mod ingest;
pub mod resolver;
pub mod schema;
pub mod sources;

use thiserror::Error;

// Re-exports
pub use config::{IngestConfig, NullConfig};
pub use directory::{DatasetDirectory, DatasetDirectoryEntry, DatasetSidecar};
pub use index::{AggregateIndex, TemporalAggregate, YearBucket};
pub use ingest::{
    ChunkDecoder, IngestPipeline, IngestStats, LineReassembler, MarkerSink, RecordAggregator,
};
pub use resolver::{find_best_match, LocationQuery, LocationResolver, MatchResult, Suggestion};
pub use schema::{RawRecord, SkipReason, ValidRecord};
pub use sources::{ByteSource, DataLocation, FileSource, HttpSource, MemorySource, ResourceFetcher};

/// Errors that end a dataset load
///
/// A `Decode` failure leaves every row aggregated before the failure in place;
/// callers that keep the aggregator can still show that partial result.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to load {resource}: HTTP status {status}")]
    Load { resource: String, status: u16 },

    #[error("transport error while reading {resource}: {message}")]
    Transport { resource: String, message: String },

    #[error("failed to decompress {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid records found in {resource}")]
    NoData { resource: String },

    #[error("load of {resource} was superseded by a newer load")]
    Superseded { resource: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Network or HTTP level failure (the resource could not be fetched)
    pub fn is_load_error(&self) -> bool {
        matches!(self, IngestError::Load { .. } | IngestError::Transport { .. })
    }
}

/// Errors reading directory or sidecar metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Fetch(#[from] IngestError),

    #[error("failed to decompress {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {resource}: {source}")]
    Json {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Location resolution failures; non-fatal, shown to the user
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("cannot parse location query '{query}': {reason}")]
    QueryParse { query: String, reason: String },

    #[error("no dataset matches '{query}'{}", resolver::format_suggestions(.suggestions))]
    NoMatch {
        query: String,
        best_score: Option<u32>,
        suggestions: Vec<Suggestion>,
    },
}
