use ahash::AHashSet;
use csv::{ReaderBuilder, Trim};
use pano_core::MarkerHandle;
use serde::Serialize;

use crate::config::IngestConfig;
use crate::index::AggregateIndex;
use crate::schema::{RawRecord, SkipReason, ValidRecord};

/// Creates the visual marker for an accepted record
///
/// This is the seam between ingestion and the map view.
pub trait MarkerSink: Send + Sync {
    fn create_marker(&self, record: &ValidRecord) -> MarkerHandle;
}

/// Rows skipped, by reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub malformed: u64,
    pub status: u64,
    pub attribution: u64,
    pub capture_date: u64,
    pub coordinates: u64,
    pub missing_id: u64,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        *self.slot(reason) += 1;
    }

    pub fn get(&self, reason: SkipReason) -> u64 {
        match reason {
            SkipReason::Malformed => self.malformed,
            SkipReason::Status => self.status,
            SkipReason::Attribution => self.attribution,
            SkipReason::CaptureDate => self.capture_date,
            SkipReason::Coordinates => self.coordinates,
            SkipReason::MissingId => self.missing_id,
        }
    }

    pub fn total(&self) -> u64 {
        self.malformed
            + self.status
            + self.attribution
            + self.capture_date
            + self.coordinates
            + self.missing_id
    }

    fn slot(&mut self, reason: SkipReason) -> &mut u64 {
        match reason {
            SkipReason::Malformed => &mut self.malformed,
            SkipReason::Status => &mut self.status,
            SkipReason::Attribution => &mut self.attribution,
            SkipReason::CaptureDate => &mut self.capture_date,
            SkipReason::Coordinates => &mut self.coordinates,
            SkipReason::MissingId => &mut self.missing_id,
        }
    }
}

/// Counters for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Data rows read, header excluded
    pub rows: u64,
    pub accepted: u64,
    /// Valid rows dropped because their identifier was already accepted
    pub duplicates: u64,
    pub skipped: SkipCounts,
    pub batches: u64,
    pub compressed_bytes: u64,
    pub decompressed_bytes: u64,
}

/// Result of feeding one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub rows: u64,
    pub accepted: u64,
}

/// Filters, deduplicates and indexes parsed rows
///
/// The identifier set persists across batches for the whole load, so the
/// first valid occurrence of an identifier in file order is the one kept.
pub struct RecordAggregator {
    config: IngestConfig,
    seen: AHashSet<String>,
    index: AggregateIndex,
    stats: IngestStats,
}

impl RecordAggregator {
    /// Create an empty aggregator
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            seen: AHashSet::new(),
            index: AggregateIndex::new(),
            stats: IngestStats::default(),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Parse a header-prefixed batch and aggregate every row in it
    pub fn ingest_batch(&mut self, batch: &str, sink: &dyn MarkerSink) -> BatchOutcome {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(batch.as_bytes());

        let mut outcome = BatchOutcome::default();
        for row in reader.deserialize::<RawRecord>() {
            outcome.rows += 1;
            match row {
                Ok(raw) => {
                    if self.accept(raw, sink).is_some() {
                        outcome.accepted += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!("Skipping malformed row: {}", e);
                    self.stats.rows += 1;
                    self.stats.skipped.record(SkipReason::Malformed);
                }
            }
        }
        self.stats.batches += 1;
        outcome
    }

    /// Filter one row; returns the new marker if the row was accepted
    pub fn accept(&mut self, raw: RawRecord, sink: &dyn MarkerSink) -> Option<MarkerHandle> {
        self.stats.rows += 1;

        let record = match raw.validate(&self.config) {
            Ok(record) => record,
            Err(reason) => {
                self.stats.skipped.record(reason);
                return None;
            }
        };

        if self.seen.contains(&record.record_id) {
            self.stats.duplicates += 1;
            return None;
        }
        self.seen.insert(record.record_id.clone());

        let marker = sink.create_marker(&record);
        self.index.insert(record, marker);
        self.stats.accepted += 1;
        Some(marker)
    }

    pub fn index(&self) -> &AggregateIndex {
        &self.index
    }

    /// Hand over the accepted records without copying them
    pub fn into_index(self) -> AggregateIndex {
        self.index
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub(crate) fn record_bytes(&mut self, compressed: u64, decompressed: u64) {
        self.stats.compressed_bytes = compressed;
        self.stats.decompressed_bytes = decompressed;
    }

    /// Forget everything; called when a new load begins
    pub fn reset(&mut self) {
        self.seen.clear();
        self.index.clear();
        self.stats = IngestStats::default();
    }
}
