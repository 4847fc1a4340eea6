//! Streaming ingestion: bytes → text fragments → row batches → aggregated records

pub mod aggregator;
pub mod decoder;
pub mod progress;
pub mod reassembler;

pub use aggregator::{BatchOutcome, IngestStats, MarkerSink, RecordAggregator, SkipCounts};
pub use decoder::ChunkDecoder;
pub use progress::ProgressTracker;
pub use reassembler::{Batches, LineReassembler};

use pano_core::LoadTicket;

use crate::sources::ByteSource;
use crate::IngestError;

/// One dataset load from compressed bytes to aggregated records
///
/// Rows are applied strictly in file order. When a ticket is attached, it is
/// checked before every batch is applied and the load stops with
/// [`IngestError::Superseded`] once a newer load has begun.
///
/// On [`IngestError::Decode`] the rows applied before the failure stay in the
/// aggregator.
pub struct IngestPipeline<S> {
    decoder: ChunkDecoder<S>,
    reassembler: LineReassembler,
    ticket: Option<LoadTicket>,
}

impl<S: ByteSource> IngestPipeline<S> {
    /// Create a pipeline over `source`; progress is measured against
    /// `total_compressed` bytes
    pub fn new(source: S, total_compressed: u64) -> Self {
        Self {
            decoder: ChunkDecoder::new(source, total_compressed),
            reassembler: LineReassembler::new(),
            ticket: None,
        }
    }

    /// Tie this load to a session generation
    pub fn with_ticket(mut self, ticket: LoadTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Drive the load to completion
    ///
    /// `progress` receives non-decreasing percentages; 100 is reported only
    /// after the byte source is exhausted.
    pub async fn run(
        mut self,
        aggregator: &mut RecordAggregator,
        sink: &dyn MarkerSink,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<IngestStats, IngestError> {
        let resource = self.decoder.resource().to_string();
        tracing::info!(
            "Loading {} ({} compressed bytes expected)",
            resource,
            self.decoder.progress().total()
        );

        loop {
            let fragment = match self.decoder.next_fragment(progress).await {
                Ok(Some(fragment)) => fragment,
                Ok(None) => break,
                Err(e) => {
                    self.record_bytes(aggregator);
                    if let IngestError::Decode { .. } = e {
                        tracing::warn!(
                            "Decompression of {} failed after {} accepted records: {}",
                            resource,
                            aggregator.stats().accepted,
                            e
                        );
                    }
                    return Err(e);
                }
            };

            if let Some(batch) = self.reassembler.push(&fragment) {
                self.apply(&batch, aggregator, sink)?;
            }
        }

        if let Some(batch) = self.reassembler.finish() {
            self.apply(&batch, aggregator, sink)?;
        }
        self.ensure_current()?;
        self.record_bytes(aggregator);
        progress(self.decoder.finish_progress());

        let stats = aggregator.stats().clone();
        tracing::info!(
            "Loaded {}: {} accepted, {} duplicates, {} skipped in {} batches",
            resource,
            stats.accepted,
            stats.duplicates,
            stats.skipped.total(),
            stats.batches
        );

        if aggregator.index().is_empty() {
            return Err(IngestError::NoData { resource });
        }
        Ok(stats)
    }

    fn apply(
        &self,
        batch: &str,
        aggregator: &mut RecordAggregator,
        sink: &dyn MarkerSink,
    ) -> Result<(), IngestError> {
        self.ensure_current()?;
        let outcome = aggregator.ingest_batch(batch, sink);
        tracing::debug!(
            "Batch from {}: {} rows, {} accepted",
            self.decoder.resource(),
            outcome.rows,
            outcome.accepted
        );
        Ok(())
    }

    fn ensure_current(&self) -> Result<(), IngestError> {
        match &self.ticket {
            Some(ticket) if !ticket.is_current() => {
                tracing::info!("Discarding stale load of {}", ticket.resource());
                Err(IngestError::Superseded {
                    resource: ticket.resource().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn record_bytes(&self, aggregator: &mut RecordAggregator) {
        aggregator.record_bytes(
            self.decoder.compressed_bytes(),
            self.decoder.decompressed_bytes(),
        );
    }
}
