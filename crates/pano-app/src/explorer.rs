//! One explorer session: resolve a request, load the dataset, drive the views

use std::sync::Arc;

use anyhow::{Context, Result};
use pano_core::Session;
use pano_data::{
    AggregateIndex, ByteSource, DatasetDirectory, DatasetDirectoryEntry, DatasetSidecar,
    IngestError, IngestPipeline, IngestStats, LocationResolver, RecordAggregator,
    ResourceFetcher, TemporalAggregate,
};
use pano_views::{AgeColorScale, ChartSurface, LegendSurface, MapSurface, ViewSet};
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::config::ExplorerConfig;

/// Suffix identifying a direct table filename
pub const TABLE_SUFFIX: &str = ".csv.gz";

/// Number of busiest capture dates listed in a summary
pub const TOP_DATES: usize = 5;

/// What the user asked to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetRequest {
    /// A table filename, used as is
    Table(String),
    /// A free-text location, resolved against the directory
    Location(String),
}

impl DatasetRequest {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.ends_with(TABLE_SUFFIX) && !input.contains(',') {
            DatasetRequest::Table(input.to_string())
        } else {
            DatasetRequest::Location(input.to_string())
        }
    }
}

/// The table a request resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset {
    pub table: String,
    pub entry: Option<DatasetDirectoryEntry>,
    pub score: Option<u32>,
}

/// Outcome of a completed load
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub dataset: ResolvedDataset,
    pub stats: IngestStats,
    /// `(year, records)` ascending
    pub years: Vec<(i32, usize)>,
    /// Busiest capture dates, most records first
    pub top_dates: Vec<(String, u64)>,
}

/// Wires the fetcher, the session and the views together
pub struct Explorer {
    config: ExplorerConfig,
    fetcher: ResourceFetcher,
    session: Session,
    views: ViewSet,
    directory: OnceCell<DatasetDirectory>,
    index: Mutex<Option<AggregateIndex>>,
}

impl Explorer {
    /// Create an explorer drawing on the given surfaces
    pub fn new(
        config: ExplorerConfig,
        map: Arc<dyn MapSurface>,
        chart: Arc<dyn ChartSurface>,
        legend: Arc<dyn LegendSurface>,
    ) -> Self {
        let session = Session::new();
        let views = ViewSet::attach(&session, map, chart, legend);
        let fetcher = ResourceFetcher::new(config.data.clone(), config.ingest.read_chunk_size);
        Self {
            config,
            fetcher,
            session,
            views,
            directory: OnceCell::new(),
            index: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn views(&self) -> &ViewSet {
        &self.views
    }

    /// The dataset directory, fetched on first use
    pub async fn directory(&self) -> Result<&DatasetDirectory> {
        self.directory
            .get_or_try_init(|| DatasetDirectory::load(&self.fetcher, &self.config.directory_name))
            .await
            .context("loading dataset directory")
    }

    /// Turn a request into a table filename
    pub async fn resolve(&self, request: &DatasetRequest) -> Result<ResolvedDataset> {
        match request {
            DatasetRequest::Table(table) => Ok(ResolvedDataset {
                table: table.clone(),
                entry: None,
                score: None,
            }),
            DatasetRequest::Location(query) => {
                let directory = self.directory().await?;
                let found = LocationResolver::new(directory)
                    .with_threshold(self.config.match_threshold)
                    .resolve(query)?;
                tracing::info!(
                    "Resolved '{}' to {} (score {})",
                    query,
                    found.entry.filename(),
                    found.score
                );
                Ok(ResolvedDataset {
                    table: found.entry.filename().to_string(),
                    entry: Some(found.entry.clone()),
                    score: Some(found.score),
                })
            }
        }
    }

    /// Resolve and load whatever `input` names
    pub async fn open(
        &self,
        input: &str,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<LoadSummary> {
        let dataset = self.resolve(&DatasetRequest::parse(input)).await?;
        self.load(dataset, progress).await
    }

    /// Load a resolved dataset into the views
    ///
    /// A table that cannot be opened leaves the current views untouched.
    /// Otherwise see [`Explorer::load_source`].
    pub async fn load(
        &self,
        dataset: ResolvedDataset,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<LoadSummary> {
        let sidecar = match DatasetSidecar::load(&self.fetcher, &dataset.table).await {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                tracing::warn!("No usable sidecar for {}: {}", dataset.table, e);
                None
            }
        };

        let source = self.fetcher.open(&dataset.table).await?;
        self.load_source(dataset, sidecar.as_ref(), source, progress).await
    }

    /// Ingest an already opened table into the views
    ///
    /// The selection and every marker are cleared first. What stays on screen
    /// when the load fails depends on the failure:
    /// - decompression error: the rows read so far are published to every
    ///   view and the error is still returned;
    /// - transport or I/O error midway: every view is cleared again, so no
    ///   partial markers remain;
    /// - superseded by a newer load: nothing is touched, the newer load owns
    ///   the views.
    pub async fn load_source<S: ByteSource>(
        &self,
        dataset: ResolvedDataset,
        sidecar: Option<&DatasetSidecar>,
        source: S,
        progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<LoadSummary> {
        let table = dataset.table.clone();
        let ticket = self.session.begin_load(table.as_str());
        let today = chrono::Local::now().date_naive();
        let colors = AgeColorScale::from_oldest(
            today,
            sidecar.and_then(DatasetSidecar::oldest_capture_date),
        );
        self.views.reset(colors);
        *self.index.lock() = None;

        let total = sidecar
            .map(DatasetSidecar::compressed_size)
            .filter(|&size| size > 0)
            .or_else(|| source.content_length())
            .unwrap_or(0);

        let mut aggregator = RecordAggregator::new(self.config.ingest.clone());
        let result = IngestPipeline::new(source, total)
            .with_ticket(ticket.clone())
            .run(&mut aggregator, self.views.map.as_ref(), progress)
            .await;

        match result {
            Ok(stats) => {
                let index = aggregator.into_index();
                let summary = self.summarize(dataset, stats, &index);
                self.publish(index);
                Ok(summary)
            }
            Err(e @ IngestError::Decode { .. }) => {
                if ticket.is_current() {
                    self.publish(aggregator.into_index());
                }
                Err(e).with_context(|| format!("{} is partially loaded", table))
            }
            Err(e @ (IngestError::Superseded { .. } | IngestError::NoData { .. })) => Err(e.into()),
            Err(e) => {
                if ticket.is_current() {
                    tracing::warn!("Discarding partial load of {}: {}", table, e);
                    self.views.reset(colors);
                }
                Err(e.into())
            }
        }
    }

    /// Run `f` against the index of the last load, if any
    pub fn with_index<R>(&self, f: impl FnOnce(&AggregateIndex) -> R) -> Option<R> {
        self.index.lock().as_ref().map(f)
    }

    fn publish(&self, index: AggregateIndex) {
        self.views.refresh(&index);
        *self.index.lock() = Some(index);
    }

    fn summarize(
        &self,
        dataset: ResolvedDataset,
        stats: IngestStats,
        index: &AggregateIndex,
    ) -> LoadSummary {
        LoadSummary {
            dataset,
            stats,
            years: index.year_counts(),
            top_dates: busiest_dates(index.temporal(), TOP_DATES),
        }
    }
}

/// The `limit` dates with the most records, most first; ties go to the
/// earlier date
pub fn busiest_dates(temporal: &TemporalAggregate, limit: usize) -> Vec<(String, u64)> {
    let mut dates = temporal.keyed();
    dates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    dates.truncate(limit);
    dates
}
