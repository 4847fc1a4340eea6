//! Headless entry point: resolve and load one dataset, then log a summary

use std::sync::Arc;

use anyhow::{bail, Result};
use pano_app::{Explorer, ExplorerConfig};
use pano_views::{RecordingChart, RecordingLegend, RecordingMap};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("usage: pano-explorer <table.csv.gz | city[, region[, country]]>");
    }

    let config = ExplorerConfig::load()?;
    info!("Reading data from {:?}", config.data);

    let map = Arc::new(RecordingMap::new());
    let explorer = Explorer::new(
        config,
        map.clone(),
        Arc::new(RecordingChart::new()),
        Arc::new(RecordingLegend::new()),
    );

    let mut last_logged = 0u8;
    let summary = explorer
        .open(&query, &mut |percent| {
            if percent == 100 || percent >= last_logged.saturating_add(10) {
                info!("Progress: {}%", percent);
                last_logged = percent;
            }
        })
        .await?;

    info!(
        "{}: {} records ({} duplicates, {} skipped), {} markers",
        summary.dataset.table,
        summary.stats.accepted,
        summary.stats.duplicates,
        summary.stats.skipped.total(),
        map.marker_count()
    );
    for (year, count) in &summary.years {
        info!("  {}: {}", year, count);
    }
    for (date, count) in &summary.top_dates {
        info!("  busiest {}: {}", date, count);
    }
    Ok(())
}
