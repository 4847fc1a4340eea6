use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use pano_app::{DatasetRequest, Explorer, ExplorerConfig, ResolvedDataset};
use pano_core::SelectionKey;
use pano_data::{ByteSource, DataLocation, IngestConfig, IngestError, MemorySource, ResolveError};
use pano_views::{Emphasis, RecordingChart, RecordingLegend, RecordingMap};
use pretty_assertions::assert_eq;

const HEADER: &str = "origin_lat,origin_lon,origin_timestamp,sample_lat,sample_lon,record_id,capture_date,attribution,status\n";

const DIRECTORY: &str = r#"{
    "entries": [
        {
            "name": "Seattle",
            "region": {"code": "WA", "name": "Washington"},
            "country": {"code": "US", "name": "United States"},
            "data_file": {"filename": "seattle_wa.csv.gz"}
        },
        {
            "name": "Portland",
            "region": {"code": "OR", "name": "Oregon"},
            "country": {"code": "US", "name": "United States"},
            "data_file": {"filename": "portland_or.csv.gz"}
        },
        {
            "name": "Lyon",
            "region": {"code": "ARA", "name": "Auvergne-Rhone-Alpes"},
            "country": {"code": "FR", "name": "France"},
            "data_file": {"filename": "lyon.csv.gz"}
        }
    ]
}"#;

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn write_table(dir: &Path, name: &str, rows: &str, oldest: &str) {
    let table = gzip(&format!("{}{}", HEADER, rows));
    let sidecar = format!(
        r#"{{"data_file": {{"filename": "{}", "size_bytes": {}}}, "google_panos": {{"age_stats": {{"oldest_pano_date": "{}T00:00:00"}}}}}}"#,
        name,
        table.len(),
        oldest
    );
    std::fs::write(dir.join(name), table).unwrap();
    std::fs::write(
        dir.join(name.replace(".csv.gz", ".json.gz")),
        gzip(&sidecar),
    )
    .unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    explorer: Explorer,
    map: Arc<RecordingMap>,
    chart: Arc<RecordingChart>,
    legend: Arc<RecordingLegend>,
}

/// Yields `chunks_left` chunks of the inner source, then drops the connection
struct FailingSource {
    inner: MemorySource,
    chunks_left: usize,
}

#[async_trait]
impl ByteSource for FailingSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        if self.chunks_left == 0 {
            return Err(IngestError::Transport {
                resource: self.inner.resource().to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.chunks_left -= 1;
        self.inner.next_chunk().await
    }

    fn resource(&self) -> &str {
        self.inner.resource()
    }

    fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }
}

fn fixture(ingest: IngestConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cities.json.gz"), gzip(DIRECTORY)).unwrap();

    write_table(
        dir.path(),
        "seattle_wa.csv.gz",
        "47.6,-122.3,t,47.61,-122.31,s1,2015-06-01,© 2015 Google,OK\n\
         47.6,-122.3,t,47.62,-122.32,s2,2015-06-01,© 2015 Google,OK\n\
         47.6,-122.3,t,47.63,-122.33,s3,2019-09-12,© 2019 Google,OK\n\
         47.6,-122.3,t,47.64,-122.34,s4,2021-02-03,Someone Else,OK\n\
         47.6,-122.3,t,,,s5,,,ZERO_RESULTS\n\
         47.6,-122.3,t,47.61,-122.31,s1,2015-06-01,© 2015 Google,OK\n",
        "2015-06-01",
    );
    write_table(
        dir.path(),
        "portland_or.csv.gz",
        "45.5,-122.6,t,45.51,-122.61,p1,2012-01-01,Google,OK\n",
        "2012-01-01",
    );
    write_table(
        dir.path(),
        "dupes.csv.gz",
        "1,1,t,1,1,X,2020-01-01,Source,OK\n\
         1,1,t,1,1,X,2021-05-05,Source,OK\n\
         1,1,t,1,1,Y,2020-01-01,Source,ZERO_RESULTS\n",
        "2020-01-01",
    );

    let config = ExplorerConfig {
        data: DataLocation::Directory {
            root: dir.path().to_path_buf(),
        },
        ingest,
        ..ExplorerConfig::default()
    };
    let map = Arc::new(RecordingMap::new());
    let chart = Arc::new(RecordingChart::new());
    let legend = Arc::new(RecordingLegend::new());
    let explorer = Explorer::new(config, map.clone(), chart.clone(), legend.clone());

    Fixture {
        _dir: dir,
        explorer,
        map,
        chart,
        legend,
    }
}

#[tokio::test]
async fn test_location_query_loads_dataset() {
    let fx = fixture(IngestConfig::default());
    let mut updates = Vec::new();
    let summary = fx
        .explorer
        .open("seattle, wa", &mut |p| updates.push(p))
        .await
        .unwrap();

    assert_eq!(summary.dataset.table, "seattle_wa.csv.gz");
    assert_eq!(summary.dataset.score, Some(0));
    assert_eq!(summary.stats.accepted, 3);
    assert_eq!(summary.stats.duplicates, 1);
    assert_eq!(summary.stats.skipped.total(), 2);
    assert_eq!(summary.years, vec![(2015, 2), (2019, 1)]);
    assert_eq!(summary.top_dates[0], ("2015-06-01".to_string(), 2));

    assert_eq!(fx.map.marker_count(), 3);
    assert_eq!(fx.chart.points().len(), 2);
    assert_eq!(fx.legend.rows().len(), 2);
    assert_eq!(updates.last(), Some(&100));
    assert!(updates.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_duplicate_identifier_scenario() {
    let fx = fixture(IngestConfig::default().with_attribution("Source"));
    let summary = fx.explorer.open("dupes.csv.gz", &mut |_| {}).await.unwrap();

    assert_eq!(summary.stats.accepted, 1);
    assert_eq!(summary.stats.skipped.status, 1);
    let temporal = fx
        .explorer
        .with_index(|index| index.temporal().keyed())
        .unwrap();
    assert_eq!(temporal, vec![("2020-01-01".to_string(), 1)]);
}

#[tokio::test]
async fn test_four_part_query_is_parse_error() {
    let fx = fixture(IngestConfig::default());
    let err = fx
        .explorer
        .open("Seattle, King County, WA, US", &mut |_| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::QueryParse { .. })
    ));
    assert_eq!(fx.map.marker_count(), 0);
}

#[tokio::test]
async fn test_unknown_location_lists_suggestions() {
    let fx = fixture(IngestConfig::default());
    let err = fx.explorer.open("Springfield, IL", &mut |_| {}).await.unwrap_err();

    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::NoMatch { suggestions, .. }) => {
            assert_eq!(suggestions.len(), 3);
            assert!(suggestions.windows(2).all(|w| w[0].score <= w[1].score));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("did you mean"));
}

#[tokio::test]
async fn test_missing_table_is_load_error() {
    let fx = fixture(IngestConfig::default());
    let err = fx.explorer.open("nowhere.csv.gz", &mut |_| {}).await.unwrap_err();

    match err.downcast_ref::<IngestError>() {
        Some(e) => assert!(e.is_load_error()),
        None => panic!("unexpected {:?}", err),
    }
    assert!(fx.explorer.with_index(|index| index.len()).is_none());
}

#[tokio::test]
async fn test_selection_syncs_views_and_resets_on_new_load() {
    let fx = fixture(IngestConfig::default());
    fx.explorer.open("Seattle", &mut |_| {}).await.unwrap();
    let views = fx.explorer.views();

    views.legend.row_clicked(2019);
    assert_eq!(fx.map.count_with(Emphasis::Active), 1);
    assert_eq!(fx.map.count_with(Emphasis::Dimmed), 2);
    assert_eq!(fx.chart.emphases(), vec![Emphasis::Dimmed, Emphasis::Active]);

    views.chart.point_clicked(Some(0));
    assert_eq!(fx.map.count_with(Emphasis::Active), 2);
    let legend: Vec<Emphasis> = fx.legend.rows().iter().map(|r| r.emphasis).collect();
    assert_eq!(legend, vec![Emphasis::Dimmed, Emphasis::Dimmed]);

    let ticket_before = fx.explorer.session().current_generation();
    fx.explorer
        .load(
            fx.explorer
                .resolve(&DatasetRequest::Table("portland_or.csv.gz".to_string()))
                .await
                .unwrap(),
            &mut |_| {},
        )
        .await
        .unwrap();

    assert_eq!(fx.explorer.session().current_generation(), ticket_before + 1);
    assert_eq!(fx.explorer.session().selection().current(), SelectionKey::None);
    assert_eq!(fx.map.marker_count(), 1);
    assert_eq!(fx.map.count_with(Emphasis::Normal), 1);
    assert!(fx.map.clear_count() >= 2);
}

#[tokio::test]
async fn test_failed_open_keeps_previous_dataset() {
    let fx = fixture(IngestConfig::default());
    fx.explorer.open("Portland", &mut |_| {}).await.unwrap();
    let generation = fx.explorer.session().current_generation();

    assert!(fx.explorer.open("gone.csv.gz", &mut |_| {}).await.is_err());

    assert_eq!(fx.explorer.session().current_generation(), generation);
    assert_eq!(fx.map.marker_count(), 1);
    assert_eq!(fx.explorer.with_index(|index| index.len()), Some(1));
}

#[tokio::test]
async fn test_transport_failure_midway_clears_views() {
    let fx = fixture(IngestConfig::default());
    fx.explorer.open("Seattle", &mut |_| {}).await.unwrap();
    let seattle_markers = fx.map.added_count();

    let rows: String = (0..400)
        .map(|i| {
            format!(
                "47.{i:03},-122.{i:03},t,47.{i:03}1,-122.{i:03}1,r{i},{}-0{}-1{},Google,OK\n",
                2010 + i % 10,
                1 + i % 9,
                i % 10
            )
        })
        .collect();
    let table = gzip(&format!("{}{}", HEADER, rows));
    let chunk_size = 64;
    let chunks = table.len().div_ceil(chunk_size);
    let source = FailingSource {
        inner: MemorySource::split("big.csv.gz", &table, chunk_size),
        chunks_left: chunks * 3 / 4,
    };
    let dataset = ResolvedDataset {
        table: "big.csv.gz".to_string(),
        entry: None,
        score: None,
    };

    let err = fx
        .explorer
        .load_source(dataset, None, source, &mut |_| {})
        .await
        .unwrap_err();

    match err.downcast_ref::<IngestError>() {
        Some(e) => assert!(e.is_load_error()),
        None => panic!("unexpected {:?}", err),
    }
    assert!(fx.map.added_count() > seattle_markers);
    assert_eq!(fx.map.marker_count(), 0);
    assert!(fx.chart.points().is_empty());
    assert!(fx.legend.rows().is_empty());
    assert!(fx.explorer.with_index(|index| index.len()).is_none());
}
