//! Dataset metadata: the directory of known datasets and per-table sidecars
//!
//! Both are gzip-compressed JSON fetched through the same [`ResourceFetcher`]
//! as the tables themselves.

use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::schema::parse_capture_date;
use crate::sources::ResourceFetcher;
use crate::MetadataError;

/// A region or country, known by a code, a name, or both
///
/// Accepts either a bare string (taken as the name) or a `{code, name}` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedCodeRepr")]
pub struct NamedCode {
    pub code: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedCodeRepr {
    Name(String),
    Full {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<NamedCodeRepr> for NamedCode {
    fn from(repr: NamedCodeRepr) -> Self {
        match repr {
            NamedCodeRepr::Name(name) => NamedCode {
                code: None,
                name: Some(name),
            },
            NamedCodeRepr::Full { code, name } => NamedCode { code, name },
        }
    }
}

impl NamedCode {
    pub fn new(code: Option<&str>, name: Option<&str>) -> Self {
        Self {
            code: code.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    /// Non-empty identifiers, code first
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.code
            .as_deref()
            .into_iter()
            .chain(self.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Preferred display form
    pub fn label(&self) -> &str {
        self.code
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Table file referenced by a directory entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFileRef {
    pub filename: String,
    #[serde(default, alias = "size_bytes")]
    pub compressed_size_bytes: Option<u64>,
}

/// Static metadata of one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetDirectoryEntry {
    #[serde(alias = "city")]
    pub name: String,
    #[serde(default, alias = "state")]
    pub region: Option<NamedCode>,
    #[serde(default)]
    pub country: Option<NamedCode>,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    pub data_file: TableFileRef,
    /// Records per capture year
    #[serde(default)]
    pub histogram: BTreeMap<String, u64>,
}

impl DatasetDirectoryEntry {
    pub fn new(name: &str, region: Option<NamedCode>, country: Option<NamedCode>, filename: &str) -> Self {
        Self {
            name: name.to_string(),
            region,
            country,
            bounds: None,
            data_file: TableFileRef {
                filename: filename.to_string(),
                compressed_size_bytes: None,
            },
            histogram: BTreeMap::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.data_file.filename
    }

    pub fn region_identifiers(&self) -> impl Iterator<Item = &str> {
        self.region.iter().flat_map(NamedCode::identifiers)
    }

    pub fn country_identifiers(&self) -> impl Iterator<Item = &str> {
        self.country.iter().flat_map(NamedCode::identifiers)
    }
}

/// Every known dataset, in directory order; read-only once loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetDirectory {
    #[serde(alias = "cities")]
    entries: Vec<DatasetDirectoryEntry>,
}

impl DatasetDirectory {
    pub fn new(entries: Vec<DatasetDirectoryEntry>) -> Self {
        Self { entries }
    }

    /// Fetch and decode the directory resource
    pub async fn load(fetcher: &ResourceFetcher, name: &str) -> Result<Self, MetadataError> {
        let bytes = fetcher.read_all(name).await?;
        let directory: Self = read_gzip_json(name, &bytes)?;
        tracing::info!("Loaded directory {} with {} datasets", name, directory.len());
        Ok(directory)
    }

    pub fn entries(&self) -> &[DatasetDirectoryEntry] {
        &self.entries
    }

    pub fn find_by_filename(&self, filename: &str) -> Option<&DatasetDirectoryEntry> {
        self.entries.iter().find(|e| e.filename() == filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Size information for a table, from its sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFileInfo {
    #[serde(default)]
    pub filename: String,
    /// Authoritative for load progress
    #[serde(default, alias = "size_bytes")]
    pub compressed_size_bytes: u64,
    #[serde(default)]
    pub uncompressed_size_bytes: Option<u64>,
    #[serde(default)]
    pub rows: Option<u64>,
}

/// Precomputed capture age statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeStats {
    #[serde(alias = "median_pano_age_years")]
    pub median_age_years: Option<f64>,
    #[serde(alias = "avg_pano_age_years")]
    pub avg_age_years: Option<f64>,
    #[serde(alias = "stdev_pano_age_years")]
    pub stdev_age_years: Option<f64>,
    #[serde(alias = "oldest_pano_date")]
    pub oldest_date: Option<String>,
    #[serde(alias = "newest_pano_date")]
    pub newest_date: Option<String>,
}

impl AgeStats {
    /// Whether no statistic is present at all
    pub fn is_empty(&self) -> bool {
        self.median_age_years.is_none()
            && self.avg_age_years.is_none()
            && self.stdev_age_years.is_none()
            && self.oldest_date.is_none()
            && self.newest_date.is_none()
    }
}

/// The dataset's place as recorded by the collection tooling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarPlace {
    pub name: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub bounds: Option<BoundingBox>,
}

/// Summary over one subset of rows (every row, or first-party rows only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSummary {
    pub total_entries: Option<u64>,
    pub age_stats: AgeStats,
}

/// Metadata published next to each table
///
/// Two layouts are accepted: a flat one with top-level `bounds` and
/// `age_stats`, and the collection tooling's nested one with the bounds under
/// `city` and age statistics under `all_panos` / `google_panos`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSidecar {
    pub data_file: TableFileInfo,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    #[serde(default)]
    pub age_stats: AgeStats,
    #[serde(default, alias = "city")]
    pub place: Option<SidecarPlace>,
    #[serde(default, alias = "all_panos")]
    pub all_records: Option<CaptureSummary>,
    #[serde(default, alias = "google_panos")]
    pub first_party_records: Option<CaptureSummary>,
}

impl DatasetSidecar {
    /// Fetch and decode the sidecar of `table`
    pub async fn load(fetcher: &ResourceFetcher, table: &str) -> Result<Self, MetadataError> {
        let name = sidecar_name_for(table);
        let bytes = fetcher.read_all(&name).await?;
        read_gzip_json(&name, &bytes)
    }

    /// Compressed size of the table in bytes
    pub fn compressed_size(&self) -> u64 {
        self.data_file.compressed_size_bytes
    }

    /// Age statistics of the records markers are drawn for
    ///
    /// First-party statistics win over all-record ones, which win over the
    /// flat `age_stats`.
    pub fn capture_age_stats(&self) -> &AgeStats {
        [&self.first_party_records, &self.all_records]
            .into_iter()
            .flatten()
            .map(|summary| &summary.age_stats)
            .find(|stats| !stats.is_empty())
            .unwrap_or(&self.age_stats)
    }

    /// Bounding box of the dataset, from either layout
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
            .or_else(|| self.place.as_ref().and_then(|place| place.bounds))
    }

    pub fn oldest_capture_date(&self) -> Option<NaiveDate> {
        self.capture_age_stats()
            .oldest_date
            .as_deref()
            .and_then(parse_capture_date)
    }

    pub fn newest_capture_date(&self) -> Option<NaiveDate> {
        self.capture_age_stats()
            .newest_date
            .as_deref()
            .and_then(parse_capture_date)
    }
}

/// Name of the sidecar resource for a table file
pub fn sidecar_name_for(table: &str) -> String {
    let base = table
        .strip_suffix(".csv.gz")
        .or_else(|| table.strip_suffix(".csv"))
        .unwrap_or(table);
    format!("{}.json.gz", base)
}

/// Decompress and parse a gzip-compressed JSON document
pub fn read_gzip_json<T: DeserializeOwned>(resource: &str, bytes: &[u8]) -> Result<T, MetadataError> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|source| MetadataError::Decode {
            resource: resource.to_string(),
            source,
        })?;

    serde_json::from_slice(&json).map_err(|source| MetadataError::Json {
        resource: resource.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DataLocation;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_directory_entry_forms() {
        let json = r#"{
            "cities": [
                {
                    "city": "Seattle",
                    "state": "Washington",
                    "country": "United States",
                    "data_file": {"filename": "seattle.csv.gz", "size_bytes": 1200}
                },
                {
                    "name": "Paris",
                    "region": {"code": "IDF", "name": "Île-de-France"},
                    "country": {"code": "FR", "name": "France"},
                    "bounds": {"min_lat": 48.8, "max_lat": 48.9, "min_lon": 2.2, "max_lon": 2.4},
                    "data_file": {"filename": "paris.csv.gz"},
                    "histogram": {"2019": 10, "2021": 4}
                }
            ]
        }"#;
        let directory: DatasetDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(directory.len(), 2);

        let seattle = &directory.entries()[0];
        assert_eq!(seattle.name, "Seattle");
        assert_eq!(seattle.region_identifiers().collect::<Vec<_>>(), vec!["Washington"]);
        assert_eq!(seattle.data_file.compressed_size_bytes, Some(1200));

        let paris = directory.find_by_filename("paris.csv.gz").unwrap();
        assert_eq!(paris.country_identifiers().collect::<Vec<_>>(), vec!["FR", "France"]);
        assert_eq!(paris.country.as_ref().unwrap().label(), "FR");
        assert_eq!(paris.histogram.get("2019"), Some(&10));
        assert!(paris.bounds.is_some());
    }

    #[test]
    fn test_sidecar_collection_tool_layout() {
        let json = r#"{
            "data_file": {"filename": "x.csv.gz", "format": "csv.gz", "rows": 42, "size_bytes": 5000},
            "city": {
                "name": "Seattle",
                "state": "Washington",
                "country": "United States",
                "center": {"latitude": 47.6, "longitude": -122.3},
                "bounds": {"min_lat": 47.5, "max_lat": 47.7, "min_lon": -122.4, "max_lon": -122.2}
            },
            "coverage": {"points_with_panos": 40, "coverage_rate": 95.2},
            "all_panos": {
                "total_entries": 42,
                "age_stats": {"oldest_pano_date": "2007-05-01T00:00:00", "median_pano_age_years": 6.0}
            },
            "google_panos": {
                "total_entries": 40,
                "age_stats": {
                    "oldest_pano_date": "2008-07-01T00:00:00",
                    "newest_pano_date": "2023-10-01T00:00:00",
                    "median_pano_age_years": 3.5,
                    "stdev_pano_age_years": 2.25
                }
            }
        }"#;
        let sidecar: DatasetSidecar = serde_json::from_str(json).unwrap();
        assert_eq!(sidecar.compressed_size(), 5000);
        assert_eq!(sidecar.data_file.rows, Some(42));
        assert_eq!(sidecar.oldest_capture_date(), NaiveDate::from_ymd_opt(2008, 7, 1));
        assert_eq!(sidecar.newest_capture_date(), NaiveDate::from_ymd_opt(2023, 10, 1));
        assert_eq!(sidecar.capture_age_stats().median_age_years, Some(3.5));
        assert_eq!(sidecar.capture_age_stats().stdev_age_years, Some(2.25));
        assert_eq!(sidecar.bounds().map(|b| b.max_lat), Some(47.7));
        assert_eq!(
            sidecar.place.as_ref().and_then(|p| p.state.as_deref()),
            Some("Washington")
        );
    }

    #[test]
    fn test_sidecar_falls_back_to_all_records() {
        let json = r#"{
            "data_file": {"size_bytes": 10},
            "all_panos": {"age_stats": {"oldest_pano_date": "2011-02-03T00:00:00"}},
            "google_panos": {"total_entries": 0, "age_stats": {}}
        }"#;
        let sidecar: DatasetSidecar = serde_json::from_str(json).unwrap();
        assert_eq!(sidecar.oldest_capture_date(), NaiveDate::from_ymd_opt(2011, 2, 3));
        assert_eq!(sidecar.bounds(), None);
    }

    #[test]
    fn test_sidecar_flat_layout() {
        let json = r#"{
            "data_file": {"compressed_size_bytes": 7},
            "bounds": {"min_lat": 1.0, "max_lat": 2.0, "min_lon": 3.0, "max_lon": 4.0},
            "age_stats": {"oldest_date": "2019-06"}
        }"#;
        let sidecar: DatasetSidecar = serde_json::from_str(json).unwrap();
        assert_eq!(sidecar.oldest_capture_date(), NaiveDate::from_ymd_opt(2019, 6, 1));
        assert_eq!(sidecar.newest_capture_date(), None);
        assert_eq!(sidecar.bounds().map(|b| b.min_lon), Some(3.0));
    }

    #[test]
    fn test_sidecar_name() {
        assert_eq!(sidecar_name_for("seattle_wa.csv.gz"), "seattle_wa.json.gz");
        assert_eq!(sidecar_name_for("plain.csv"), "plain.json.gz");
        assert_eq!(sidecar_name_for("odd"), "odd.json.gz");
    }

    #[test]
    fn test_read_gzip_json_errors() {
        let err = read_gzip_json::<DatasetSidecar>("s.json.gz", b"plain text").unwrap_err();
        assert!(matches!(err, MetadataError::Decode { .. }));

        let err = read_gzip_json::<DatasetSidecar>("s.json.gz", &gzip("{not json")).unwrap_err();
        assert!(matches!(err, MetadataError::Json { .. }));
    }

    #[tokio::test]
    async fn test_load_through_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cities.json.gz"),
            gzip(r#"{"entries": [{"name": "Oslo", "data_file": {"filename": "oslo.csv.gz"}}]}"#),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("oslo.json.gz"),
            gzip(r#"{"data_file": {"compressed_size_bytes": 77}}"#),
        )
        .unwrap();

        let fetcher = ResourceFetcher::new(
            DataLocation::Directory {
                root: dir.path().to_path_buf(),
            },
            1024,
        );
        let directory = DatasetDirectory::load(&fetcher, "cities.json.gz").await.unwrap();
        assert_eq!(directory.entries()[0].filename(), "oslo.csv.gz");

        let sidecar = DatasetSidecar::load(&fetcher, "oslo.csv.gz").await.unwrap();
        assert_eq!(sidecar.compressed_size(), 77);

        let missing = DatasetSidecar::load(&fetcher, "nowhere.csv.gz").await.unwrap_err();
        assert!(matches!(missing, MetadataError::Fetch(_)));
    }
}
