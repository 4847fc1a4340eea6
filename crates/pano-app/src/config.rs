//! Explorer configuration: an optional JSON file plus environment overrides

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pano_data::resolver::DEFAULT_MATCH_THRESHOLD;
use pano_data::{DataLocation, IngestConfig};
use serde::{Deserialize, Serialize};

/// Path of a JSON configuration file
pub const ENV_CONFIG: &str = "PANO_CONFIG";
/// HTTP base URL serving tables and metadata; wins over `PANO_DATA_DIR`
pub const ENV_DATA_URL: &str = "PANO_DATA_URL";
/// Local directory holding tables and metadata
pub const ENV_DATA_DIR: &str = "PANO_DATA_DIR";
/// Acceptance threshold for location matches
pub const ENV_MATCH_THRESHOLD: &str = "PANO_MATCH_THRESHOLD";

pub const DEFAULT_DIRECTORY_NAME: &str = "cities.json.gz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Where tables, sidecars and the directory are read from
    pub data: DataLocation,

    /// Name of the directory resource
    pub directory_name: String,

    /// Best location matches scoring above this are rejected
    pub match_threshold: u32,

    /// Row filter settings
    pub ingest: IngestConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data: DataLocation::Directory {
                root: PathBuf::from("data"),
            },
            directory_name: DEFAULT_DIRECTORY_NAME.to_string(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            ingest: IngestConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Configuration from `PANO_CONFIG` (if set) and the environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATA_URL).filter(|v| !v.trim().is_empty()) {
            self.data = DataLocation::Http { base_url: url };
        } else if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data = DataLocation::Directory {
                root: PathBuf::from(dir),
            };
        }

        if let Some(threshold) = lookup(ENV_MATCH_THRESHOLD) {
            self.match_threshold = threshold
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number, got '{}'", ENV_MATCH_THRESHOLD, threshold))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.directory_name, "cities.json.gz");
        assert_eq!(config.match_threshold, 3);
        assert_eq!(config.ingest.success_status, "OK");
    }

    #[test]
    fn test_overrides() {
        let mut config = ExplorerConfig::default();
        config
            .apply_overrides(env(&[
                (ENV_DATA_DIR, "/srv/pano"),
                (ENV_MATCH_THRESHOLD, " 5 "),
            ]))
            .unwrap();
        assert_eq!(
            config.data,
            DataLocation::Directory {
                root: PathBuf::from("/srv/pano")
            }
        );
        assert_eq!(config.match_threshold, 5);

        config
            .apply_overrides(env(&[
                (ENV_DATA_URL, "https://example.org/pano"),
                (ENV_DATA_DIR, "/ignored"),
            ]))
            .unwrap();
        assert!(matches!(config.data, DataLocation::Http { .. }));

        assert!(config
            .apply_overrides(env(&[(ENV_MATCH_THRESHOLD, "three")]))
            .is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pano.json");
        std::fs::write(
            &path,
            r#"{
                "data": {"type": "http", "base_url": "https://example.org/data"},
                "ingest": {"required_attribution": "Source"}
            }"#,
        )
        .unwrap();

        let config = ExplorerConfig::from_file(&path).unwrap();
        assert_eq!(config.ingest.required_attribution, "Source");
        assert_eq!(config.ingest.success_status, "OK");
        assert_eq!(config.directory_name, DEFAULT_DIRECTORY_NAME);

        assert!(ExplorerConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
