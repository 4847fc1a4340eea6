//! Panorama coverage explorer: one session wiring ingestion, location
//! resolution and the synchronized views

pub mod config;
pub mod explorer;

pub use config::ExplorerConfig;
pub use explorer::{DatasetRequest, Explorer, LoadSummary, ResolvedDataset};
