//! Rendering collaborators the views draw through
//!
//! Implementations own the actual map, chart and legend widgets; the views
//! only tell them what to draw and how to emphasize it.

use chrono::NaiveDate;
use pano_core::{ChartHandle, Coordinate, MarkerHandle, SelectionKey};
use serde::Serialize;

use crate::colors::Color;

/// Opacity of elements outside the active selection
pub const DIMMED_OPACITY: f32 = 0.1;

/// Fill opacity of markers when nothing is selected
pub const RESTING_FILL_OPACITY: f32 = 0.7;

/// Visual state of one element relative to the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Emphasis {
    /// No selection is active
    #[default]
    Normal,
    /// Member of the active selection
    Active,
    /// Outside the active selection
    Dimmed,
}

impl Emphasis {
    pub fn opacity(self) -> f32 {
        match self {
            Emphasis::Normal | Emphasis::Active => 1.0,
            Emphasis::Dimmed => DIMMED_OPACITY,
        }
    }

    pub fn fill_opacity(self) -> f32 {
        match self {
            Emphasis::Normal => RESTING_FILL_OPACITY,
            Emphasis::Active => 1.0,
            Emphasis::Dimmed => DIMMED_OPACITY,
        }
    }

    /// Whether the element should be drawn with an emphasized border and
    /// brought to the front where z-order is supported
    pub fn is_emphasized(self) -> bool {
        self == Emphasis::Active
    }
}

/// Everything a map needs to draw one marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub coordinate: Coordinate,
    pub capture_date: NaiveDate,
    pub id: String,
    pub color: Color,
}

/// One bar of the temporal chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
    pub color: Color,
}

/// One line of the year legend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRow {
    pub year: i32,
    pub count: usize,
    pub color: Color,
    pub emphasis: Emphasis,
}

pub trait MapSurface: Send + Sync {
    fn add_marker(&self, marker: &MarkerSpec) -> MarkerHandle;

    fn set_marker_emphasis(&self, handle: MarkerHandle, emphasis: Emphasis);

    /// Destroy every marker
    fn clear_markers(&self);
}

pub trait ChartSurface: Send + Sync {
    /// Replace the drawn series
    fn render_series(&self, points: &[SeriesPoint]) -> ChartHandle;

    fn set_point_emphasis(&self, handle: ChartHandle, index: usize, emphasis: Emphasis);
}

pub trait LegendSurface: Send + Sync {
    /// Replace the drawn legend
    fn render_legend(&self, rows: &[LegendRow]);
}

/// Emphasis of an element captured on `date` under `key`
pub fn emphasis_for_date(key: &SelectionKey, date: NaiveDate) -> Emphasis {
    if key.is_none() {
        Emphasis::Normal
    } else if key.matches_date(date) {
        Emphasis::Active
    } else {
        Emphasis::Dimmed
    }
}

/// Emphasis of a whole year under `key`; a date key dims every year
pub fn emphasis_for_year(key: &SelectionKey, year: i32) -> Emphasis {
    if key.is_none() {
        Emphasis::Normal
    } else if key.matches_year(year) {
        Emphasis::Active
    } else {
        Emphasis::Dimmed
    }
}
