//! In-memory surfaces that record what they were told to draw
//!
//! Used by the headless binary and by tests.

use std::collections::BTreeMap;

use pano_core::{ChartHandle, MarkerHandle};
use parking_lot::Mutex;

use crate::surface::{ChartSurface, Emphasis, LegendRow, LegendSurface, MapSurface, MarkerSpec, SeriesPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMarker {
    pub spec: MarkerSpec,
    pub emphasis: Emphasis,
    /// Higher draws on top
    pub z: u64,
}

#[derive(Default)]
struct MapState {
    next_handle: u64,
    next_z: u64,
    markers: BTreeMap<MarkerHandle, RecordedMarker>,
    clears: usize,
}

#[derive(Default)]
pub struct RecordingMap {
    state: Mutex<MapState>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.state.lock().markers.len()
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<RecordedMarker> {
        self.state.lock().markers.get(&handle).cloned()
    }

    pub fn emphasis(&self, handle: MarkerHandle) -> Option<Emphasis> {
        self.state.lock().markers.get(&handle).map(|m| m.emphasis)
    }

    /// Number of markers currently in `emphasis`
    pub fn count_with(&self, emphasis: Emphasis) -> usize {
        self.state
            .lock()
            .markers
            .values()
            .filter(|m| m.emphasis == emphasis)
            .count()
    }

    /// Marker drawn on top of all others
    pub fn topmost(&self) -> Option<MarkerHandle> {
        self.state
            .lock()
            .markers
            .iter()
            .max_by_key(|(handle, marker)| (marker.z, **handle))
            .map(|(handle, _)| *handle)
    }

    /// Times every marker was destroyed
    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }

    /// Markers ever added, cleared or not
    pub fn added_count(&self) -> usize {
        self.state.lock().next_handle as usize
    }
}

impl MapSurface for RecordingMap {
    fn add_marker(&self, marker: &MarkerSpec) -> MarkerHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        state.next_z += 1;
        let handle = MarkerHandle(state.next_handle);
        let z = state.next_z;
        state.markers.insert(
            handle,
            RecordedMarker {
                spec: marker.clone(),
                emphasis: Emphasis::Normal,
                z,
            },
        );
        handle
    }

    fn set_marker_emphasis(&self, handle: MarkerHandle, emphasis: Emphasis) {
        let mut state = self.state.lock();
        let z = if emphasis.is_emphasized() {
            state.next_z += 1;
            Some(state.next_z)
        } else {
            None
        };
        match state.markers.get_mut(&handle) {
            Some(marker) => {
                marker.emphasis = emphasis;
                if let Some(z) = z {
                    marker.z = z;
                }
            }
            None => tracing::debug!("Emphasis for unknown marker {:?}", handle),
        }
    }

    fn clear_markers(&self) {
        let mut state = self.state.lock();
        state.markers.clear();
        state.clears += 1;
    }
}

#[derive(Default)]
struct ChartState {
    next_handle: u64,
    handle: Option<ChartHandle>,
    points: Vec<SeriesPoint>,
    emphasis: Vec<Emphasis>,
    renders: usize,
}

#[derive(Default)]
pub struct RecordingChart {
    state: Mutex<ChartState>,
}

impl RecordingChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<SeriesPoint> {
        self.state.lock().points.clone()
    }

    pub fn emphases(&self) -> Vec<Emphasis> {
        self.state.lock().emphasis.clone()
    }

    pub fn render_count(&self) -> usize {
        self.state.lock().renders
    }

    pub fn handle(&self) -> Option<ChartHandle> {
        self.state.lock().handle
    }
}

impl ChartSurface for RecordingChart {
    fn render_series(&self, points: &[SeriesPoint]) -> ChartHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = ChartHandle(state.next_handle);
        state.handle = Some(handle);
        state.points = points.to_vec();
        state.emphasis = vec![Emphasis::Normal; points.len()];
        state.renders += 1;
        handle
    }

    fn set_point_emphasis(&self, handle: ChartHandle, index: usize, emphasis: Emphasis) {
        let mut state = self.state.lock();
        if state.handle != Some(handle) {
            tracing::debug!("Emphasis for stale chart {:?}", handle);
            return;
        }
        if let Some(slot) = state.emphasis.get_mut(index) {
            *slot = emphasis;
        }
    }
}

#[derive(Default)]
struct LegendState {
    rows: Vec<LegendRow>,
    renders: usize,
}

#[derive(Default)]
pub struct RecordingLegend {
    state: Mutex<LegendState>,
}

impl RecordingLegend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<LegendRow> {
        self.state.lock().rows.clone()
    }

    pub fn render_count(&self) -> usize {
        self.state.lock().renders
    }
}

impl LegendSurface for RecordingLegend {
    fn render_legend(&self, rows: &[LegendRow]) {
        let mut state = self.state.lock();
        state.rows = rows.to_vec();
        state.renders += 1;
    }
}
