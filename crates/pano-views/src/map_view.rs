use std::sync::Arc;

use ahash::AHashMap;
use chrono::NaiveDate;
use pano_core::{MarkerHandle, MembershipIndex, SelectionKey, SelectionStateMachine, SelectionSubscriber};
use pano_data::{MarkerSink, ValidRecord};
use parking_lot::RwLock;

use crate::colors::AgeColorScale;
use crate::surface::{emphasis_for_date, Emphasis, MapSurface, MarkerSpec};

struct MapState {
    colors: AgeColorScale,
    members: MembershipIndex<MarkerHandle>,
    dates: AHashMap<MarkerHandle, NaiveDate>,
    current: SelectionKey,
}

/// Point markers, one per accepted record
///
/// Creates markers during ingestion and re-applies emphasis whenever the
/// selection changes. Clicking a marker selects its capture date.
pub struct MapView {
    surface: Arc<dyn MapSurface>,
    selection: Arc<SelectionStateMachine>,
    state: RwLock<MapState>,
}

impl MapView {
    pub const NAME: &'static str = "map";

    pub fn new(surface: Arc<dyn MapSurface>, selection: Arc<SelectionStateMachine>) -> Self {
        Self {
            surface,
            selection,
            state: RwLock::new(MapState {
                colors: AgeColorScale::default(),
                members: MembershipIndex::new(),
                dates: AHashMap::new(),
                current: SelectionKey::None,
            }),
        }
    }

    /// Destroy every marker and start over with a new color scale
    pub fn reset(&self, colors: AgeColorScale) {
        let mut state = self.state.write();
        self.surface.clear_markers();
        state.members.clear();
        state.dates.clear();
        state.current = SelectionKey::None;
        state.colors = colors;
    }

    pub fn marker_count(&self) -> usize {
        self.state.read().members.len()
    }

    /// Markers belonging to `key`, in creation order
    pub fn members_for(&self, key: &SelectionKey) -> Vec<MarkerHandle> {
        self.state.read().members.members_for(key)
    }

    /// User clicked a marker
    pub fn marker_clicked(&self, handle: MarkerHandle) -> SelectionKey {
        let date = self.state.read().dates.get(&handle).copied();
        match date {
            Some(date) => self.selection.select_date(date),
            None => self.selection.current(),
        }
    }

    /// User clicked the map outside any marker
    pub fn background_clicked(&self) -> SelectionKey {
        self.selection.clear()
    }
}

impl MarkerSink for MapView {
    fn create_marker(&self, record: &ValidRecord) -> MarkerHandle {
        let mut state = self.state.write();
        let spec = MarkerSpec {
            coordinate: record.sample,
            capture_date: record.capture_date,
            id: record.record_id.clone(),
            color: state.colors.color_for_date(record.capture_date),
        };
        let handle = self.surface.add_marker(&spec);

        let emphasis = emphasis_for_date(&state.current, record.capture_date);
        if emphasis != Emphasis::Normal {
            self.surface.set_marker_emphasis(handle, emphasis);
        }
        state.members.insert(handle, record.capture_date);
        state.dates.insert(handle, record.capture_date);
        handle
    }
}

impl SelectionSubscriber for MapView {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_selection(&self, key: &SelectionKey) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.current = *key;
        for (handle, date) in state.members.iter() {
            self.surface.set_marker_emphasis(handle, emphasis_for_date(key, date));
        }
        Ok(())
    }
}
