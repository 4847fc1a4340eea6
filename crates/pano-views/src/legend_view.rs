use std::sync::Arc;

use pano_core::{SelectionKey, SelectionStateMachine, SelectionSubscriber};
use parking_lot::Mutex;

use crate::colors::AgeColorScale;
use crate::surface::{emphasis_for_year, LegendRow, LegendSurface};

struct LegendState {
    colors: AgeColorScale,
    years: Vec<(i32, usize)>,
    current: SelectionKey,
}

/// One row per capture year with its record count
///
/// A row is active only while its year is selected; a date selection dims
/// every row.
pub struct LegendView {
    surface: Arc<dyn LegendSurface>,
    selection: Arc<SelectionStateMachine>,
    state: Mutex<LegendState>,
}

impl LegendView {
    pub const NAME: &'static str = "legend";

    pub fn new(surface: Arc<dyn LegendSurface>, selection: Arc<SelectionStateMachine>) -> Self {
        Self {
            surface,
            selection,
            state: Mutex::new(LegendState {
                colors: AgeColorScale::default(),
                years: Vec::new(),
                current: SelectionKey::None,
            }),
        }
    }

    pub fn reset(&self, colors: AgeColorScale) {
        let mut state = self.state.lock();
        state.colors = colors;
        state.years.clear();
        state.current = SelectionKey::None;
        self.draw(&state);
    }

    /// Redraw from `(year, count)` pairs
    pub fn render(&self, year_counts: &[(i32, usize)]) {
        let mut state = self.state.lock();
        state.years = year_counts.to_vec();
        self.draw(&state);
    }

    /// User clicked the row of `year`
    pub fn row_clicked(&self, year: i32) -> SelectionKey {
        self.selection.select_year(year)
    }

    fn draw(&self, state: &LegendState) {
        let rows: Vec<LegendRow> = state
            .years
            .iter()
            .map(|&(year, count)| LegendRow {
                year,
                count,
                color: state.colors.color_for_year(year),
                emphasis: emphasis_for_year(&state.current, year),
            })
            .collect();
        self.surface.render_legend(&rows);
    }
}

impl SelectionSubscriber for LegendView {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_selection(&self, key: &SelectionKey) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.current = *key;
        self.draw(&state);
        Ok(())
    }
}
