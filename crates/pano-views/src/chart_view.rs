use std::sync::Arc;

use pano_core::{ChartHandle, SelectionKey, SelectionStateMachine, SelectionSubscriber};
use pano_data::TemporalAggregate;
use parking_lot::Mutex;

use crate::colors::AgeColorScale;
use crate::surface::{emphasis_for_date, ChartSurface, SeriesPoint};

struct ChartState {
    colors: AgeColorScale,
    handle: Option<ChartHandle>,
    points: Vec<SeriesPoint>,
    current: SelectionKey,
}

/// Records per capture date, one bar per day
pub struct ChartView {
    surface: Arc<dyn ChartSurface>,
    selection: Arc<SelectionStateMachine>,
    state: Mutex<ChartState>,
}

impl ChartView {
    pub const NAME: &'static str = "chart";

    pub fn new(surface: Arc<dyn ChartSurface>, selection: Arc<SelectionStateMachine>) -> Self {
        Self {
            surface,
            selection,
            state: Mutex::new(ChartState {
                colors: AgeColorScale::default(),
                handle: None,
                points: Vec::new(),
                current: SelectionKey::None,
            }),
        }
    }

    /// Draw an empty series with a new color scale
    pub fn reset(&self, colors: AgeColorScale) {
        let mut state = self.state.lock();
        state.colors = colors;
        state.points.clear();
        state.current = SelectionKey::None;
        state.handle = Some(self.surface.render_series(&[]));
    }

    /// Redraw from the temporal aggregate, keeping the current selection
    pub fn render(&self, temporal: &TemporalAggregate) {
        let mut state = self.state.lock();
        let colors = state.colors;
        state.points = temporal
            .iter()
            .map(|(date, count)| SeriesPoint {
                date,
                count,
                color: colors.color_for_date(date),
            })
            .collect();

        let handle = self.surface.render_series(&state.points);
        state.handle = Some(handle);
        if !state.current.is_none() {
            self.emphasize(&state, &state.current);
        }
    }

    pub fn points(&self) -> Vec<SeriesPoint> {
        self.state.lock().points.clone()
    }

    /// User clicked a bar, or the empty chart area when `index` is `None`
    pub fn point_clicked(&self, index: Option<usize>) -> SelectionKey {
        let date = index.and_then(|i| self.state.lock().points.get(i).map(|p| p.date));
        match date {
            Some(date) => self.selection.select_date(date),
            None => self.selection.clear(),
        }
    }

    fn emphasize(&self, state: &ChartState, key: &SelectionKey) {
        let Some(handle) = state.handle else {
            return;
        };
        for (index, point) in state.points.iter().enumerate() {
            self.surface
                .set_point_emphasis(handle, index, emphasis_for_date(key, point.date));
        }
    }
}

impl SelectionSubscriber for ChartView {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_selection(&self, key: &SelectionKey) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.current = *key;
        self.emphasize(&state, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingChart;
    use crate::surface::Emphasis;
    use chrono::NaiveDate;
    use pano_core::Session;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (Session, Arc<RecordingChart>, Arc<ChartView>) {
        let session = Session::new();
        let surface = Arc::new(RecordingChart::new());
        let view = Arc::new(ChartView::new(surface.clone(), session.selection().clone()));
        session.mediator().subscribe_view(view.clone());
        (session, surface, view)
    }

    fn temporal() -> TemporalAggregate {
        let mut temporal = TemporalAggregate::new();
        temporal.increment(date(2018, 5, 1));
        temporal.increment(date(2018, 5, 1));
        temporal.increment(date(2018, 9, 9));
        temporal.increment(date(2020, 1, 1));
        temporal
    }

    #[test]
    fn test_render_one_point_per_day() {
        let (_session, surface, view) = setup();
        view.render(&temporal());

        let points = surface.points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, date(2018, 5, 1));
        assert_eq!(points[0].count, 2);
        assert_eq!(view.points(), points);
    }

    #[test]
    fn test_year_and_date_emphasis() {
        let (session, surface, view) = setup();
        view.render(&temporal());

        session.selection().select_year(2018);
        assert_eq!(
            surface.emphases(),
            vec![Emphasis::Active, Emphasis::Active, Emphasis::Dimmed]
        );

        view.point_clicked(Some(2));
        assert_eq!(session.selection().current(), SelectionKey::Date(date(2020, 1, 1)));
        assert_eq!(
            surface.emphases(),
            vec![Emphasis::Dimmed, Emphasis::Dimmed, Emphasis::Active]
        );

        view.point_clicked(None);
        assert_eq!(surface.emphases(), vec![Emphasis::Normal; 3]);
    }

    #[test]
    fn test_rerender_keeps_selection() {
        let (session, surface, view) = setup();
        view.render(&temporal());
        session.selection().select_year(2020);
        view.render(&temporal());
        assert_eq!(
            surface.emphases(),
            vec![Emphasis::Dimmed, Emphasis::Dimmed, Emphasis::Active]
        );
    }
}
