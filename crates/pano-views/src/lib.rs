//! The three synchronized views of a coverage dataset
//!
//! Map, chart and legend each subscribe to the session's event mediator and
//! derive their highlight state from the selection key and their own
//! membership data only.

pub mod chart_view;
pub mod colors;
pub mod legend_view;
pub mod map_view;
pub mod recording;
pub mod surface;

use std::sync::Arc;

use pano_core::Session;
use pano_data::AggregateIndex;

// Re-exports
pub use chart_view::ChartView;
pub use colors::{AgeColorScale, Color};
pub use legend_view::LegendView;
pub use map_view::MapView;
pub use recording::{RecordingChart, RecordingLegend, RecordingMap};
pub use surface::{
    ChartSurface, Emphasis, LegendRow, LegendSurface, MapSurface, MarkerSpec, SeriesPoint,
};

/// The views of one session, subscribed to its mediator
#[derive(Clone)]
pub struct ViewSet {
    pub map: Arc<MapView>,
    pub chart: Arc<ChartView>,
    pub legend: Arc<LegendView>,
}

impl ViewSet {
    /// Create the views over their surfaces and subscribe them in
    /// map, chart, legend order
    pub fn attach(
        session: &Session,
        map: Arc<dyn MapSurface>,
        chart: Arc<dyn ChartSurface>,
        legend: Arc<dyn LegendSurface>,
    ) -> Self {
        let selection = session.selection().clone();
        let views = Self {
            map: Arc::new(MapView::new(map, selection.clone())),
            chart: Arc::new(ChartView::new(chart, selection.clone())),
            legend: Arc::new(LegendView::new(legend, selection)),
        };

        let mediator = session.mediator();
        mediator.subscribe_view(views.map.clone());
        mediator.subscribe_view(views.chart.clone());
        mediator.subscribe_view(views.legend.clone());
        views
    }

    /// Clear everything for a new dataset
    pub fn reset(&self, colors: AgeColorScale) {
        self.map.reset(colors);
        self.chart.reset(colors);
        self.legend.reset(colors);
    }

    /// Redraw the summaries after (or during) ingestion
    pub fn refresh(&self, index: &AggregateIndex) {
        self.chart.render(index.temporal());
        self.legend.render(&index.year_counts());
    }
}
