//! Draw decision for chart units and the charting collaborator boundary.
//!
//! Each unit moves through `Loading -> (Error | Shown)`. A unit whose every
//! constituent fetch came back not-found shows the error panel and is never
//! handed to the chart; otherwise the successful series become traces.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::data::{ChartUnit, MetricType};
use super::orchestrator::ChartData;

/// Visibility of a chart unit's plot area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotState {
    /// Loader visible, plot and error panel hidden.
    Loading,
    /// Error panel visible, plot and loader hidden.
    Error,
    /// Plot visible, loader and error panel hidden.
    Shown,
}

/// The charting widget and the page around it.
///
/// Redrawing a chart discards its gesture listeners, so `bind_gestures` is
/// called after every `draw`.
pub trait ChartSurface: Send + Sync {
    /// Current width of the unit's plot area in pixels.
    fn pixel_width(&self, unit: &ChartUnit) -> u32;

    fn set_state(&self, unit: &ChartUnit, state: PlotState);

    fn draw(&self, unit: &ChartUnit, figure: &Figure);

    /// Re-attach relayout and double-click listeners to the unit's chart.
    fn bind_gestures(&self, unit: &ChartUnit);
}

// --- Figure ---

/// Traces, layout and toolbar configuration for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
    pub config: ToolbarConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub line: LineStyle,
    pub marker: MarkerStyle,
    pub connectgaps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub showlegend: bool,
    pub legend: Legend,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    pub fixedrange: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titlefont: Option<Font>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarConfig {
    pub mode_bar_buttons_to_remove: Vec<&'static str>,
    pub mode_bar_buttons_to_add: Vec<ToolbarButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolbarButton {
    pub name: &'static str,
    pub icon: &'static str,
    pub action: &'static str,
}

impl Layout {
    pub fn for_metric(metric: MetricType) -> Self {
        Self {
            title: metric.to_string(),
            showlegend: true,
            legend: Legend { orientation: "h" },
            xaxis: Axis {
                title: "t [s]".to_string(),
                fixedrange: false,
                titlefont: None,
            },
            yaxis: Axis {
                title: metric.unit().to_string(),
                fixedrange: true,
                titlefont: Some(Font { size: 18 }),
            },
        }
    }
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            mode_bar_buttons_to_remove: vec!["toImage", "sendDataToCloud"],
            mode_bar_buttons_to_add: vec![ToolbarButton {
                name: "Download plot as png",
                icon: "camera",
                action: "downloadImage",
            }],
        }
    }
}

impl Figure {
    /// Build the figure from the successful series of `data`.
    pub fn from_chart_data(data: &ChartData) -> Self {
        let traces = data
            .series()
            .map(|series| Trace {
                x: series.x.clone(),
                y: series.y.clone(),
                mode: "lines+markers",
                kind: "scatter",
                name: series.label.clone(),
                line: LineStyle { width: 1 },
                marker: MarkerStyle { size: 4 },
                connectgaps: false,
            })
            .collect();

        Self {
            data: traces,
            layout: Layout::for_metric(data.unit.metric),
            config: ToolbarConfig::default(),
        }
    }
}

// --- Renderer ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn { traces: usize },
    /// Every constituent fetch was not-found.
    Missing,
}

pub struct PlotRenderer {
    surface: Arc<dyn ChartSurface>,
}

impl PlotRenderer {
    pub fn new(surface: Arc<dyn ChartSurface>) -> Self {
        Self { surface }
    }

    pub fn pixel_width(&self, unit: &ChartUnit) -> u32 {
        self.surface.pixel_width(unit)
    }

    /// Enter the loading state at the start of a fetch cycle.
    pub fn begin(&self, unit: &ChartUnit) {
        self.surface.set_state(unit, PlotState::Loading);
    }

    /// Decide between error panel and chart, then draw.
    pub fn render(&self, data: &ChartData) -> RenderOutcome {
        let unit = &data.unit;

        if data.all_not_found() {
            debug!(unit = %unit, "No series found, showing error panel");
            self.surface.set_state(unit, PlotState::Error);
            return RenderOutcome::Missing;
        }

        let figure = Figure::from_chart_data(data);
        let traces = figure.data.len();

        self.surface.set_state(unit, PlotState::Shown);
        self.surface.draw(unit, &figure);
        self.surface.bind_gestures(unit);

        debug!(unit = %unit, traces, "Chart drawn");
        RenderOutcome::Drawn { traces }
    }

    /// Show the error panel after a failed fetch.
    pub fn fail(&self, unit: &ChartUnit) {
        self.surface.set_state(unit, PlotState::Error);
    }
}

// --- Recording surface ---

/// Something the renderer asked the surface to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    State(ChartUnit, PlotState),
    Draw(ChartUnit, Figure),
    BindGestures(ChartUnit),
}

/// Surface that keeps every call in memory.
///
/// Used by the headless CLI to collect figures and by tests to check the
/// loading/error/shown sequence.
pub struct RecordingSurface {
    default_width: u32,
    widths: Mutex<HashMap<ChartUnit, u32>>,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new(default_width: u32) -> Self {
        Self {
            default_width,
            widths: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_width(&self, unit: &ChartUnit, width: u32) {
        lock(&self.widths).insert(unit.clone(), width);
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        lock(&self.events).clone()
    }

    /// Last state set for `unit`.
    pub fn state(&self, unit: &ChartUnit) -> Option<PlotState> {
        lock(&self.events).iter().rev().find_map(|event| match event {
            SurfaceEvent::State(u, state) if u == unit => Some(*state),
            _ => None,
        })
    }

    /// Last figure drawn for `unit`.
    pub fn figure(&self, unit: &ChartUnit) -> Option<Figure> {
        lock(&self.events).iter().rev().find_map(|event| match event {
            SurfaceEvent::Draw(u, figure) if u == unit => Some(figure.clone()),
            _ => None,
        })
    }

    pub fn draw_count(&self, unit: &ChartUnit) -> usize {
        lock(&self.events)
            .iter()
            .filter(|event| matches!(event, SurfaceEvent::Draw(u, _) if u == unit))
            .count()
    }

    /// States set for `unit`, oldest first.
    pub fn states(&self, unit: &ChartUnit) -> Vec<PlotState> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::State(u, state) if u == unit => Some(*state),
                _ => None,
            })
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChartSurface for RecordingSurface {
    fn pixel_width(&self, unit: &ChartUnit) -> u32 {
        lock(&self.widths)
            .get(unit)
            .copied()
            .unwrap_or(self.default_width)
    }

    fn set_state(&self, unit: &ChartUnit, state: PlotState) {
        lock(&self.events).push(SurfaceEvent::State(unit.clone(), state));
    }

    fn draw(&self, unit: &ChartUnit, figure: &Figure) {
        lock(&self.events).push(SurfaceEvent::Draw(unit.clone(), figure.clone()));
    }

    fn bind_gestures(&self, unit: &ChartUnit) {
        lock(&self.events).push(SurfaceEvent::BindGestures(unit.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::backend::SeriesRequest;
    use crate::viewer::data::{Direction, FetchOutcome, Series, TimeWindow};
    use crate::viewer::orchestrator::SeriesSlot;

    fn slot(result_id: &str, outcome: FetchOutcome) -> SeriesSlot {
        SeriesSlot {
            request: SeriesRequest {
                result_id: result_id.to_string(),
                job_id: None,
                metric: MetricType::Latency,
                window: TimeWindow::new(0, 1000),
                bucket_seconds: 1,
                direction: Direction::Read,
            },
            outcome,
        }
    }

    fn chart_data(slots: Vec<SeriesSlot>) -> ChartData {
        ChartData {
            unit: ChartUnit::aggregated(MetricType::Latency),
            window: TimeWindow::new(0, 1000),
            bucket_seconds: 1,
            slots,
        }
    }

    fn data_series(label: &str) -> FetchOutcome {
        FetchOutcome::Success(Series::unlabeled(vec![1.0], vec![Some(0.3)]).with_label(label))
    }

    #[test]
    fn test_all_not_found_shows_error_without_drawing() {
        let surface = Arc::new(RecordingSurface::new(800));
        let renderer = PlotRenderer::new(surface.clone());
        let data = chart_data(vec![
            slot("a", FetchOutcome::NotFound),
            slot("b", FetchOutcome::NotFound),
        ]);

        renderer.begin(&data.unit);
        assert_eq!(renderer.render(&data), RenderOutcome::Missing);

        assert_eq!(
            surface.states(&data.unit),
            vec![PlotState::Loading, PlotState::Error]
        );
        assert_eq!(surface.draw_count(&data.unit), 0);
    }

    #[test]
    fn test_empty_unit_is_missing() {
        let surface = Arc::new(RecordingSurface::new(800));
        let renderer = PlotRenderer::new(surface.clone());
        assert_eq!(renderer.render(&chart_data(vec![])), RenderOutcome::Missing);
    }

    #[test]
    fn test_partial_not_found_draws_successful_series() {
        let surface = Arc::new(RecordingSurface::new(800));
        let renderer = PlotRenderer::new(surface.clone());
        let data = chart_data(vec![
            slot("a", FetchOutcome::NotFound),
            slot("b", data_series("read b")),
        ]);

        renderer.begin(&data.unit);
        assert_eq!(renderer.render(&data), RenderOutcome::Drawn { traces: 1 });

        let figure = surface.figure(&data.unit).unwrap();
        assert_eq!(figure.data.len(), 1);
        assert_eq!(figure.data[0].name, "read b");
        assert_eq!(figure.layout.yaxis.title, "ms");
        assert_eq!(
            surface.states(&data.unit),
            vec![PlotState::Loading, PlotState::Shown]
        );
        // Listeners are re-bound after the draw.
        assert!(matches!(
            surface.events().last(),
            Some(SurfaceEvent::BindGestures(_))
        ));
    }

    #[test]
    fn test_figure_json_shape() {
        let figure = Figure::from_chart_data(&chart_data(vec![slot("a", data_series("read a"))]));
        let json = serde_json::to_value(&figure).unwrap();

        assert_eq!(json["data"][0]["type"], "scatter");
        assert_eq!(json["data"][0]["mode"], "lines+markers");
        assert_eq!(json["data"][0]["connectgaps"], false);
        assert_eq!(json["layout"]["title"], "lat");
        assert_eq!(json["layout"]["xaxis"]["title"], "t [s]");
        assert_eq!(json["layout"]["yaxis"]["fixedrange"], true);
        assert_eq!(json["layout"]["yaxis"]["titlefont"]["size"], 18);
        assert_eq!(
            json["config"]["modeBarButtonsToRemove"],
            serde_json::json!(["toImage", "sendDataToCloud"])
        );
    }

    #[test]
    fn test_recording_surface_widths() {
        let surface = RecordingSurface::new(800);
        let unit = ChartUnit::aggregated(MetricType::Bandwidth);
        assert_eq!(surface.pixel_width(&unit), 800);
        surface.set_width(&unit, 1200);
        assert_eq!(surface.pixel_width(&unit), 1200);
    }
}
