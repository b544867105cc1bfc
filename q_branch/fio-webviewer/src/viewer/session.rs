//! A viewing session: catalog, view window and draw cycles.
//!
//! Every gesture starts a new cycle that refetches and redraws all chart
//! units concurrently. Cycles are not cancelled when a newer gesture
//! arrives; instead each chart unit carries a generation counter and a
//! cycle whose generation is no longer current when its fetches settle is
//! dropped without touching the chart.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::backend::Backend;
use super::catalog::ResultCatalog;
use super::data::{ChartUnit, TimeWindow, ViewMode};
use super::orchestrator::FetchOrchestrator;
use super::renderer::{ChartSurface, PlotRenderer, RenderOutcome};
use super::zoom::{ViewState, ZoomController};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};

/// Input from the chart or the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Relayout with the new x-axis range in seconds. Autorange relayouts
    /// carry no finite bounds and are ignored.
    Relayout {
        range_start_s: Option<f64>,
        range_end_s: Option<f64>,
    },
    /// Double click on a chart: zoom out.
    DoubleClick,
    /// Reset button: back to full view.
    Reset,
}

impl GestureEvent {
    /// Read a relayout event payload (`{"xaxis.range[0]": .., "xaxis.range[1]": ..}`).
    pub fn from_relayout(eventdata: &serde_json::Value) -> Self {
        GestureEvent::Relayout {
            range_start_s: eventdata
                .get("xaxis.range[0]")
                .and_then(serde_json::Value::as_f64),
            range_end_s: eventdata
                .get("xaxis.range[1]")
                .and_then(serde_json::Value::as_f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Drawn { traces: usize },
    /// Every constituent series was not-found; error panel shown.
    Missing,
    /// Fetch failed; error panel shown, nothing drawn.
    Failed(ViewerError),
    /// Superseded by a newer cycle; result discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub unit: ChartUnit,
    pub generation: u64,
    pub outcome: UnitOutcome,
}

/// Outcome of one draw cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Window the cycle fetched, resolved.
    pub window: TimeWindow,
    pub units: Vec<UnitReport>,
}

impl CycleReport {
    pub fn outcome(&self, unit: &ChartUnit) -> Option<&UnitOutcome> {
        self.units
            .iter()
            .find(|report| &report.unit == unit)
            .map(|report| &report.outcome)
    }
}

/// What the page should do after a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Reload,
}

/// Per-unit cycle generations.
#[derive(Default)]
struct GenerationTracker {
    current: Mutex<HashMap<ChartUnit, u64>>,
}

impl GenerationTracker {
    fn lock(&self) -> MutexGuard<'_, HashMap<ChartUnit, u64>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new cycle for `unit` and return its generation.
    fn begin(&self, unit: &ChartUnit) -> u64 {
        let mut current = self.lock();
        let generation = current.entry(unit.clone()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, unit: &ChartUnit, generation: u64) -> bool {
        self.lock().get(unit) == Some(&generation)
    }
}

pub struct ViewerSession {
    catalog: ResultCatalog,
    orchestrator: FetchOrchestrator,
    renderer: PlotRenderer,
    zoom: Mutex<ZoomController>,
    generations: GenerationTracker,
    units: Vec<ChartUnit>,
}

impl ViewerSession {
    /// Load the catalog for `config.result_ids` and prepare the chart units.
    ///
    /// Fails with `EmptyCatalog` when no results were requested, since no
    /// window can be derived without `rmax`.
    pub async fn open(
        config: &ViewerConfig,
        backend: Arc<dyn Backend>,
        surface: Arc<dyn ChartSurface>,
    ) -> Result<Self> {
        let catalog = ResultCatalog::load(backend.as_ref(), &config.result_ids).await?;
        let rmax = catalog.rmax()?;
        let units = catalog.chart_units(config.mode);

        info!(
            mode = %config.mode,
            rmax_ms = rmax,
            units = units.len(),
            "Opened viewer session"
        );

        Ok(Self {
            catalog,
            orchestrator: FetchOrchestrator::new(backend, config.mode),
            renderer: PlotRenderer::new(surface),
            zoom: Mutex::new(ZoomController::new(rmax)),
            generations: GenerationTracker::default(),
            units,
        })
    }

    fn zoom(&self) -> MutexGuard<'_, ZoomController> {
        self.zoom.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn catalog(&self) -> &ResultCatalog {
        &self.catalog
    }

    pub fn units(&self) -> &[ChartUnit] {
        &self.units
    }

    pub fn mode(&self) -> ViewMode {
        self.orchestrator.mode()
    }

    /// Window currently on screen.
    pub fn window(&self) -> TimeWindow {
        self.zoom().window()
    }

    pub fn view_state(&self) -> ViewState {
        self.zoom().state()
    }

    /// Fetch and draw every chart unit for the current window.
    pub async fn draw_all(&self) -> CycleReport {
        let window = self.zoom().requested_window();
        self.run_cycle(window).await
    }

    /// Apply a gesture and redraw. Returns `None` when the gesture does not
    /// change the view (autorange relayout, double click in full view).
    pub async fn handle(&self, event: GestureEvent) -> Option<CycleReport> {
        let window = {
            let mut zoom = self.zoom();
            let changed = match event {
                GestureEvent::Relayout {
                    range_start_s,
                    range_end_s,
                } => zoom.zoom_in(range_start_s, range_end_s).is_some(),
                GestureEvent::DoubleClick => zoom.zoom_out().is_some(),
                GestureEvent::Reset => {
                    zoom.reset();
                    true
                }
            };
            changed.then(|| zoom.requested_window())
        };

        let Some(window) = window else {
            debug!(event = ?event, "Gesture ignored");
            return None;
        };
        Some(self.run_cycle(window).await)
    }

    /// Rename a result. On success the page reloads to pick up the name.
    pub async fn rename(&self, result_id: &str, name: &str) -> Result<RenameOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ViewerError::EmptyName);
        }

        match self.orchestrator.backend().rename(result_id, name).await {
            Ok(()) => {
                info!(result = %result_id, name = %name, "Renamed result");
                Ok(RenameOutcome::Reload)
            }
            Err(e) => {
                warn!(result = %result_id, error = %e, "Rename failed");
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, window: TimeWindow) -> CycleReport {
        let resolved = window.resolve(self.zoom().rmax_ms());
        debug!(window = %resolved, units = self.units.len(), "Starting draw cycle");

        let units = join_all(self.units.iter().map(|unit| self.draw_unit(unit, window))).await;

        CycleReport {
            window: resolved,
            units,
        }
    }

    async fn draw_unit(&self, unit: &ChartUnit, window: TimeWindow) -> UnitReport {
        let generation = self.generations.begin(unit);
        self.renderer.begin(unit);

        let pixel_width = self.renderer.pixel_width(unit);
        let fetched = self
            .orchestrator
            .fetch(&self.catalog, unit, window, pixel_width)
            .await;

        if !self.generations.is_current(unit, generation) {
            debug!(unit = %unit, generation, "Discarding stale cycle");
            return UnitReport {
                unit: unit.clone(),
                generation,
                outcome: UnitOutcome::Stale,
            };
        }

        let outcome = match fetched {
            Ok(data) => match self.renderer.render(&data) {
                RenderOutcome::Drawn { traces } => UnitOutcome::Drawn { traces },
                RenderOutcome::Missing => UnitOutcome::Missing,
            },
            Err(e) => {
                warn!(unit = %unit, error = %e, "Chart unit failed");
                self.renderer.fail(unit);
                UnitOutcome::Failed(e)
            }
        };

        UnitReport {
            unit: unit.clone(),
            generation,
            outcome,
        }
    }
}
