//! Headless chart builder for fio results.
//!
//! Loads one or more results from a running results API, runs a draw cycle
//! (optionally zoomed) and writes the chart figures as JSON.
//!
//! # Usage
//!
//! ```bash
//! fio-plot 12 15                             # all metrics, full view, stdout
//! fio-plot 12 --window 5 10 --zoom-out       # zoomed, then widened once
//! fio-plot 12 --mode detailed --output-dir plots/
//! fio-plot 12 --rename "seq-read 4k"
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use fio_webviewer::viewer::data::ViewMode;
use fio_webviewer::viewer::{
    CycleReport, GestureEvent, HttpBackend, RecordingSurface, UnitOutcome, ViewerSession,
};
use fio_webviewer::ViewerConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fio-plot")]
#[command(about = "Render fio result time-series charts as JSON figures")]
#[command(version)]
struct Args {
    /// Result ids to compare
    #[arg(required = true)]
    results: Vec<String>,

    /// Results API root
    #[arg(long, env = "FIO_VIEWER_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    /// View mode: aggregated or detailed
    #[arg(long, default_value = "aggregated")]
    mode: ViewMode,

    /// Plot width in pixels
    #[arg(long, env = "FIO_VIEWER_WIDTH", default_value = "800")]
    width: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Zoom to this window, in seconds from the start of the run
    #[arg(long, num_args = 2, value_names = ["LEFT_S", "RIGHT_S"], allow_negative_numbers = true)]
    window: Option<Vec<f64>>,

    /// Zoom out once after applying --window
    #[arg(long)]
    zoom_out: bool,

    /// Write one `<element id>.json` per chart instead of printing to stdout
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Rename the (single) given result and exit
    #[arg(long)]
    rename: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ViewerConfig {
        base_url: args.url.clone(),
        mode: args.mode,
        pixel_width: args.width,
        request_timeout: Duration::from_secs(args.timeout_secs),
        result_ids: args.results.clone(),
    };

    info!(
        url = %config.base_url,
        mode = %config.mode,
        results = config.result_ids.len(),
        "Starting fio-plot"
    );

    let backend = Arc::new(
        HttpBackend::from_config(&config).context("Failed to build results API client")?,
    );
    let surface = Arc::new(RecordingSurface::new(config.pixel_width));
    let session = ViewerSession::open(&config, backend, surface.clone())
        .await
        .context("Failed to load results")?;

    if let Some(name) = args.rename.as_deref() {
        let [result_id] = config.result_ids.as_slice() else {
            bail!("--rename takes exactly one result id");
        };
        session
            .rename(result_id, name)
            .await
            .with_context(|| format!("Failed to rename result {}", result_id))?;
        eprintln!("Renamed {} to {:?}", result_id, name.trim());
        return Ok(());
    }

    let mut report = session.draw_all().await;

    if let Some(bounds) = args.window.as_deref() {
        let event = GestureEvent::Relayout {
            range_start_s: bounds.first().copied(),
            range_end_s: bounds.get(1).copied(),
        };
        if let Some(zoomed) = session.handle(event).await {
            report = zoomed;
        }
    }
    if args.zoom_out {
        if let Some(widened) = session.handle(GestureEvent::DoubleClick).await {
            report = widened;
        }
    }

    summarize(&report);

    let mut figures = serde_json::Map::new();
    for unit in session.units() {
        if let Some(figure) = surface.figure(unit) {
            if matches!(report.outcome(unit), Some(UnitOutcome::Drawn { .. })) {
                figures.insert(unit.element_id(), serde_json::to_value(&figure)?);
            }
        }
    }

    match args.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for (element_id, figure) in &figures {
                let path = dir.join(format!("{}.json", element_id));
                std::fs::write(&path, serde_json::to_vec_pretty(figure)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            eprintln!("Wrote {} chart(s) to {}", figures.len(), dir.display());
        }
        None => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::Value::Object(figures))?
            );
        }
    }

    Ok(())
}

fn summarize(report: &CycleReport) {
    eprintln!("Window {}", report.window);
    for unit in &report.units {
        match &unit.outcome {
            UnitOutcome::Drawn { traces } => eprintln!("  {}: {} trace(s)", unit.unit, traces),
            UnitOutcome::Missing => eprintln!("  {}: no data", unit.unit),
            UnitOutcome::Failed(e) => eprintln!("  {}: error: {}", unit.unit, e),
            UnitOutcome::Stale => eprintln!("  {}: superseded", unit.unit),
        }
    }
}
