//! Run command - drive the engine headless.
//!
//! The device location comes from a scripted sensor built from the command
//! line; overlays come from the configured backend. Clicks cannot happen
//! without a display, so the host only reports location status and refresh
//! failures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use fieldmap::engine::{EngineHost, EngineRuntime, MapEngine};
use fieldmap::geo::GeoPoint;
use fieldmap::location::{Fix, ScriptedLocationProvider, SensorState, WatchStep};
use fieldmap::overlay::popup::popup_for;
use fieldmap::overlay::{EntityKind, OverlayEntity};
use fieldmap::refresh::{FetchError, HttpOverlaySource};
use fieldmap::surface::RecordingCanvas;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Delay before the simulated refined reading arrives.
const REFINED_READING_DELAY: Duration = Duration::from_secs(3);

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub accuracy: f64,
    pub refined_accuracy: Option<f64>,
    pub duration: Option<u64>,
    pub debug: bool,
}

/// Host that reports engine callbacks on the console.
#[derive(Debug, Default)]
struct ConsoleHost {
    last_status: Option<SensorState>,
    refresh_failures: usize,
}

impl EngineHost for ConsoleHost {
    fn on_entity_click(&mut self, entity: OverlayEntity) {
        println!("{}", popup_for(&entity));
    }

    fn on_location_status_change(&mut self, state: &SensorState) {
        println!("Location: {}", state.status_message());
        self.last_status = Some(state.clone());
    }

    fn on_refresh_failed(&mut self, error: &FetchError) {
        self.refresh_failures += 1;
        if error.is_authorization() {
            eprintln!("Overlay refresh rejected: {} (check api_token)", error);
        } else {
            eprintln!("Overlay refresh failed: {}", error);
        }
    }
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("run");
    let config = runner.config();

    let provider = scripted_provider(
        &args,
        config.map.default_latitude,
        config.map.default_longitude,
    )?;
    let refresh = config.refresh_config();
    let source = HttpOverlaySource::new(&refresh)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async {
        let started = Utc::now();
        let engine = MapEngine::new(
            RecordingCanvas::new(),
            config.viewport_config(),
            ConsoleHost::default(),
        );
        let handle = EngineRuntime::start(
            engine,
            Arc::new(provider),
            Arc::new(source),
            config.location_config(),
            refresh,
        )?;

        println!("Map engine running. Press Ctrl-C to stop.");
        let deadline = args.duration.map(Duration::from_secs);
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Interrupted");
            }
            _ = wait_for(deadline) => info!("Run duration elapsed"),
        }

        let stats = handle.refresh_stats();
        let engine = handle
            .shutdown()
            .await
            .map_err(|e| CliError::Runtime(e.to_string()))?;

        let snapshot = engine.current_snapshot();
        let elapsed = Utc::now() - started;
        println!();
        println!("Ran for {}s", elapsed.num_seconds());
        println!(
            "Refreshes: {} ok, {} failed, {} dropped",
            stats.successes, stats.failures, stats.dropped
        );
        println!(
            "Last snapshot: {} incidents, {} geofences, {} tracked persons ({} records dropped)",
            snapshot.count_of(EntityKind::Incident),
            snapshot.count_of(EntityKind::Geofence),
            snapshot.count_of(EntityKind::TrackedPerson),
            snapshot.dropped()
        );
        let host = engine.into_host();
        if let Some(status) = host.last_status {
            println!("Location: {}", status.status_message());
        }
        Ok::<(), CliError>(())
    })
}

async fn wait_for(deadline: Option<Duration>) {
    match deadline {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

fn scripted_provider(
    args: &RunArgs,
    default_lat: f64,
    default_lon: f64,
) -> Result<ScriptedLocationProvider, CliError> {
    let position = GeoPoint::new(
        args.lat.unwrap_or(default_lat),
        args.lon.unwrap_or(default_lon),
    )
    .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    if !(args.accuracy.is_finite() && args.accuracy >= 0.0) {
        return Err(CliError::InvalidArgument(format!(
            "--accuracy must be a non-negative number, got {}",
            args.accuracy
        )));
    }

    let provider = ScriptedLocationProvider::new(Ok(Fix::now(position, args.accuracy)));
    Ok(match args.refined_accuracy {
        Some(refined) => provider.with_watch_steps(vec![WatchStep::fix(
            REFINED_READING_DELAY,
            Fix::now(position, refined),
        )]),
        None => provider,
    })
}
