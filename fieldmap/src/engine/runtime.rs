//! Tokio runtime wiring for the map engine.
//!
//! Spawns the location driver and the refresh scheduler, and runs the
//! engine's single event loop that consumes their output plus resolved
//! clicks. Shutdown cancels one token shared by all three tasks; dropping
//! the handle without calling [`EngineHandle::shutdown`] cancels it too.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::location::{LocationConfig, LocationControl, LocationDriver, LocationProvider, SensorState};
use crate::refresh::{
    OverlaySource, RefreshConfig, RefreshHandle, RefreshOutcome, RefreshScheduler, RefreshStats,
};
use crate::surface::SurfaceError;

use super::{EngineHost, MapEngine};

/// Capacity of the status and outcome channels.
const CHANNEL_CAPACITY: usize = 32;

/// Starts engines on the current tokio runtime.
pub struct EngineRuntime;

impl EngineRuntime {
    /// Mount the engine and start its background tasks.
    ///
    /// Requests the first location fix and the first refresh immediately.
    pub fn start<H, P, S>(
        mut engine: MapEngine<H>,
        provider: Arc<P>,
        source: Arc<S>,
        location: LocationConfig,
        refresh: RefreshConfig,
    ) -> Result<EngineHandle<H>, SurfaceError>
    where
        H: EngineHost,
        P: LocationProvider,
        S: OverlaySource,
    {
        engine.mount()?;

        let cancel = CancellationToken::new();

        let (status_tx, status_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (driver, control) = LocationDriver::new(provider, location, status_tx);
        let driver_task = driver.start(cancel.child_token());
        control.request();

        let (outcome_tx, outcome_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (scheduler, refresh_handle) = RefreshScheduler::new(source, refresh, outcome_tx);
        let scheduler_task = scheduler.start(cancel.child_token());

        let engine_task = tokio::spawn(run_engine(engine, status_rx, outcome_rx, cancel.clone()));

        info!("Map engine started");
        Ok(EngineHandle {
            cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            control,
            refresh: refresh_handle,
            engine_task,
            driver_task,
            scheduler_task,
        })
    }
}

async fn run_engine<H: EngineHost>(
    mut engine: MapEngine<H>,
    mut status_rx: mpsc::Receiver<SensorState>,
    mut outcome_rx: mpsc::Receiver<RefreshOutcome>,
    cancel: CancellationToken,
) -> MapEngine<H> {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(state) = status_rx.recv() => engine.handle_location(state),

            Some(outcome) = outcome_rx.recv() => engine.handle_refresh(outcome),

            Some(entity) = engine.next_click() => engine.handle_click(entity),
        }
    }

    engine.teardown();
    debug!("Map engine event loop stopped");
    engine
}

/// Control handle for a running engine.
///
/// Dropping the handle stops the engine: the watch is cancelled, the refresh
/// interval stops and the surface is torn down.
pub struct EngineHandle<H: EngineHost> {
    cancel: CancellationToken,
    cancel_on_drop: DropGuard,
    control: LocationControl,
    refresh: RefreshHandle,
    engine_task: JoinHandle<MapEngine<H>>,
    driver_task: JoinHandle<()>,
    scheduler_task: JoinHandle<()>,
}

impl<H: EngineHost> EngineHandle<H> {
    /// Abandon the current location episode and acquire again.
    pub fn retry_location(&self) -> bool {
        self.control.retry()
    }

    /// Refresh overlays now (dropped if a fetch is in flight).
    pub fn refresh_now(&self) -> bool {
        self.refresh.refresh_now()
    }

    pub fn refresh_stats(&self) -> RefreshStats {
        self.refresh.stats()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Token that stops the engine when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tear the engine down and wait for every task to stop.
    ///
    /// Returns the torn-down engine so the caller can inspect its host.
    pub async fn shutdown(self) -> Result<MapEngine<H>, JoinError> {
        info!("Shutting down map engine");
        let Self {
            cancel,
            cancel_on_drop,
            engine_task,
            driver_task,
            scheduler_task,
            ..
        } = self;
        cancel_on_drop.disarm();
        cancel.cancel();

        driver_task.await?;
        scheduler_task.await?;
        engine_task.await
    }
}
