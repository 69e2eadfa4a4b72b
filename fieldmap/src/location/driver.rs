//! Async driver for the location state machine.
//!
//! Owns the provider and executes the commands produced by
//! [`LocationSensor`]: spawning single-shot requests under a timeout,
//! starting and cancelling watches, arming the refinement window and
//! publishing state transitions. Events flow back into the sensor in the
//! order they arrive.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::config::LocationConfig;
use super::error::LocationError;
use super::machine::{EpisodeId, LocationSensor, SensorCommand, SensorEvent};
use super::provider::{LocationProvider, WatchReading, WatchSubscription};
use super::state::SensorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlMessage {
    Request,
    Retry,
}

/// Cloneable handle for asking the driver to (re)acquire a position.
#[derive(Debug, Clone)]
pub struct LocationControl {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl LocationControl {
    /// Start the first acquisition. Ignored unless the sensor is idle.
    ///
    /// Returns false if the driver has stopped.
    pub fn request(&self) -> bool {
        self.tx.send(ControlMessage::Request).is_ok()
    }

    /// Abandon the current episode and start over.
    ///
    /// Returns false if the driver has stopped.
    pub fn retry(&self) -> bool {
        self.tx.send(ControlMessage::Retry).is_ok()
    }
}

struct ActiveWatch {
    episode: EpisodeId,
    subscription: WatchSubscription,
}

/// Drives a [`LocationSensor`] against a [`LocationProvider`].
pub struct LocationDriver<P: LocationProvider> {
    provider: Arc<P>,
    sensor: LocationSensor,
    status_tx: mpsc::Sender<SensorState>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    events_tx: mpsc::UnboundedSender<SensorEvent>,
    events_rx: mpsc::UnboundedReceiver<SensorEvent>,
    watch: Option<ActiveWatch>,
    window_deadline: Option<(EpisodeId, Instant)>,
    pending_request: Option<JoinHandle<()>>,
}

impl<P: LocationProvider> LocationDriver<P> {
    /// Create a driver and the control handle that feeds it.
    ///
    /// State transitions are sent on `status_tx`.
    pub fn new(
        provider: Arc<P>,
        config: LocationConfig,
        status_tx: mpsc::Sender<SensorState>,
    ) -> (Self, LocationControl) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let driver = Self {
            provider,
            sensor: LocationSensor::new(config),
            status_tx,
            control_rx,
            events_tx,
            events_rx,
            watch: None,
            window_deadline: None,
            pending_request: None,
        };

        (driver, LocationControl { tx: control_tx })
    }

    /// Spawn the driver loop. It runs until `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run the driver loop on the current task.
    pub async fn run(mut self, cancel: CancellationToken) {
        debug!("Location driver started");

        loop {
            let deadline = self.window_deadline;

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(message) = self.control_rx.recv() => {
                    let commands = match message {
                        ControlMessage::Request => self.sensor.request(),
                        ControlMessage::Retry => {
                            info!("Retrying location acquisition");
                            self.sensor.retry()
                        }
                    };
                    self.execute(commands).await;
                }

                Some(event) = self.events_rx.recv() => {
                    self.dispatch(event).await;
                }

                (episode, reading) = next_watch_reading(&mut self.watch) => {
                    let event = match reading {
                        Some(Ok(fix)) => SensorEvent::WatchUpdate { episode, fix },
                        Some(Err(error)) => SensorEvent::WatchFailed { episode, error },
                        None => {
                            debug!(episode, "Location watch ended by provider");
                            self.watch = None;
                            self.window_deadline = None;
                            SensorEvent::WatchFailed {
                                episode,
                                error: LocationError::PositionUnavailable,
                            }
                        }
                    };
                    self.dispatch(event).await;
                }

                episode = window_expiry(deadline) => {
                    self.window_deadline = None;
                    self.dispatch(SensorEvent::WindowElapsed { episode }).await;
                }
            }
        }

        self.shutdown();
        debug!("Location driver stopped");
    }

    async fn dispatch(&mut self, event: SensorEvent) {
        self.sensor.push(event);
        let commands = self.sensor.process();
        self.execute(commands).await;
    }

    async fn execute(&mut self, commands: Vec<SensorCommand>) {
        for command in commands {
            match command {
                SensorCommand::RequestOnce { episode, options } => {
                    if let Some(previous) = self.pending_request.take() {
                        previous.abort();
                    }

                    let provider = Arc::clone(&self.provider);
                    let events = self.events_tx.clone();
                    self.pending_request = Some(tokio::spawn(async move {
                        let result =
                            match tokio::time::timeout(options.timeout, provider.request_once(options))
                                .await
                            {
                                Ok(result) => result,
                                Err(_) => Err(LocationError::Timeout),
                            };
                        let _ = events.send(SensorEvent::RequestResolved { episode, result });
                    }));
                }
                SensorCommand::StartWatch {
                    episode,
                    options,
                    window,
                } => match self.provider.watch(options) {
                    Ok(subscription) => {
                        trace!(episode, window_secs = window.as_secs(), "Location watch started");
                        self.watch = Some(ActiveWatch {
                            episode,
                            subscription,
                        });
                        self.window_deadline = Some((episode, Instant::now() + window));
                    }
                    Err(error) => {
                        debug!(episode, %error, "Location watch could not start");
                        let _ = self
                            .events_tx
                            .send(SensorEvent::WatchFailed { episode, error });
                    }
                },
                SensorCommand::CancelWatch { episode } => {
                    if self.watch.as_ref().is_some_and(|w| w.episode == episode) {
                        if let Some(active) = self.watch.take() {
                            active.subscription.cancel();
                            trace!(episode, "Location watch cancelled");
                        }
                    }
                    if self.window_deadline.is_some_and(|(e, _)| e == episode) {
                        self.window_deadline = None;
                    }
                }
                SensorCommand::Publish(state) => {
                    if self.status_tx.send(state).await.is_err() {
                        trace!("Location status receiver dropped");
                    }
                }
            }
        }
    }

    fn shutdown(&mut self) {
        // Teardown only ever yields CancelWatch; the watch is dropped below.
        let _ = self.sensor.teardown();
        if let Some(active) = self.watch.take() {
            active.subscription.cancel();
        }
        self.window_deadline = None;
        if let Some(request) = self.pending_request.take() {
            request.abort();
        }
    }
}

/// Resolves with the next reading of the active watch; pends forever when no
/// watch is running.
async fn next_watch_reading(watch: &mut Option<ActiveWatch>) -> (EpisodeId, Option<WatchReading>) {
    match watch {
        Some(active) => (active.episode, active.subscription.next().await),
        None => std::future::pending().await,
    }
}

async fn window_expiry(deadline: Option<(EpisodeId, Instant)>) -> EpisodeId {
    match deadline {
        Some((episode, at)) => {
            tokio::time::sleep_until(at).await;
            episode
        }
        None => std::future::pending().await,
    }
}
