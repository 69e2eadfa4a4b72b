//! Periodic snapshot refresh.
//!
//! The scheduler fetches once immediately, then on every interval tick, and
//! on demand through [`RefreshHandle::refresh_now`]. An in-flight flag keeps
//! at most one fetch outstanding; requests arriving while a fetch runs are
//! dropped, not queued. Cancelling the token stops the interval and discards
//! the result of a fetch that is still running.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::overlay::OverlaySnapshot;

use super::config::RefreshConfig;
use super::error::FetchError;
use super::source::OverlaySource;
use super::wire::OverlayLists;

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A complete snapshot.
    Snapshot(Arc<OverlaySnapshot>),
    /// The attempt failed; rendered overlays stay as they are.
    Failed { attempt: u64, error: FetchError },
}

/// Refresh counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Requests dropped because a fetch was already in flight.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RefreshStats {
        RefreshStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Handle for requesting refreshes and reading counters.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    trigger_tx: mpsc::UnboundedSender<()>,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl RefreshHandle {
    /// Ask for an immediate refresh. Dropped if a fetch is in flight.
    ///
    /// Returns false if the scheduler has stopped.
    pub fn refresh_now(&self) -> bool {
        self.trigger_tx.send(()).is_ok()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RefreshStats {
        self.counters.snapshot()
    }
}

/// Fetches all three lists concurrently and assembles a snapshot.
pub async fn fetch_snapshot<S: OverlaySource>(
    source: &S,
    version: u64,
) -> Result<OverlaySnapshot, FetchError> {
    let (incidents, geofences, persons) = tokio::try_join!(
        source.list_incidents(),
        source.list_geofences(),
        source.list_tracked_persons()
    )?;

    let lists = OverlayLists {
        incidents,
        geofences,
        persons,
    };
    Ok(lists.into_snapshot(version))
}

/// Periodic refresh daemon.
pub struct RefreshScheduler<S: OverlaySource> {
    source: Arc<S>,
    config: RefreshConfig,
    outcome_tx: mpsc::Sender<RefreshOutcome>,
    trigger_rx: mpsc::UnboundedReceiver<()>,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
    version: u64,
}

impl<S: OverlaySource> RefreshScheduler<S> {
    /// Create a scheduler and its handle. Outcomes are sent on `outcome_tx`.
    pub fn new(
        source: Arc<S>,
        config: RefreshConfig,
        outcome_tx: mpsc::Sender<RefreshOutcome>,
    ) -> (Self, RefreshHandle) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let handle = RefreshHandle {
            trigger_tx,
            in_flight: Arc::clone(&in_flight),
            counters: Arc::clone(&counters),
        };

        let scheduler = Self {
            source,
            config,
            outcome_tx,
            trigger_rx,
            in_flight,
            counters,
            version: 0,
        };

        (scheduler, handle)
    }

    /// Spawn the scheduler loop. It runs until `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run the scheduler loop on the current task.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Overlay refresh scheduler started"
        );

        // The first tick completes immediately: fetch on mount.
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Overlay refresh scheduler shutting down");
                    break;
                }

                _ = interval.tick() => self.trigger(&cancel, "interval"),

                Some(()) = self.trigger_rx.recv() => self.trigger(&cancel, "manual"),
            }
        }
    }

    fn trigger(&mut self, cancel: &CancellationToken, reason: &'static str) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(reason, "Refresh already in flight, request dropped");
            return;
        }

        self.version += 1;
        let version = self.version;
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        debug!(reason, version, "Refreshing overlays");

        let source = Arc::clone(&self.source);
        let outcome_tx = self.outcome_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => None,
                result = fetch_snapshot(&*source, version) => Some(result),
            };
            in_flight.store(false, Ordering::Release);

            let outcome = match result {
                None => {
                    trace!(version, "Refresh abandoned at shutdown");
                    return;
                }
                Some(Ok(snapshot)) => {
                    counters.successes.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        version,
                        entities = snapshot.len(),
                        dropped = snapshot.dropped(),
                        "Overlay snapshot fetched"
                    );
                    RefreshOutcome::Snapshot(Arc::new(snapshot))
                }
                Some(Err(error)) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(attempt = version, error = %error, "Overlay refresh failed");
                    RefreshOutcome::Failed {
                        attempt: version,
                        error,
                    }
                }
            };

            if cancel.is_cancelled() {
                trace!(version, "Refresh result discarded after shutdown");
                return;
            }
            if outcome_tx.send(outcome).await.is_err() {
                trace!("Refresh outcome receiver dropped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::refresh::source::StaticOverlaySource;
    use crate::refresh::wire::{IncidentRecord, RecordId};
    use crate::overlay::Severity;

    fn incident(id: i64) -> IncidentRecord {
        IncidentRecord {
            id: Some(RecordId::Number(id)),
            latitude: Some(1.0),
            longitude: Some(2.0),
            severity: Some(Severity::Medium),
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    fn spawn(
        source: StaticOverlaySource,
        interval: Duration,
    ) -> (RefreshHandle, mpsc::Receiver<RefreshOutcome>, CancellationToken) {
        let (tx, rx) = mpsc::channel(8);
        let (scheduler, handle) = RefreshScheduler::new(
            Arc::new(source),
            RefreshConfig::default().with_interval(interval),
            tx,
        );
        let cancel = CancellationToken::new();
        scheduler.start(cancel.clone());
        (handle, rx, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_on_interval() {
        let source = StaticOverlaySource::new();
        source.set_incidents(vec![incident(1)]);
        let (handle, mut outcomes, _cancel) = spawn(source.clone(), Duration::from_secs(300));

        match outcomes.recv().await {
            Some(RefreshOutcome::Snapshot(snapshot)) => {
                assert_eq!(snapshot.version(), 1);
                assert_eq!(snapshot.len(), 1);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }

        let started = tokio::time::Instant::now();
        match outcomes.recv().await {
            Some(RefreshOutcome::Snapshot(snapshot)) => assert_eq!(snapshot.version(), 2),
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_secs(299));
        assert_eq!(handle.stats().successes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_while_in_flight_is_dropped() {
        let source = StaticOverlaySource::new().with_delay(Duration::from_secs(5));
        let (handle, mut outcomes, _cancel) = spawn(source.clone(), Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.is_in_flight());
        handle.refresh_now();
        handle.refresh_now();

        assert!(matches!(
            outcomes.recv().await,
            Some(RefreshOutcome::Snapshot(_))
        ));
        assert_eq!(source.fetch_count(), 1);

        let stats = handle.stats();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.dropped, 2);
        assert!(!handle.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_once() {
        let source = StaticOverlaySource::new();
        source.set_failure(Some(FetchError::Transport("connection refused".to_string())));
        let (handle, mut outcomes, _cancel) = spawn(source, Duration::from_secs(300));

        assert!(matches!(
            outcomes.recv().await,
            Some(RefreshOutcome::Failed { attempt: 1, error: FetchError::Transport(_) })
        ));
        assert_eq!(handle.stats().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_result() {
        let source = StaticOverlaySource::new().with_delay(Duration::from_secs(5));
        let (handle, mut outcomes, cancel) = spawn(source, Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.is_in_flight());
        cancel.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(outcomes.try_recv().is_err());
        assert!(!handle.refresh_now());
    }
}
