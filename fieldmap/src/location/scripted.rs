//! Scripted location provider.
//!
//! Replays a canned single-shot result and a timed sequence of watch
//! readings. Used by the headless CLI host and by tests; it also counts
//! requests and live watches so the one-episode-at-a-time rule can be
//! observed from outside.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::AcquisitionOptions;
use super::error::LocationError;
use super::provider::{LocationProvider, WatchHandle, WatchReading, WatchSubscription};
use super::state::Fix;

/// One scripted watch reading, emitted `after` the previous one.
#[derive(Debug, Clone)]
pub struct WatchStep {
    /// Delay since the previous step (or since the watch started).
    pub after: Duration,
    /// The reading to deliver.
    pub reading: WatchReading,
}

impl WatchStep {
    /// A successful reading.
    pub fn fix(after: Duration, fix: Fix) -> Self {
        Self {
            after,
            reading: Ok(fix),
        }
    }

    /// A watch error.
    pub fn error(after: Duration, error: LocationError) -> Self {
        Self {
            after,
            reading: Err(error),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicUsize,
    watches_started: AtomicUsize,
    active_watches: AtomicUsize,
}

/// Location provider that replays a script.
#[derive(Debug, Clone)]
pub struct ScriptedLocationProvider {
    single_shot: Result<Fix, LocationError>,
    request_delay: Duration,
    watch_steps: Vec<WatchStep>,
    counters: Arc<Counters>,
}

impl ScriptedLocationProvider {
    /// Provider whose single-shot request resolves to `single_shot`.
    pub fn new(single_shot: Result<Fix, LocationError>) -> Self {
        Self {
            single_shot,
            request_delay: Duration::ZERO,
            watch_steps: Vec::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Delay the single-shot result.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Readings delivered by every watch, in order.
    pub fn with_watch_steps(mut self, steps: Vec<WatchStep>) -> Self {
        self.watch_steps = steps;
        self
    }

    /// Number of single-shot requests issued.
    pub fn request_count(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// Number of watches started.
    pub fn watch_count(&self) -> usize {
        self.counters.watches_started.load(Ordering::SeqCst)
    }

    /// Number of watches still running.
    pub fn active_watches(&self) -> usize {
        self.counters.active_watches.load(Ordering::SeqCst)
    }
}

impl LocationProvider for ScriptedLocationProvider {
    async fn request_once(&self, _options: AcquisitionOptions) -> Result<Fix, LocationError> {
        self.counters.requests.fetch_add(1, Ordering::SeqCst);
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        self.single_shot.clone()
    }

    fn watch(&self, _options: AcquisitionOptions) -> Result<WatchSubscription, LocationError> {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(16);
        let steps = self.watch_steps.clone();
        let counters = Arc::clone(&self.counters);
        let cancelled = token.clone();

        counters.watches_started.fetch_add(1, Ordering::SeqCst);
        counters.active_watches.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            for step in steps {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(step.after) => {
                        if tx.send(step.reading).await.is_err() {
                            break;
                        }
                    }
                }
            }
            // Keep the stream open until the consumer lets go, like a real
            // sensor that simply stops producing better readings.
            cancelled.cancelled().await;
            counters.active_watches.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(WatchSubscription::new(WatchHandle::new(token), rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::location::LocationConfig;

    fn fix(accuracy_m: f64) -> Fix {
        Fix::now(GeoPoint::new(43.6, 1.4).unwrap(), accuracy_m)
    }

    #[tokio::test]
    async fn test_request_once_replays_result() {
        let provider = ScriptedLocationProvider::new(Ok(fix(25.0)));
        let options = LocationConfig::default().single_shot_options();

        let result = provider.request_once(options).await.unwrap();
        assert_eq!(result.accuracy_m, 25.0);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_request_once_replays_error() {
        let provider = ScriptedLocationProvider::new(Err(LocationError::PermissionDenied));
        let options = LocationConfig::default().single_shot_options();

        assert_eq!(
            provider.request_once(options).await,
            Err(LocationError::PermissionDenied)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_emits_steps_until_cancelled() {
        let provider = ScriptedLocationProvider::new(Ok(fix(120.0))).with_watch_steps(vec![
            WatchStep::fix(Duration::from_secs(1), fix(90.0)),
            WatchStep::error(Duration::from_secs(1), LocationError::PositionUnavailable),
        ]);
        let options = LocationConfig::default().watch_options();

        let mut watch = provider.watch(options).unwrap();
        assert_eq!(provider.active_watches(), 1);

        assert_eq!(watch.next().await.unwrap().unwrap().accuracy_m, 90.0);
        assert_eq!(
            watch.next().await.unwrap(),
            Err(LocationError::PositionUnavailable)
        );

        watch.cancel();
        // Let the producer observe the cancellation
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.watch_count(), 1);
    }
}
