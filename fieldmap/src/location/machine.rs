//! Location sensor state machine.
//!
//! [`LocationSensor`] runs the accuracy-refinement protocol without touching
//! any hardware or timers. Results are pushed in as [`SensorEvent`]s and
//! processing yields [`SensorCommand`]s for a driver to execute. This keeps
//! the protocol testable in isolation; see [`super::driver`] for the async
//! side.
//!
//! # Protocol
//!
//! 1. `request()` starts an episode with one high-accuracy single-shot request.
//! 2. A single-shot fix within the settle threshold settles immediately.
//!    Anything coarser becomes the baseline and a watch starts, bounded by the
//!    refinement window.
//! 3. A watch reading within the settle threshold, or decisively better than
//!    the baseline, settles with that reading.
//! 4. Window expiry or a watch error settles with the baseline.
//! 5. A single-shot error fails the episode. There is no automatic retry.
//!
//! # Episodes
//!
//! Each `request()`/`retry()` opens a new numbered episode. Events carry the
//! episode they belong to; anything from a superseded episode is dropped, so
//! a late reading from a cancelled watch can never settle the current one.

use std::collections::VecDeque;
use std::time::Duration;

use super::config::{AcquisitionOptions, LocationConfig};
use super::error::LocationError;
use super::state::{Fix, Provenance, SensorState};

/// Monotonic acquisition episode number.
pub type EpisodeId = u64;

/// Results fed back into the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// The single-shot request finished.
    RequestResolved {
        episode: EpisodeId,
        result: Result<Fix, LocationError>,
    },
    /// The watch produced a reading.
    WatchUpdate { episode: EpisodeId, fix: Fix },
    /// The watch reported an error or ended.
    WatchFailed {
        episode: EpisodeId,
        error: LocationError,
    },
    /// The refinement window closed.
    WindowElapsed { episode: EpisodeId },
}

impl SensorEvent {
    /// Episode this event belongs to.
    pub fn episode(&self) -> EpisodeId {
        match self {
            Self::RequestResolved { episode, .. }
            | Self::WatchUpdate { episode, .. }
            | Self::WatchFailed { episode, .. }
            | Self::WindowElapsed { episode } => *episode,
        }
    }
}

/// Work the driver must perform on behalf of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorCommand {
    /// Issue one single-shot request.
    RequestOnce {
        episode: EpisodeId,
        options: AcquisitionOptions,
    },
    /// Start a continuous watch and close it after `window`.
    StartWatch {
        episode: EpisodeId,
        options: AcquisitionOptions,
        window: Duration,
    },
    /// Stop the watch belonging to `episode`.
    CancelWatch { episode: EpisodeId },
    /// Report a state transition to consumers.
    Publish(SensorState),
}

/// Accuracy-refinement state machine.
#[derive(Debug)]
pub struct LocationSensor {
    config: LocationConfig,
    state: SensorState,
    episode: EpisodeId,
    /// Episode whose watch is currently running, if any.
    watching: Option<EpisodeId>,
    events: VecDeque<SensorEvent>,
}

impl Default for LocationSensor {
    fn default() -> Self {
        Self::new(LocationConfig::default())
    }
}

impl LocationSensor {
    /// Create an idle sensor.
    pub fn new(config: LocationConfig) -> Self {
        Self {
            config,
            state: SensorState::Idle,
            episode: 0,
            watching: None,
            events: VecDeque::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Current episode number (0 before the first request).
    pub fn episode(&self) -> EpisodeId {
        self.episode
    }

    /// Returns true while a watch is running.
    pub fn is_watching(&self) -> bool {
        self.watching.is_some()
    }

    /// Configuration in use.
    pub fn config(&self) -> &LocationConfig {
        &self.config
    }

    /// Start the first acquisition episode.
    ///
    /// Only valid from `Idle`; use [`retry`](Self::retry) otherwise.
    pub fn request(&mut self) -> Vec<SensorCommand> {
        if self.state != SensorState::Idle {
            tracing::trace!(state = %self.state, "Location request ignored (not idle)");
            return Vec::new();
        }
        let mut commands = Vec::new();
        self.begin_episode(&mut commands);
        commands
    }

    /// Abandon the current episode (if any) and start a new one.
    pub fn retry(&mut self) -> Vec<SensorCommand> {
        let mut commands = Vec::new();
        self.stop_watch(&mut commands);
        self.begin_episode(&mut commands);
        commands
    }

    /// Stop everything and discard the current fix.
    pub fn teardown(&mut self) -> Vec<SensorCommand> {
        let mut commands = Vec::new();
        self.stop_watch(&mut commands);
        self.events.clear();
        self.state = SensorState::Idle;
        commands
    }

    /// Queue an event for the next [`process`](Self::process) call.
    pub fn push(&mut self, event: SensorEvent) {
        self.events.push_back(event);
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Drain the event queue, returning the resulting commands in order.
    pub fn process(&mut self) -> Vec<SensorCommand> {
        let mut commands = Vec::new();
        while let Some(event) = self.events.pop_front() {
            self.apply(event, &mut commands);
        }
        commands
    }

    /// Push one event and process the queue.
    pub fn handle(&mut self, event: SensorEvent) -> Vec<SensorCommand> {
        self.push(event);
        self.process()
    }

    fn begin_episode(&mut self, commands: &mut Vec<SensorCommand>) {
        self.episode += 1;
        self.state = SensorState::Acquiring;
        tracing::debug!(episode = self.episode, "Location acquisition started");

        commands.push(SensorCommand::RequestOnce {
            episode: self.episode,
            options: self.config.single_shot_options(),
        });
        commands.push(SensorCommand::Publish(self.state.clone()));
    }

    fn apply(&mut self, event: SensorEvent, commands: &mut Vec<SensorCommand>) {
        if event.episode() != self.episode {
            tracing::trace!(
                event_episode = event.episode(),
                current_episode = self.episode,
                "Dropping location event from superseded episode"
            );
            return;
        }

        let baseline = match &self.state {
            SensorState::Refining { baseline } => Some(baseline.clone()),
            _ => None,
        };

        match (event, baseline) {
            (SensorEvent::RequestResolved { result, .. }, None)
                if self.state == SensorState::Acquiring =>
            {
                self.on_single_shot(result, commands);
            }
            (SensorEvent::WatchUpdate { fix, .. }, Some(baseline)) => {
                if !fix.is_valid() {
                    tracing::trace!("Ignoring invalid watch reading");
                } else if self.qualifies(&fix, &baseline) {
                    tracing::debug!(
                        accuracy_m = fix.accuracy_m,
                        baseline_m = baseline.accuracy_m,
                        "Watch reading accepted"
                    );
                    self.stop_watch(commands);
                    self.settle(fix.with_provenance(Provenance::Refined), commands);
                } else {
                    tracing::trace!(
                        accuracy_m = fix.accuracy_m,
                        baseline_m = baseline.accuracy_m,
                        "Watch reading not good enough"
                    );
                }
            }
            (SensorEvent::WatchFailed { error, .. }, Some(baseline)) => {
                tracing::debug!(%error, "Watch failed, keeping initial fix");
                self.stop_watch(commands);
                self.settle(baseline, commands);
            }
            (SensorEvent::WindowElapsed { .. }, Some(baseline)) => {
                tracing::debug!(
                    accuracy_m = baseline.accuracy_m,
                    "Refinement window elapsed, keeping initial fix"
                );
                self.stop_watch(commands);
                self.settle(baseline, commands);
            }
            (event, _) => {
                tracing::trace!(state = %self.state, ?event, "Location event ignored in current state");
            }
        }
    }

    fn on_single_shot(
        &mut self,
        result: Result<Fix, LocationError>,
        commands: &mut Vec<SensorCommand>,
    ) {
        let fix = match result {
            Ok(fix) if fix.is_valid() => fix.with_provenance(Provenance::Coarse),
            Ok(_) => {
                tracing::debug!("Single-shot fix out of range, treating as unavailable");
                self.fail(LocationError::PositionUnavailable, commands);
                return;
            }
            Err(error) => {
                self.fail(error, commands);
                return;
            }
        };

        if fix.accuracy_m <= self.config.settle_accuracy_m {
            self.settle(fix, commands);
            return;
        }

        tracing::debug!(
            accuracy_m = fix.accuracy_m,
            window_secs = self.config.watch_window.as_secs(),
            "Initial fix is coarse, refining"
        );
        self.watching = Some(self.episode);
        self.state = SensorState::Refining { baseline: fix };
        commands.push(SensorCommand::StartWatch {
            episode: self.episode,
            options: self.config.watch_options(),
            window: self.config.watch_window,
        });
        commands.push(SensorCommand::Publish(self.state.clone()));
    }

    /// A reading settles refinement when it is within the settle threshold
    /// or at most `improvement_factor` of the baseline accuracy.
    fn qualifies(&self, fix: &Fix, baseline: &Fix) -> bool {
        fix.accuracy_m <= self.config.settle_accuracy_m
            || fix.accuracy_m <= baseline.accuracy_m * self.config.improvement_factor
    }

    fn settle(&mut self, fix: Fix, commands: &mut Vec<SensorCommand>) {
        tracing::info!(
            episode = self.episode,
            accuracy_m = fix.accuracy_m,
            provenance = %fix.provenance,
            quality = %fix.quality(self.config.good_accuracy_m),
            "Location settled"
        );
        self.state = SensorState::Settled(fix);
        commands.push(SensorCommand::Publish(self.state.clone()));
    }

    fn fail(&mut self, error: LocationError, commands: &mut Vec<SensorCommand>) {
        tracing::info!(episode = self.episode, %error, "Location acquisition failed");
        self.state = SensorState::Failed(error);
        commands.push(SensorCommand::Publish(self.state.clone()));
    }

    fn stop_watch(&mut self, commands: &mut Vec<SensorCommand>) {
        if let Some(episode) = self.watching.take() {
            commands.push(SensorCommand::CancelWatch { episode });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn fix(accuracy_m: f64) -> Fix {
        Fix::now(GeoPoint::new(52.52, 13.405).unwrap(), accuracy_m)
    }

    fn published(commands: &[SensorCommand]) -> Vec<SensorState> {
        commands
            .iter()
            .filter_map(|c| match c {
                SensorCommand::Publish(state) => Some(state.clone()),
                _ => None,
            })
            .collect()
    }

    fn started(accuracy_m: f64) -> LocationSensor {
        let mut sensor = LocationSensor::default();
        sensor.request();
        sensor.handle(SensorEvent::RequestResolved {
            episode: 1,
            result: Ok(fix(accuracy_m)),
        });
        sensor
    }

    #[test]
    fn test_request_enters_acquiring() {
        let mut sensor = LocationSensor::default();
        let commands = sensor.request();

        assert_eq!(sensor.state(), &SensorState::Acquiring);
        assert_eq!(sensor.episode(), 1);
        assert_eq!(
            commands[0],
            SensorCommand::RequestOnce {
                episode: 1,
                options: LocationConfig::default().single_shot_options(),
            }
        );
        assert_eq!(published(&commands), vec![SensorState::Acquiring]);
    }

    #[test]
    fn test_request_ignored_when_not_idle() {
        let mut sensor = LocationSensor::default();
        sensor.request();
        assert!(sensor.request().is_empty());
        assert_eq!(sensor.episode(), 1);
    }

    #[test]
    fn test_accurate_single_shot_settles_directly() {
        let sensor = started(30.0);

        let fix = sensor.state().settled_fix().expect("should settle");
        assert_eq!(fix.accuracy_m, 30.0);
        assert_eq!(fix.provenance, Provenance::Coarse);
        assert!(!sensor.is_watching());
    }

    #[test]
    fn test_settle_threshold_is_inclusive() {
        let sensor = started(50.0);
        assert!(sensor.state().settled_fix().is_some());
    }

    #[test]
    fn test_coarse_single_shot_starts_watch() {
        let mut sensor = LocationSensor::default();
        sensor.request();
        let commands = sensor.handle(SensorEvent::RequestResolved {
            episode: 1,
            result: Ok(fix(80.0)),
        });

        assert!(matches!(sensor.state(), SensorState::Refining { baseline } if baseline.accuracy_m == 80.0));
        assert!(sensor.is_watching());
        assert!(matches!(
            commands[0],
            SensorCommand::StartWatch { episode: 1, window, .. } if window == Duration::from_secs(10)
        ));
    }

    #[test]
    fn test_watch_update_within_threshold_settles() {
        // 120m initial, 40m reading inside the window
        let mut sensor = started(120.0);
        let commands = sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(40.0),
        });

        let settled = sensor.state().settled_fix().expect("should settle");
        assert_eq!(settled.accuracy_m, 40.0);
        assert_eq!(settled.provenance, Provenance::Refined);
        assert_eq!(commands[0], SensorCommand::CancelWatch { episode: 1 });
        assert!(!sensor.is_watching());
    }

    #[test]
    fn test_marginal_improvement_falls_back_to_baseline() {
        // 120m initial, watch only reaches 90m before the window closes
        let mut sensor = started(120.0);
        let commands = sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(90.0),
        });
        assert!(commands.is_empty());
        assert!(matches!(sensor.state(), SensorState::Refining { .. }));

        let commands = sensor.handle(SensorEvent::WindowElapsed { episode: 1 });
        let settled = sensor.state().settled_fix().expect("should settle");
        assert_eq!(settled.accuracy_m, 120.0);
        assert_eq!(settled.provenance, Provenance::Coarse);
        assert_eq!(commands[0], SensorCommand::CancelWatch { episode: 1 });
    }

    #[test]
    fn test_decisive_improvement_settles_above_threshold() {
        // 400m initial, 150m is better than half the baseline
        let mut sensor = started(400.0);
        sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(150.0),
        });
        assert_eq!(sensor.state().settled_fix().map(|f| f.accuracy_m), Some(150.0));
    }

    #[test]
    fn test_watch_error_falls_back_to_baseline() {
        let mut sensor = started(75.0);
        let commands = sensor.handle(SensorEvent::WatchFailed {
            episode: 1,
            error: LocationError::PositionUnavailable,
        });

        assert_eq!(sensor.state().settled_fix().map(|f| f.accuracy_m), Some(75.0));
        assert_eq!(commands[0], SensorCommand::CancelWatch { episode: 1 });
    }

    #[test]
    fn test_single_shot_errors_fail() {
        for error in [
            LocationError::PermissionDenied,
            LocationError::PositionUnavailable,
            LocationError::Timeout,
        ] {
            let mut sensor = LocationSensor::default();
            sensor.request();
            let commands = sensor.handle(SensorEvent::RequestResolved {
                episode: 1,
                result: Err(error.clone()),
            });

            assert_eq!(sensor.state(), &SensorState::Failed(error.clone()));
            assert_eq!(published(&commands), vec![SensorState::Failed(error)]);
            assert!(!sensor.is_watching());
        }
    }

    #[test]
    fn test_invalid_single_shot_fix_is_unavailable() {
        let mut sensor = LocationSensor::default();
        sensor.request();
        let mut bad = fix(10.0);
        bad.position.longitude = 200.0;
        sensor.handle(SensorEvent::RequestResolved {
            episode: 1,
            result: Ok(bad),
        });

        assert_eq!(
            sensor.state(),
            &SensorState::Failed(LocationError::PositionUnavailable)
        );
    }

    #[test]
    fn test_retry_cancels_watch_and_restarts() {
        let mut sensor = started(120.0);
        let commands = sensor.retry();

        assert_eq!(commands[0], SensorCommand::CancelWatch { episode: 1 });
        assert!(matches!(
            commands[1],
            SensorCommand::RequestOnce { episode: 2, .. }
        ));
        assert_eq!(sensor.state(), &SensorState::Acquiring);
        assert!(!sensor.is_watching());
    }

    #[test]
    fn test_retry_from_failed() {
        let mut sensor = LocationSensor::default();
        sensor.request();
        sensor.handle(SensorEvent::RequestResolved {
            episode: 1,
            result: Err(LocationError::Timeout),
        });

        let commands = sensor.retry();
        assert_eq!(sensor.state(), &SensorState::Acquiring);
        assert!(matches!(
            commands[0],
            SensorCommand::RequestOnce { episode: 2, .. }
        ));
    }

    #[test]
    fn test_events_from_superseded_episode_are_dropped() {
        let mut sensor = started(120.0);
        sensor.retry();

        // Late reading from the cancelled watch
        let commands = sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(5.0),
        });
        assert!(commands.is_empty());
        assert_eq!(sensor.state(), &SensorState::Acquiring);

        // Late single-shot result from episode 1
        sensor.handle(SensorEvent::RequestResolved {
            episode: 1,
            result: Ok(fix(5.0)),
        });
        assert_eq!(sensor.state(), &SensorState::Acquiring);
    }

    #[test]
    fn test_settled_ignores_further_watch_events() {
        let mut sensor = started(120.0);
        sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(40.0),
        });
        let commands = sensor.handle(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(3.0),
        });

        assert!(commands.is_empty());
        assert_eq!(sensor.state().settled_fix().map(|f| f.accuracy_m), Some(40.0));
    }

    #[test]
    fn test_queue_processes_in_order() {
        let mut sensor = LocationSensor::default();
        sensor.request();
        sensor.push(SensorEvent::RequestResolved {
            episode: 1,
            result: Ok(fix(200.0)),
        });
        sensor.push(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(150.0),
        });
        sensor.push(SensorEvent::WatchUpdate {
            episode: 1,
            fix: fix(45.0),
        });
        assert_eq!(sensor.pending(), 3);

        let commands = sensor.process();
        assert_eq!(sensor.pending(), 0);
        assert_eq!(sensor.state().settled_fix().map(|f| f.accuracy_m), Some(45.0));

        let states = published(&commands);
        assert!(matches!(states[0], SensorState::Refining { .. }));
        assert!(matches!(states[1], SensorState::Settled(_)));
    }

    #[test]
    fn test_teardown_cancels_watch_and_discards_fix() {
        let mut sensor = started(120.0);
        let commands = sensor.teardown();

        assert_eq!(commands, vec![SensorCommand::CancelWatch { episode: 1 }]);
        assert_eq!(sensor.state(), &SensorState::Idle);
    }
}
