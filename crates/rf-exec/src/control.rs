//! Cancel and pause, from outside a running experiment.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

/// Pause count from which the user is warned about timing.
const PAUSE_WARN_COUNT: u32 = 3;

/// Flags shared between a run and whoever controls it.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub cancelled: bool,
    pub paused: bool,
    pub pause_count: u32,
    pausable: bool,
    paused_since: Option<Instant>,
    paused_total: Duration,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            cancelled: false,
            paused: false,
            pause_count: 0,
            pausable: true,
            paused_since: None,
            paused_total: Duration::ZERO,
        }
    }
}

impl ControlState {
    /// Time spent paused up to `now`, including a pause still in progress.
    pub fn paused_for(&self, now: Instant) -> Duration {
        let current = self
            .paused_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        self.paused_total + current
    }
}

/// Cheap to clone; every clone controls the same experiment.
#[derive(Debug, Clone, Default)]
pub struct ExperimentControl {
    tx: Arc<watch::Sender<ControlState>>,
}

impl ExperimentControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.tx.send_if_modified(|state| {
            if state.cancelled {
                return false;
            }
            info!("Cancelling experiment");
            state.cancelled = true;
            true
        });
    }

    /// Put every component in its base state until [`resume`](Self::resume).
    /// No effect on fast-forward runs.
    pub fn pause(&self) {
        self.tx.send_if_modified(|state| {
            if state.paused || state.cancelled {
                return false;
            }
            if !state.pausable {
                warn!("Pausing a fast-forward run has no effect");
                return false;
            }
            state.paused = true;
            state.paused_since = Some(Instant::now());
            state.pause_count += 1;
            if state.pause_count >= PAUSE_WARN_COUNT {
                warn!(
                    "Experiment paused {} times; procedure timing may be affected",
                    state.pause_count
                );
            }
            true
        });
    }

    pub fn resume(&self) {
        self.tx.send_if_modified(|state| {
            if !state.paused {
                return false;
            }
            let now = Instant::now();
            if let Some(since) = state.paused_since.take() {
                state.paused_total += now.saturating_duration_since(since);
            }
            state.paused = false;
            true
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().cancelled
    }

    pub fn is_paused(&self) -> bool {
        self.tx.borrow().paused
    }

    pub fn pause_count(&self) -> u32 {
        self.tx.borrow().pause_count
    }

    pub fn paused_for(&self, now: Instant) -> Duration {
        self.tx.borrow().paused_for(now)
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.tx.subscribe()
    }

    pub(crate) fn set_pausable(&self, pausable: bool) {
        self.tx.send_modify(|state| state.pausable = pausable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    async fn paused_time_accumulates() {
        let control = ExperimentControl::new();
        let start = Instant::now();

        control.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(control.paused_for(Instant::now()), Duration::from_secs(5));
        control.resume();

        tokio::time::advance(Duration::from_secs(5)).await;
        control.pause();
        tokio::time::advance(Duration::from_secs(2)).await;
        control.resume();

        assert_eq!(control.paused_for(Instant::now()), Duration::from_secs(7));
        assert_eq!(Instant::now() - start, Duration::from_secs(12));
        assert_eq!(control.pause_count(), 2);
    }

    #[traced_test]
    #[test]
    fn repeated_pauses_warn() {
        let control = ExperimentControl::new();
        for _ in 0..3 {
            control.pause();
            control.resume();
        }
        assert!(logs_contain("timing may be affected"));
    }

    #[traced_test]
    #[test]
    fn unpausable_runs_ignore_pause() {
        let control = ExperimentControl::new();
        control.set_pausable(false);
        control.pause();
        assert!(!control.is_paused());
        assert!(logs_contain("has no effect"));
    }

    #[test]
    fn cancel_is_sticky() {
        let control = ExperimentControl::new();
        let other = control.clone();
        other.cancel();
        assert!(control.is_cancelled());
        control.pause();
        assert!(!control.is_paused());
    }
}
