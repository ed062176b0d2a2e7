//! Experiment elapsed time.

use tokio::sync::watch;
use tokio::time::{Duration, Instant};

use rf_core::SCHEDULE_EPSILON;

use crate::control::{ControlState, ExperimentControl};

/// Experiment elapsed time: wall-clock seconds since the run started,
/// excluding pauses. Schedules are laid out in protocol time, which is
/// elapsed time scaled by the fast-forward factor.
#[derive(Debug, Clone)]
pub struct RunClock {
    started: Instant,
    /// Paused time already accumulated when the run started.
    baseline: Duration,
    speed: f64,
    control: ExperimentControl,
}

impl RunClock {
    pub fn start(speed: f64, control: ExperimentControl) -> Self {
        let started = Instant::now();
        Self {
            started,
            baseline: control.paused_for(started),
            speed,
            control,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn eet(&self) -> f64 {
        let now = Instant::now();
        let paused = self.control.paused_for(now).saturating_sub(self.baseline);
        let active = now.saturating_duration_since(self.started).saturating_sub(paused);
        active.as_secs_f64()
    }

    /// Position in the compiled schedule, in seconds.
    pub fn protocol_time(&self) -> f64 {
        self.eet() * self.speed
    }

    /// Sleep until `protocol_time() >= target`.
    ///
    /// While paused the clock stands still; the remaining delay is
    /// recomputed whenever the pause state changes.
    pub async fn sleep_until(&self, target: f64) {
        let mut rx = self.control.subscribe();
        loop {
            if !wait_unpaused(&mut rx).await {
                return;
            }
            let remaining = target - self.protocol_time();
            if remaining <= SCHEDULE_EPSILON {
                return;
            }
            let wall = wall_delay(remaining / self.speed);
            tokio::select! {
                _ = tokio::time::sleep(wall) => {}
                changed = rx.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep(wall).await;
                        return;
                    }
                }
            }
        }
    }

    pub async fn sleep(&self, secs: f64) {
        self.sleep_until(self.protocol_time() + secs).await;
    }
}

/// Delays too long for `Duration` saturate; tokio treats them as far future.
fn wall_delay(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// `false` when the controller is gone.
async fn wait_unpaused(rx: &mut watch::Receiver<ControlState>) -> bool {
    rx.wait_for(|state| !state.paused).await.is_ok()
}
