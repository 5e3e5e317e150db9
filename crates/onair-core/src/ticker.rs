//! Live ticker
//!
//! A background task with three independent clocks:
//!
//! - **frame** (`frame_interval_ms`): advances a running auto transition
//! - **countdown** (`countdown_interval_ms`): decrements the countdown
//! - **health** (`health_interval_ms`): samples telemetry and logs
//!   threshold crossings
//!
//! The ticker owns exactly one task. Starting a running ticker does
//! nothing; stopping cancels the task and waits for it to exit.

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::StateManager;
use crate::telemetry::{SyntheticTelemetry, TelemetrySource};

/// Handle to the running ticker task
struct TickerTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Fixed-cadence driver for transitions, countdowns and health sampling
pub struct LiveTicker {
    manager: StateManager,
    task: Option<TickerTask>,
}

impl LiveTicker {
    /// Create a stopped ticker
    pub fn new(manager: StateManager) -> Self {
        Self {
            manager,
            task: None,
        }
    }

    /// Whether the ticker task is alive
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Start with synthetic telemetry seeded from the configuration
    ///
    /// Returns false if the ticker is already running or there is no
    /// tokio runtime to run on.
    pub fn start(&mut self) -> bool {
        let seed = self.manager.config().telemetry_seed;
        self.start_with(Box::new(SyntheticTelemetry::new(seed)))
    }

    /// Start with a custom telemetry source
    ///
    /// Returns false if the ticker is already running or there is no
    /// runtime.
    pub fn start_with(&mut self, telemetry: Box<dyn TelemetrySource>) -> bool {
        if self.is_running() {
            warn!("Live ticker already running");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("Live ticker not started: no tokio runtime");
            return false;
        };

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_ticker(
            self.manager.clone(),
            telemetry,
            cancel.clone(),
        ));
        self.task = Some(TickerTask { handle, cancel });
        true
    }

    /// Stop the ticker and wait for its task to exit
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!("Live ticker task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.cancel();
        }
    }
}

/// Ticker loop
async fn run_ticker(
    manager: StateManager,
    mut telemetry: Box<dyn TelemetrySource>,
    cancel: CancellationToken,
) {
    let config = manager.config();
    let start = Instant::now();

    // First tick one period in, not immediately
    let mut frame = interval_at(start + config.frame_interval(), config.frame_interval());
    let mut countdown = interval_at(
        start + config.countdown_interval(),
        config.countdown_interval(),
    );
    let mut health = interval_at(start + config.health_interval(), config.health_interval());
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
    health.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Live ticker started (frame {}ms, countdown {}ms, health {}ms)",
        config.frame_interval_ms, config.countdown_interval_ms, config.health_interval_ms
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = frame.tick() => {
                manager.tick_transition();
            }
            _ = countdown.tick() => {
                manager.tick_countdown();
            }
            _ = health.tick() => {
                let sample = telemetry.sample();
                debug!(
                    "Health sample: cpu={:.1}% dropped={} peak={:.1}%",
                    sample.cpu_load, sample.dropped_frames, sample.audio_peak
                );
                manager.record_health(sample);
            }
        }
    }

    info!("Live ticker stopped");
}
