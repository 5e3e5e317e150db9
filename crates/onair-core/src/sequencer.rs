//! Macro automation sequencer
//!
//! Runs one macro's actions strictly in order on the calling task. WAIT and
//! AUDIO_FADE suspend only this task; every state change goes through the
//! [`StateManager`] as a single locked command, so the switcher, the ticker
//! and external commands keep running while a macro waits.
//!
//! The sequencer is crate-private: every run goes through
//! [`StateManager::run_macro`] or [`StateManager::trigger_macro`], which
//! claim the single-flight slot first.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::audio::ChannelId;
use crate::error::SequencerError;
use crate::macros::{validate_level, Macro, MacroAction};
use crate::state::StateManager;

/// Ease-in-out (quadratic) curve over `t` in 0.0..=1.0
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Level of fade sample `i` of `samples` from `start` to `target`
///
/// The last sample is exactly `target`; every other sample lies between
/// the two endpoints.
pub fn fade_sample(start: f64, target: f64, i: u64, samples: u64) -> f64 {
    if i >= samples {
        return target;
    }
    let eased = ease_in_out(i as f64 / samples as f64);
    let level = start + (target - start) * eased;
    level.clamp(start.min(target), start.max(target))
}

/// Executes macro actions against a state manager
pub(crate) struct MacroSequencer {
    manager: StateManager,
    frame: Duration,
}

impl MacroSequencer {
    /// Create a sequencer sampling fades at the configured frame interval
    pub(crate) fn new(manager: StateManager) -> Self {
        let frame = manager.config().frame_interval();
        Self { manager, frame }
    }

    /// Run every action in order
    ///
    /// Stops at the first failing action and returns its index with the
    /// error; later actions are not run.
    pub(crate) async fn execute(
        &self,
        definition: &Macro,
        cancel: &CancellationToken,
    ) -> Result<(), (usize, SequencerError)> {
        for (step, action) in definition.actions.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err((step, SequencerError::Cancelled));
            }
            debug!(
                "Macro '{}' step {}: {:?}",
                definition.label,
                step + 1,
                action
            );
            self.apply(action, cancel).await.map_err(|e| (step, e))?;
        }
        Ok(())
    }

    async fn apply(&self, action: &MacroAction, cancel: &CancellationToken) -> Result<(), SequencerError> {
        match action {
            MacroAction::Wait { ms } => self.pause(Duration::from_millis(*ms), cancel).await,
            MacroAction::CutToSource { source_id } => {
                self.manager.set_program(source_id);
                Ok(())
            }
            MacroAction::PvwSource { source_id } => {
                self.manager.set_preview(source_id);
                Ok(())
            }
            MacroAction::AudioFade {
                channel_id,
                target_level,
                duration_ms,
            } => self.fade(channel_id, *target_level, *duration_ms, cancel).await,
            MacroAction::AudioMute { channel_id } => {
                self.manager.toggle_mute(channel_id);
                Ok(())
            }
            MacroAction::GfxUpdate { overlay_id, active } => {
                self.manager.set_overlay(overlay_id, *active);
                Ok(())
            }
        }
    }

    /// Ramp a channel to `target`, one sample per frame
    async fn fade(
        &self,
        channel: &ChannelId,
        target: f64,
        duration_ms: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<(), SequencerError> {
        validate_level(target)?;

        let Some(start) = self.manager.channel_level(channel) else {
            debug!("Fade skipped: unknown channel {}", channel);
            return Ok(());
        };

        let duration_ms = match duration_ms {
            Some(ms) if ms > 0 => ms,
            _ => {
                self.manager.set_level(channel, target);
                return Ok(());
            }
        };

        let frame_ms = (self.frame.as_millis() as u64).max(1);
        let samples = duration_ms.div_ceil(frame_ms).max(1);

        // Sample index follows elapsed time, so a late tick catches up
        let started = Instant::now();
        let mut clock = interval_at(started + self.frame, self.frame);
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut i = 0;
        while i < samples {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SequencerError::Cancelled),
                _ = clock.tick() => {}
            }
            let elapsed_ms = started.elapsed().as_millis() as u64;
            i = (elapsed_ms / frame_ms).clamp(i + 1, samples);
            self.manager
                .set_level(channel, fade_sample(start, target, i, samples));
        }
        Ok(())
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), SequencerError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(SequencerError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChannel;
    use crate::config::ControlConfig;
    use crate::persistence::PersistedState;

    fn manager() -> StateManager {
        StateManager::new(
            ControlConfig::default(),
            PersistedState {
                audio_channels: vec![AudioChannel::new("mic", None)],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(0.5), 0.5);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert_eq!(ease_in_out(0.25), 0.125);
        assert_eq!(ease_in_out(0.75), 0.875);
    }

    #[test]
    fn test_ease_monotonic() {
        let samples: Vec<f64> = (0..=100).map(|i| ease_in_out(i as f64 / 100.0)).collect();
        assert!(samples.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_fade_sample_last_is_exact() {
        assert_eq!(fade_sample(0.1, 0.3, 10, 10), 0.3);
        assert_eq!(fade_sample(1.0, 0.0, 3, 3), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_reaches_target() {
        let mgr = manager();
        mgr.set_level(&"mic".into(), 1.0);
        let sequencer = MacroSequencer::new(mgr.clone());
        let cancel = CancellationToken::new();

        sequencer
            .fade(&"mic".into(), 0.25, Some(500), &cancel)
            .await
            .unwrap();

        assert_eq!(mgr.channel_level(&"mic".into()), Some(0.25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_without_duration_is_instant() {
        let mgr = manager();
        let sequencer = MacroSequencer::new(mgr.clone());
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();

        sequencer
            .fade(&"mic".into(), 0.5, None, &cancel)
            .await
            .unwrap();

        assert_eq!(mgr.channel_level(&"mic".into()), Some(0.5));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_unknown_channel_is_noop() {
        let sequencer = MacroSequencer::new(manager());
        let cancel = CancellationToken::new();
        assert!(sequencer
            .fade(&"ghost".into(), 0.5, Some(100), &cancel)
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_invalid_target_fails() {
        let sequencer = MacroSequencer::new(manager());
        let cancel = CancellationToken::new();
        let result = sequencer.fade(&"mic".into(), 2.0, Some(100), &cancel).await;
        assert!(matches!(result, Err(SequencerError::InvalidLevel { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_keeps_to_duration_after_stall() {
        let mgr = manager();
        mgr.set_level(&"mic".into(), 0.0);
        let sequencer = MacroSequencer::new(mgr.clone());
        let cancel = CancellationToken::new();
        let fade = tokio::spawn(async move {
            sequencer
                .fade(&"mic".into(), 1.0, Some(500), &cancel)
                .await
        });
        tokio::task::yield_now().await;

        // One jump over many frames, then the remainder of the duration
        tokio::time::advance(Duration::from_millis(300)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let midway = mgr.channel_level(&"mic".into()).unwrap();
        assert!(midway > 0.5 && midway < 1.0);

        tokio::time::advance(Duration::from_millis(200)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(fade.is_finished());
        assert_eq!(mgr.channel_level(&"mic".into()), Some(1.0));
        assert!(fade.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_aborts() {
        let sequencer = MacroSequencer::new(manager());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = sequencer.pause(Duration::from_secs(10), &cancel).await;
        assert_eq!(result, Err(SequencerError::Cancelled));
    }
}
