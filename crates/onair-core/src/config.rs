//! Control plane configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mix_effect::TransitionKind;

/// Default transition used by `auto()`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Transition style
    pub kind: TransitionKind,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            kind: TransitionKind::Mix,
            duration_ms: 1000,
        }
    }
}

/// Health thresholds (percentages, dropped frames per sample)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// CPU load above this logs a WARNING
    pub cpu_warning: f64,
    /// CPU load above this logs a CRITICAL
    pub cpu_critical: f64,
    /// Audio peak above this logs a CRITICAL
    pub audio_peak_critical: f64,
    /// Dropped frames above this logs a WARNING
    pub dropped_frames_warning: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            cpu_warning: 70.0,
            cpu_critical: 90.0,
            audio_peak_critical: 95.0,
            dropped_frames_warning: 10,
        }
    }
}

/// Control plane configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Transition used by `auto()`
    pub transition: TransitionConfig,
    /// Driving clock for auto transitions and fade sampling (ms)
    pub frame_interval_ms: u64,
    /// Countdown tick period (ms)
    pub countdown_interval_ms: u64,
    /// Health sampling period (ms)
    pub health_interval_ms: u64,
    /// Maximum retained system log entries
    pub log_retention: usize,
    /// Health thresholds
    pub health: HealthThresholds,
    /// Seed for synthetic telemetry (random if unset)
    pub telemetry_seed: Option<u64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            transition: TransitionConfig::default(),
            frame_interval_ms: 20,
            countdown_interval_ms: 1000,
            health_interval_ms: 2000,
            log_retention: 100,
            health: HealthThresholds::default(),
            telemetry_seed: None,
        }
    }
}

impl ControlConfig {
    /// Driving clock period, never zero
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Countdown tick period, never zero
    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms.max(1))
    }

    /// Health sampling period, never zero
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(1))
    }

    /// Whole seconds a countdown loses per tick (at least one)
    pub fn countdown_step_secs(&self) -> u32 {
        (self.countdown_interval_ms / 1000).max(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ControlConfig =
            serde_json::from_str(r#"{"frame_interval_ms": 40, "health": {"cpu_warning": 60.0}}"#)
                .unwrap();
        assert_eq!(config.frame_interval_ms, 40);
        assert_eq!(config.countdown_interval_ms, 1000);
        assert_eq!(config.health.cpu_warning, 60.0);
        assert_eq!(config.health.cpu_critical, 90.0);
        assert_eq!(config.log_retention, 100);
    }

    #[test]
    fn test_intervals_never_zero() {
        let config = ControlConfig {
            frame_interval_ms: 0,
            countdown_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(1));
        assert_eq!(config.countdown_step_secs(), 1);
    }
}
