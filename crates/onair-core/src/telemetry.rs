//! Synthetic health telemetry
//!
//! The ticker samples a [`TelemetrySource`] on the health cadence and feeds
//! the samples through a [`HealthMonitor`], which reports threshold
//! crossings. The stock source is pseudo-random and seedable so tests can
//! replay it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::HealthThresholds;
use crate::syslog::LogLevel;

/// One health reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSample {
    /// CPU load, percent
    pub cpu_load: f64,
    /// Frames dropped since the previous sample
    pub dropped_frames: u32,
    /// Program audio peak, percent of full scale
    pub audio_peak: f64,
}

/// Anything that can produce health samples
pub trait TelemetrySource: Send {
    /// Draw the next sample
    fn sample(&mut self) -> HealthSample;
}

/// Bounded pseudo-random telemetry
pub struct SyntheticTelemetry {
    rng: StdRng,
}

impl SyntheticTelemetry {
    /// Deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded if a seed is given, otherwise from entropy
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl TelemetrySource for SyntheticTelemetry {
    fn sample(&mut self) -> HealthSample {
        // Mostly idle with occasional spikes
        let spike = self.rng.gen_bool(0.1);
        let cpu_load = if spike {
            self.rng.gen_range(60.0..100.0)
        } else {
            self.rng.gen_range(15.0..60.0)
        };
        let dropped_frames = if self.rng.gen_bool(0.05) {
            self.rng.gen_range(1..30)
        } else {
            0
        };
        let audio_peak = self.rng.gen_range(40.0..100.0);
        HealthSample {
            cpu_load,
            dropped_frames,
            audio_peak,
        }
    }
}

/// Health metric being watched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    DroppedFrames,
    AudioPeak,
}

impl Metric {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU load",
            Self::DroppedFrames => "Dropped frames",
            Self::AudioPeak => "Audio peak",
        }
    }
}

/// Severity band of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

/// A severity change worth logging
#[derive(Debug, Clone, PartialEq)]
pub struct HealthAlert {
    pub metric: Metric,
    pub level: LogLevel,
    pub message: String,
}

/// Edge-triggered threshold watcher
///
/// An alert is raised when a metric's severity changes: WARNING or
/// CRITICAL when it rises, SUCCESS when it returns to normal.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    thresholds: HealthThresholds,
    cpu: Severity,
    dropped_frames: Severity,
    audio_peak: Severity,
}

impl HealthMonitor {
    /// Create a monitor with everything at normal
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            thresholds,
            ..Default::default()
        }
    }

    /// Classify a sample and return alerts for severity changes
    pub fn observe(&mut self, sample: &HealthSample) -> Vec<HealthAlert> {
        let t = self.thresholds;
        let cpu = if sample.cpu_load > t.cpu_critical {
            Severity::Critical
        } else if sample.cpu_load > t.cpu_warning {
            Severity::Warning
        } else {
            Severity::Normal
        };
        let dropped = if sample.dropped_frames > t.dropped_frames_warning {
            Severity::Warning
        } else {
            Severity::Normal
        };
        let peak = if sample.audio_peak > t.audio_peak_critical {
            Severity::Critical
        } else {
            Severity::Normal
        };

        let mut alerts = Vec::new();
        if let Some(alert) = transition(&mut self.cpu, cpu, Metric::Cpu, format!("{:.0}%", sample.cpu_load)) {
            alerts.push(alert);
        }
        if let Some(alert) = transition(
            &mut self.dropped_frames,
            dropped,
            Metric::DroppedFrames,
            sample.dropped_frames.to_string(),
        ) {
            alerts.push(alert);
        }
        if let Some(alert) = transition(
            &mut self.audio_peak,
            peak,
            Metric::AudioPeak,
            format!("{:.0}%", sample.audio_peak),
        ) {
            alerts.push(alert);
        }
        alerts
    }
}

fn transition(current: &mut Severity, next: Severity, metric: Metric, reading: String) -> Option<HealthAlert> {
    if *current == next {
        return None;
    }
    *current = next;
    let (level, message) = match next {
        Severity::Critical => (LogLevel::Critical, format!("{} critical: {}", metric.name(), reading)),
        Severity::Warning => (LogLevel::Warning, format!("{} high: {}", metric.name(), reading)),
        Severity::Normal => (LogLevel::Success, format!("{} back to normal: {}", metric.name(), reading)),
    };
    Some(HealthAlert {
        metric,
        level,
        message,
    })
}
