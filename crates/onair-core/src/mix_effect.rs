//! Mix-effect engine
//!
//! Owns the program/preview slots and the auto-transition state machine:
//!
//! ```text
//! IDLE --auto()--> TRANSITIONING --tick (progress >= 1)--> IDLE (swap committed)
//! IDLE --cut()---> IDLE (swap committed)
//! TRANSITIONING --cut()--> IDLE (transition cancelled, swap committed once)
//! ```
//!
//! Every edge rewrites the source tallies from the slots, so at most one
//! source is PGM and at most one is PVW after any operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TransitionConfig;
use crate::source::{SourceId, SourceRegistry};

/// Accumulated float steps this close to 1.0 count as complete
const PROGRESS_EPSILON: f64 = 1e-9;

/// Transition style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitionKind {
    /// Crossfade
    #[default]
    Mix,
    /// Dip through a color
    Dip,
    /// Wipe pattern
    Wipe,
}

impl TransitionKind {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mix => "Mix",
            Self::Dip => "Dip",
            Self::Wipe => "Wipe",
        }
    }
}

/// Auto-transition state
///
/// Invariant: `in_progress == false` implies `progress == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    pub kind: TransitionKind,
    pub duration_ms: u64,
    /// 0.0..=1.0
    pub progress: f64,
    pub in_progress: bool,
}

impl TransitionState {
    fn idle(config: TransitionConfig) -> Self {
        Self {
            kind: config.kind,
            duration_ms: config.duration_ms,
            progress: 0.0,
            in_progress: false,
        }
    }

    /// Progress gained per frame of the driving clock
    fn step(&self, frame: Duration) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        frame.as_secs_f64() * 1000.0 / self.duration_ms as f64
    }

    fn reset(&mut self) {
        self.progress = 0.0;
        self.in_progress = false;
    }
}

/// Program/preview state of the switcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixEffectState {
    pub program_id: Option<SourceId>,
    pub preview_id: Option<SourceId>,
    pub transition: TransitionState,
}

/// Result of a `cut()`
#[derive(Debug, Clone, PartialEq)]
pub enum CutOutcome {
    /// No preview was set; nothing changed
    Ignored,
    /// Program and preview were swapped
    Swapped {
        /// Whether an in-flight auto transition was cancelled by this cut
        cancelled_transition: bool,
    },
}

/// Result of an `auto()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOutcome {
    /// Transition started at progress 0
    Started,
    /// A transition is already running; rejected
    AlreadyRunning,
    /// No preview is set; nothing to transition to
    NoPreview,
}

/// One advance of a running transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionTick {
    /// Progress after this tick; exactly 1.0 on the committing tick
    pub progress: f64,
    /// Whether the swap was committed (state is idle again)
    pub committed: bool,
}

/// The mix-effect engine
#[derive(Debug, Clone)]
pub struct MixEffectEngine {
    state: MixEffectState,
}

impl MixEffectEngine {
    /// Create an idle engine with empty program and preview
    pub fn new(transition: TransitionConfig) -> Self {
        Self {
            state: MixEffectState {
                program_id: None,
                preview_id: None,
                transition: TransitionState::idle(transition),
            },
        }
    }

    /// Current state
    pub fn state(&self) -> &MixEffectState {
        &self.state
    }

    /// Whether an auto transition is running
    pub fn is_transitioning(&self) -> bool {
        self.state.transition.in_progress
    }

    /// Stage a source on preview
    ///
    /// Returns false (no-op) if the source is unknown.
    pub fn set_preview(&mut self, sources: &mut SourceRegistry, id: &SourceId) -> bool {
        if !sources.contains(id) {
            debug!("Ignoring preview of unknown source {}", id);
            return false;
        }
        self.state.preview_id = Some(id.clone());
        self.sync_tallies(sources);
        true
    }

    /// Put a source on program
    ///
    /// Returns false (no-op) if the source is unknown.
    pub fn set_program(&mut self, sources: &mut SourceRegistry, id: &SourceId) -> bool {
        if !sources.contains(id) {
            debug!("Ignoring program of unknown source {}", id);
            return false;
        }
        self.state.program_id = Some(id.clone());
        self.sync_tallies(sources);
        true
    }

    /// Swap program and preview instantly
    ///
    /// A cut during a running transition cancels it; the swap is applied
    /// once, by the cut.
    pub fn cut(&mut self, sources: &mut SourceRegistry) -> CutOutcome {
        if self.state.preview_id.is_none() {
            return CutOutcome::Ignored;
        }
        let cancelled_transition = self.state.transition.in_progress;
        self.state.transition.reset();
        self.swap(sources);
        CutOutcome::Swapped {
            cancelled_transition,
        }
    }

    /// Start a timed transition
    pub fn auto(&mut self) -> AutoOutcome {
        if self.state.transition.in_progress {
            return AutoOutcome::AlreadyRunning;
        }
        if self.state.preview_id.is_none() {
            return AutoOutcome::NoPreview;
        }
        self.state.transition.in_progress = true;
        self.state.transition.progress = 0.0;
        AutoOutcome::Started
    }

    /// Advance a running transition by one frame of the driving clock
    ///
    /// Returns None when idle.
    pub fn tick(&mut self, sources: &mut SourceRegistry, frame: Duration) -> Option<TransitionTick> {
        let transition = &mut self.state.transition;
        if !transition.in_progress {
            return None;
        }

        let next = transition.progress + transition.step(frame);
        if next < 1.0 - PROGRESS_EPSILON {
            transition.progress = next;
            return Some(TransitionTick {
                progress: next,
                committed: false,
            });
        }

        transition.reset();
        self.swap(sources);
        Some(TransitionTick {
            progress: 1.0,
            committed: true,
        })
    }

    /// Change the transition used by the next `auto()`
    ///
    /// Ignored (returns false) while a transition is running.
    pub fn set_transition(&mut self, kind: TransitionKind, duration_ms: u64) -> bool {
        if self.state.transition.in_progress {
            return false;
        }
        self.state.transition.kind = kind;
        self.state.transition.duration_ms = duration_ms;
        true
    }

    fn swap(&mut self, sources: &mut SourceRegistry) {
        std::mem::swap(&mut self.state.program_id, &mut self.state.preview_id);
        self.sync_tallies(sources);
    }

    fn sync_tallies(&self, sources: &mut SourceRegistry) {
        sources.apply_tallies(self.state.program_id.as_ref(), self.state.preview_id.as_ref());
    }
}
