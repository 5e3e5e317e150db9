//! Unified event stream for the control plane
//!
//! UI consumers subscribe to a single broadcast channel and receive every
//! state change in the order it was applied.

use crate::audio::ChannelId;
use crate::macros::MacroId;
use crate::mix_effect::TransitionKind;
use crate::source::SourceId;
use crate::syslog::SystemLogEntry;

/// How a macro run ended
#[derive(Debug, Clone, PartialEq)]
pub enum MacroOutcome {
    /// Every action ran
    Completed,
    /// Another macro was running; this trigger did nothing
    Rejected {
        /// The macro that holds the single-flight slot
        running: MacroId,
    },
    /// An action failed; the remaining actions were skipped
    Aborted {
        /// Zero-based index of the failing action
        step: usize,
        /// Error detail
        reason: String,
    },
    /// The run was dropped before it finished (task aborted or panicked)
    Interrupted,
}

/// Every observable change in the control plane
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    // -------------------------------------------------------------------------
    // Switcher
    // -------------------------------------------------------------------------
    /// Program slot changed
    ProgramChanged {
        from: Option<SourceId>,
        to: Option<SourceId>,
    },

    /// Preview slot changed
    PreviewChanged {
        from: Option<SourceId>,
        to: Option<SourceId>,
    },

    /// An auto transition started
    TransitionStarted {
        kind: TransitionKind,
        duration_ms: u64,
    },

    /// A running transition advanced
    TransitionProgress {
        progress: f64,
    },

    /// A transition committed its swap
    TransitionCompleted,

    /// A transition was cancelled by a cut
    TransitionCancelled,

    // -------------------------------------------------------------------------
    // Audio and graphics
    // -------------------------------------------------------------------------
    /// A channel record changed
    AudioChannelChanged {
        id: ChannelId,
    },

    /// An overlay's visibility changed
    OverlayChanged {
        id: String,
        active: bool,
    },

    // -------------------------------------------------------------------------
    // Automation and timers
    // -------------------------------------------------------------------------
    /// A macro claimed the single-flight slot
    MacroStarted {
        id: MacroId,
    },

    /// A macro released the single-flight slot
    MacroFinished {
        id: MacroId,
        outcome: MacroOutcome,
    },

    /// Countdown changed (None when cleared)
    CountdownChanged {
        remaining_seconds: Option<u32>,
    },

    /// Recording or streaming toggled
    OutputChanged {
        recording: bool,
        streaming: bool,
    },

    /// A system log entry was appended
    LogAppended(SystemLogEntry),
}

impl ControlEvent {
    /// Check if this is a switcher event
    pub fn is_switcher(&self) -> bool {
        matches!(
            self,
            ControlEvent::ProgramChanged { .. }
                | ControlEvent::PreviewChanged { .. }
                | ControlEvent::TransitionStarted { .. }
                | ControlEvent::TransitionProgress { .. }
                | ControlEvent::TransitionCompleted
                | ControlEvent::TransitionCancelled
        )
    }

    /// Get the log entry if this is a log event
    pub fn log_entry(&self) -> Option<&SystemLogEntry> {
        match self {
            ControlEvent::LogAppended(entry) => Some(entry),
            _ => None,
        }
    }
}
