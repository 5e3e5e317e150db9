//! On-Air Control Plane
//!
//! This crate provides the core state and automation for a live-production
//! switcher: program/preview selection with tally lights, timed transitions,
//! an audio channel strip store, graphics overlays, macro automation, a
//! countdown clock and health monitoring.
//!
//! # Architecture
//!
//! All state lives behind one [`StateManager`]. Every command takes its lock
//! once, applies a whole change and emits [`ControlEvent`]s, so consumers
//! never see a half-applied command.
//!
//! - **Mix-effect**: program/preview slots, cut and auto transitions
//! - **Sequencer**: runs macros one at a time without blocking the switcher
//! - **Live ticker**: drives transition frames, the countdown and health
//!   sampling on fixed cadences
//! - **Actor**: applies [`ControlCommand`]s from input surfaces in order
//!
//! Tallies are never set directly; they are derived from the program and
//! preview slots after every switcher change.
//!
//! # Example
//!
//! ```rust,no_run
//! use onair_core::{ControlConfig, LiveTicker, PersistedState, Source, SourceKind, StateManager};
//!
//! # async fn demo() {
//! let setup = PersistedState {
//!     sources: vec![
//!         Source::new("cam1", "Camera 1", SourceKind::Camera),
//!         Source::new("cam2", "Camera 2", SourceKind::Camera),
//!     ],
//!     ..Default::default()
//! };
//! let manager = StateManager::new(ControlConfig::default(), setup);
//!
//! let mut ticker = LiveTicker::new(manager.clone());
//! ticker.start();
//!
//! manager.set_program(&"cam1".into());
//! manager.set_preview(&"cam2".into());
//! manager.auto();
//! # }
//! ```

pub mod actor;
pub mod audio;
pub mod config;
pub mod countdown;
pub mod error;
pub mod events;
pub mod macros;
pub mod mix_effect;
pub mod overlay;
pub mod persistence;
pub mod sequencer;
pub mod source;
pub mod state;
pub mod syslog;
pub mod telemetry;
pub mod ticker;

// Re-export actor types
pub use actor::{dispatch, run_control_actor, ControlCommand};

// Re-export state types
pub use audio::{AudioChannel, AudioChannelStore, ChannelId, Processing, LEVEL_CEILING};
pub use config::{ControlConfig, HealthThresholds, TransitionConfig};
pub use countdown::CountdownTimer;
pub use events::{ControlEvent, MacroOutcome};
pub use macros::{load_library, Macro, MacroAction, MacroId};
pub use mix_effect::{MixEffectEngine, MixEffectState, TransitionKind, TransitionState};
pub use overlay::{Overlay, OverlayList};
pub use source::{Source, SourceId, SourceKind, SourceRegistry, Tally};
pub use state::{ControlSnapshot, OutputState, StateManager};
pub use syslog::{LogLevel, SystemLogEntry};

// Re-export runtime types
pub use error::{ControlError, SequencerError};
pub use persistence::{PersistedState, SnapshotStore, STATE_KEY};
pub use telemetry::{HealthSample, SyntheticTelemetry, TelemetrySource};
pub use ticker::LiveTicker;
