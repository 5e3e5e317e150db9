//! Control Actor
//!
//! This module provides an async actor that turns operator commands into
//! state manager calls. Input surfaces (keyboard, network, tests) send
//! [`ControlCommand`]s through a channel; the actor applies them one at a
//! time, in arrival order.
//!
//! # Architecture
//!
//! The actor receives commands through an mpsc channel. State changes are
//! observed through [`StateManager::subscribe`], not through the actor, so
//! every consumer sees the same event stream whether a change came from a
//! command, a macro, or the live ticker.
//!
//! # Example
//!
//! ```rust,ignore
//! use onair_core::actor::{run_control_actor, ControlCommand};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(256);
//! tokio::spawn(run_control_actor(cmd_rx, manager.clone()));
//!
//! cmd_tx.send(ControlCommand::Cut).await?;
//! ```

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::audio::{AudioChannel, ChannelId};
use crate::macros::{Macro, MacroId};
use crate::mix_effect::TransitionKind;
use crate::source::SourceId;
use crate::state::{ControlSnapshot, StateManager};

/// Commands sent to the control actor
#[derive(Debug)]
pub enum ControlCommand {
    /// Swap program and preview
    Cut,

    /// Start the configured transition
    Auto,

    /// Stage a source on preview
    SetPreview {
        /// Source to stage
        id: SourceId,
    },

    /// Put a source on program directly
    SetProgram {
        /// Source to take
        id: SourceId,
    },

    /// Stage the source at a zero-based position in the source list
    PreviewByIndex {
        /// Position in the source list
        index: usize,
    },

    /// Take the source at a zero-based position in the source list
    ProgramByIndex {
        /// Position in the source list
        index: usize,
    },

    /// Run a macro definition
    TriggerMacro {
        /// The macro to run
        definition: Macro,
    },

    /// Run a macro from the library
    TriggerMacroById {
        /// Library id
        id: MacroId,
    },

    /// Replace an audio channel record
    UpdateAudioChannel {
        /// The full new record
        channel: AudioChannel,
    },

    /// Toggle a channel's mute
    ToggleMute {
        /// Channel to toggle
        id: ChannelId,
    },

    /// Toggle a channel's solo
    ToggleSolo {
        /// Channel to toggle
        id: ChannelId,
    },

    /// Toggle a channel's pre-fade listen
    TogglePfl {
        /// Channel to toggle
        id: ChannelId,
    },

    /// Set a channel's fader level
    SetLevel {
        /// Channel to change
        id: ChannelId,
        /// New level (clamped)
        level: f64,
    },

    /// Show or hide an overlay
    SetOverlay {
        /// Overlay id
        id: String,
        /// Visibility
        active: bool,
    },

    /// Flip an overlay's visibility
    ToggleOverlay {
        /// Overlay id
        id: String,
    },

    /// Change the transition used by the next auto
    SetTransition {
        /// Transition style
        kind: TransitionKind,
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Start (or restart) the countdown
    StartCountdown {
        /// Duration in minutes
        minutes: u32,
    },

    /// Toggle recording
    ToggleRecord,

    /// Toggle streaming
    ToggleStream,

    /// Query a consistent snapshot of all state
    QuerySnapshot {
        /// Channel to send back the snapshot
        response: oneshot::Sender<ControlSnapshot>,
    },

    /// Cancel any running macro and stop the actor
    Shutdown,
}

/// Apply one command
///
/// Returns false when the actor should stop.
pub fn dispatch(manager: &StateManager, cmd: ControlCommand) -> bool {
    match cmd {
        ControlCommand::Cut => manager.cut(),
        ControlCommand::Auto => manager.auto(),
        ControlCommand::SetPreview { id } => manager.set_preview(&id),
        ControlCommand::SetProgram { id } => manager.set_program(&id),

        ControlCommand::PreviewByIndex { index } => match manager.source_at(index) {
            Some(id) => manager.set_preview(&id),
            None => debug!("No source at position {}", index + 1),
        },

        ControlCommand::ProgramByIndex { index } => match manager.source_at(index) {
            Some(id) => manager.set_program(&id),
            None => debug!("No source at position {}", index + 1),
        },

        ControlCommand::TriggerMacro { definition } => {
            // Rejection is logged by the manager; the run outlives this command
            let _ = manager.trigger_macro(definition);
        }

        ControlCommand::TriggerMacroById { id } => match manager.macro_by_id(&id) {
            Some(definition) => {
                let _ = manager.trigger_macro(definition);
            }
            None => debug!("Unknown macro {}", id),
        },

        ControlCommand::UpdateAudioChannel { channel } => manager.update_audio_channel(channel),
        ControlCommand::ToggleMute { id } => manager.toggle_mute(&id),
        ControlCommand::ToggleSolo { id } => manager.toggle_solo(&id),
        ControlCommand::TogglePfl { id } => manager.toggle_pfl(&id),
        ControlCommand::SetLevel { id, level } => manager.set_level(&id, level),
        ControlCommand::SetOverlay { id, active } => manager.set_overlay(&id, active),
        ControlCommand::ToggleOverlay { id } => manager.toggle_overlay(&id),

        ControlCommand::SetTransition { kind, duration_ms } => {
            manager.set_transition(kind, duration_ms)
        }

        ControlCommand::StartCountdown { minutes } => manager.start_countdown(minutes),
        ControlCommand::ToggleRecord => manager.toggle_record(),
        ControlCommand::ToggleStream => manager.toggle_stream(),

        ControlCommand::QuerySnapshot { response } => {
            let _ = response.send(manager.snapshot());
        }

        ControlCommand::Shutdown => {
            info!("Control actor shutting down");
            manager.shutdown();
            return false;
        }
    }
    true
}

/// Run the control actor
///
/// Processes commands until a [`ControlCommand::Shutdown`] arrives or every
/// sender is dropped.
pub async fn run_control_actor(mut cmd_rx: mpsc::Receiver<ControlCommand>, manager: StateManager) {
    info!("Control actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        if !dispatch(&manager, cmd) {
            break;
        }
    }

    info!("Control actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use crate::events::ControlEvent;
    use crate::macros::MacroAction;
    use crate::persistence::PersistedState;
    use crate::source::{Source, SourceKind};

    fn manager() -> StateManager {
        let setup = PersistedState {
            sources: vec![
                Source::new("cam1", "Camera 1", SourceKind::Camera),
                Source::new("cam2", "Camera 2", SourceKind::Camera),
            ],
            audio_channels: vec![AudioChannel::new("host", None)],
            macros: vec![Macro::new(
                "mute-host",
                "Mute host",
                vec![MacroAction::AudioMute {
                    channel_id: "host".into(),
                }],
            )],
            ..Default::default()
        };
        StateManager::new(ControlConfig::default(), setup)
    }

    async fn query(cmd_tx: &mpsc::Sender<ControlCommand>) -> ControlSnapshot {
        let (resp_tx, resp_rx) = oneshot::channel();
        cmd_tx
            .send(ControlCommand::QuerySnapshot { response: resp_tx })
            .await
            .unwrap();
        resp_rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_index_commands_then_cut() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let mgr = manager();
        let actor_handle = tokio::spawn(run_control_actor(cmd_rx, mgr.clone()));

        cmd_tx
            .send(ControlCommand::ProgramByIndex { index: 0 })
            .await
            .unwrap();
        cmd_tx
            .send(ControlCommand::PreviewByIndex { index: 1 })
            .await
            .unwrap();
        cmd_tx.send(ControlCommand::Cut).await.unwrap();

        let snap = query(&cmd_tx).await;
        assert_eq!(snap.mix_effect.program_id, Some("cam2".into()));
        assert_eq!(snap.mix_effect.preview_id, Some("cam1".into()));

        cmd_tx.send(ControlCommand::Shutdown).await.unwrap();
        actor_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_range_index_ignored() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let actor_handle = tokio::spawn(run_control_actor(cmd_rx, manager()));

        cmd_tx
            .send(ControlCommand::PreviewByIndex { index: 7 })
            .await
            .unwrap();

        let snap = query(&cmd_tx).await;
        assert_eq!(snap.mix_effect.preview_id, None);

        cmd_tx.send(ControlCommand::Shutdown).await.unwrap();
        actor_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_macro_by_id() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let mgr = manager();
        let mut event_rx = mgr.subscribe();
        let actor_handle = tokio::spawn(run_control_actor(cmd_rx, mgr.clone()));

        cmd_tx
            .send(ControlCommand::TriggerMacroById {
                id: "mute-host".into(),
            })
            .await
            .unwrap();

        loop {
            let event = event_rx.recv().await.unwrap();
            if let ControlEvent::MacroFinished { id, .. } = event {
                assert_eq!(id.as_str(), "mute-host");
                break;
            }
        }
        assert_eq!(mgr.audio_channel(&"host".into()).map(|c| c.is_muted), Some(true));

        cmd_tx.send(ControlCommand::Shutdown).await.unwrap();
        actor_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_macro_id_ignored() {
        let mgr = manager();
        assert!(dispatch(
            &mgr,
            ControlCommand::TriggerMacroById { id: "ghost".into() }
        ));
        assert_eq!(mgr.macro_executing(), None);
        assert!(mgr.logs().is_empty());
    }

    #[tokio::test]
    async fn test_actor_stops_when_senders_dropped() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let actor_handle = tokio::spawn(run_control_actor(cmd_rx, manager()));
        drop(cmd_tx);
        actor_handle.await.unwrap();
    }

    #[test]
    fn test_dispatch_shutdown_returns_false() {
        let mgr = manager();
        assert!(dispatch(&mgr, ControlCommand::ToggleRecord));
        assert!(!dispatch(&mgr, ControlCommand::Shutdown));
        assert!(mgr.snapshot().outputs.recording);
    }
}
