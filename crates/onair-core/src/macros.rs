//! Macro definitions
//!
//! A macro is an immutable, ordered list of actions. Actions are a closed
//! set: JSON with an unknown `type` fails to load rather than failing later
//! on air.
//!
//! ```json
//! {
//!   "id": "open",
//!   "label": "Show open",
//!   "actions": [
//!     { "type": "PVW_SOURCE", "source_id": "cam2" },
//!     { "type": "WAIT", "ms": 500 },
//!     { "type": "AUDIO_FADE", "channel_id": "music", "target_level": 0.0, "duration_ms": 2000 },
//!     { "type": "GFX_UPDATE", "overlay_id": "title", "active": true }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::audio::{ChannelId, LEVEL_CEILING};
use crate::error::{ControlError, SequencerError};
use crate::source::SourceId;

/// Identifier of a macro
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroId(pub String);

impl MacroId {
    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MacroId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for MacroId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One step of a macro
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroAction {
    /// Suspend the macro for `ms` milliseconds
    Wait {
        ms: u64,
    },
    /// Put a source on program
    CutToSource {
        source_id: SourceId,
    },
    /// Stage a source on preview
    PvwSource {
        source_id: SourceId,
    },
    /// Ramp a channel to a level with an ease-in-out curve
    ///
    /// Without a duration the level is applied instantly.
    AudioFade {
        channel_id: ChannelId,
        target_level: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// Toggle a channel's mute
    AudioMute {
        channel_id: ChannelId,
    },
    /// Show or hide a graphics overlay
    GfxUpdate {
        overlay_id: String,
        active: bool,
    },
}

impl MacroAction {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wait { .. } => "WAIT",
            Self::CutToSource { .. } => "CUT_TO_SOURCE",
            Self::PvwSource { .. } => "PVW_SOURCE",
            Self::AudioFade { .. } => "AUDIO_FADE",
            Self::AudioMute { .. } => "AUDIO_MUTE",
            Self::GfxUpdate { .. } => "GFX_UPDATE",
        }
    }

    /// Check parameters that would make the action fail on air
    pub fn validate(&self) -> Result<(), SequencerError> {
        match self {
            Self::AudioFade { target_level, .. } => validate_level(*target_level),
            _ => Ok(()),
        }
    }
}

/// Reject fade targets a channel cannot hold
pub fn validate_level(level: f64) -> Result<(), SequencerError> {
    if level.is_finite() && (0.0..=LEVEL_CEILING).contains(&level) {
        Ok(())
    } else {
        Err(SequencerError::InvalidLevel {
            level,
            ceiling: LEVEL_CEILING,
        })
    }
}

/// A pre-programmed action sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub id: MacroId,
    pub label: String,
    pub actions: Vec<MacroAction>,
}

impl Macro {
    /// Create a macro
    pub fn new(id: impl Into<String>, label: impl Into<String>, actions: Vec<MacroAction>) -> Self {
        Self {
            id: MacroId(id.into()),
            label: label.into(),
            actions,
        }
    }

    /// Validate every action
    pub fn validate(&self) -> Result<(), ControlError> {
        for (step, action) in self.actions.iter().enumerate() {
            action
                .validate()
                .map_err(|e| ControlError::InvalidMacro {
                    label: self.label.clone(),
                    step,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Parse and validate a single macro
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        let m: Macro = serde_json::from_str(json)?;
        m.validate()?;
        Ok(m)
    }
}

/// Parse and validate a list of macros
pub fn load_library(json: &str) -> Result<Vec<Macro>, ControlError> {
    let macros: Vec<Macro> = serde_json::from_str(json)?;
    for m in &macros {
        m.validate()?;
    }
    Ok(macros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_action_types() {
        let json = r#"{
            "id": "m1",
            "label": "Everything",
            "actions": [
                {"type": "WAIT", "ms": 100},
                {"type": "CUT_TO_SOURCE", "source_id": "X"},
                {"type": "PVW_SOURCE", "source_id": "Y"},
                {"type": "AUDIO_FADE", "channel_id": "mic", "target_level": 0.5, "duration_ms": 250},
                {"type": "AUDIO_FADE", "channel_id": "mic", "target_level": 1.0},
                {"type": "AUDIO_MUTE", "channel_id": "mic"},
                {"type": "GFX_UPDATE", "overlay_id": "score", "active": true}
            ]
        }"#;
        let m = Macro::from_json(json).unwrap();
        assert_eq!(m.actions.len(), 7);
        assert_eq!(m.actions[0], MacroAction::Wait { ms: 100 });
        assert_eq!(
            m.actions[4],
            MacroAction::AudioFade {
                channel_id: "mic".into(),
                target_level: 1.0,
                duration_ms: None,
            }
        );
        assert_eq!(m.actions[6].name(), "GFX_UPDATE");
    }

    #[test]
    fn test_unknown_action_rejected_at_load() {
        let json = r#"{"id": "m", "label": "Bad", "actions": [{"type": "LAUNCH_ROCKET"}]}"#;
        assert!(matches!(
            Macro::from_json(json),
            Err(ControlError::JsonError(_))
        ));
    }

    #[test]
    fn test_missing_field_rejected_at_load() {
        let json = r#"{"id": "m", "label": "Bad", "actions": [{"type": "CUT_TO_SOURCE"}]}"#;
        assert!(Macro::from_json(json).is_err());
    }

    #[test]
    fn test_out_of_range_fade_rejected_at_load() {
        let json = r#"[{"id": "m", "label": "Loud", "actions": [
            {"type": "WAIT", "ms": 1},
            {"type": "AUDIO_FADE", "channel_id": "mic", "target_level": 4.0}
        ]}]"#;
        match load_library(json) {
            Err(ControlError::InvalidMacro { label, step, .. }) => {
                assert_eq!(label, "Loud");
                assert_eq!(step, 1);
            }
            other => panic!("Expected InvalidMacro, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_level_bounds() {
        assert!(validate_level(0.0).is_ok());
        assert!(validate_level(LEVEL_CEILING).is_ok());
        assert!(validate_level(-0.1).is_err());
        assert!(validate_level(f64::NAN).is_err());
    }
}
