//! Snapshot persistence
//!
//! One JSON document under a fixed key holds the source list, the audio
//! channels, and the overlay and macro collections. Session state (program
//! and preview, transition progress, the running macro, countdown, output
//! toggles) is never written.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audio::AudioChannel;
use crate::error::ControlError;
use crate::macros::Macro;
use crate::overlay::Overlay;
use crate::source::Source;

/// Storage key of the snapshot
pub const STATE_KEY: &str = "onair-state";

/// The persisted subset of control-plane state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub audio_channels: Vec<AudioChannel>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default)]
    pub macros: Vec<Macro>,
}

/// Reads and writes the snapshot in a directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store snapshots in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the snapshot file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", STATE_KEY))
    }

    /// Directory holding the snapshot
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the snapshot
    ///
    /// Returns `Ok(None)` if none has been saved yet. Macros are validated
    /// on load.
    pub fn load(&self) -> Result<Option<PersistedState>, ControlError> {
        let path = self.path();
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let state: PersistedState = serde_json::from_str(&json)?;
        for m in &state.macros {
            m.validate()?;
        }
        info!(
            "Loaded snapshot: {} sources, {} channels, {} macros",
            state.sources.len(),
            state.audio_channels.len(),
            state.macros.len()
        );
        Ok(Some(state))
    }

    /// Write the snapshot, replacing any previous one
    pub fn save(&self, state: &PersistedState) -> Result<(), ControlError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(state)?;

        // Write beside the target and rename so a crash never leaves half a file
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        debug!("Saved snapshot to {}", path.display());
        Ok(())
    }
}
