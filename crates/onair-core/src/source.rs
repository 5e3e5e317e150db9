//! Source registry and tally state

use serde::{Deserialize, Serialize};

/// Identifier of an input source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-air indicator for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tally {
    /// Live on program
    Pgm,
    /// Staged on preview
    Pvw,
    /// Neither
    #[default]
    Off,
}

/// Kind of input feeding a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    #[default]
    Camera,
    Media,
    Graphics,
    Remote,
    Color,
}

/// Per-source settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Display name
    pub label: String,
    /// Input kind
    #[serde(default)]
    pub kind: SourceKind,
}

/// An input source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Unique id
    pub id: SourceId,
    /// Current tally
    #[serde(default)]
    pub tally: Tally,
    /// Settings
    pub settings: SourceSettings,
}

impl Source {
    /// Create an untallied source
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: SourceId(id.into()),
            tally: Tally::Off,
            settings: SourceSettings {
                label: label.into(),
                kind,
            },
        }
    }
}

/// Canonical, ordered map of input sources
///
/// Order is significant: the key-binding layer selects sources by their
/// position in the registry.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Create a registry from a source list
    ///
    /// Duplicate ids keep their first occurrence. Incoming tallies are
    /// discarded; tallies are only ever assigned from program/preview.
    pub fn new(sources: Vec<Source>) -> Self {
        let mut registry = Self::default();
        for mut source in sources {
            if registry.contains(&source.id) {
                continue;
            }
            source.tally = Tally::Off;
            registry.sources.push(source);
        }
        registry
    }

    /// Check whether a source exists
    pub fn contains(&self, id: &SourceId) -> bool {
        self.sources.iter().any(|s| &s.id == id)
    }

    /// Look up a source
    pub fn get(&self, id: &SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| &s.id == id)
    }

    /// Source at a zero-based order index
    pub fn at(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    /// All sources in order
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source currently holding a tally
    pub fn holder(&self, tally: Tally) -> Option<&Source> {
        self.sources.iter().find(|s| s.tally == tally)
    }

    /// Recompute every tally from the program and preview slots
    ///
    /// Each source is PGM if it is program, else PVW if it is preview, else
    /// OFF, so at most one source holds each of PGM and PVW.
    pub fn apply_tallies(&mut self, program: Option<&SourceId>, preview: Option<&SourceId>) {
        for source in &mut self.sources {
            source.tally = if Some(&source.id) == program {
                Tally::Pgm
            } else if Some(&source.id) == preview {
                Tally::Pvw
            } else {
                Tally::Off
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        SourceRegistry::new(vec![
            Source::new("cam1", "Camera 1", SourceKind::Camera),
            Source::new("cam2", "Camera 2", SourceKind::Camera),
            Source::new("vt", "Playback", SourceKind::Media),
        ])
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let reg = SourceRegistry::new(vec![
            Source::new("a", "First", SourceKind::Camera),
            Source::new("a", "Second", SourceKind::Media),
        ]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&"a".into()).unwrap().settings.label, "First");
    }

    #[test]
    fn test_incoming_tallies_cleared() {
        let mut src = Source::new("a", "A", SourceKind::Camera);
        src.tally = Tally::Pgm;
        let reg = SourceRegistry::new(vec![src]);
        assert_eq!(reg.at(0).unwrap().tally, Tally::Off);
    }

    #[test]
    fn test_apply_tallies() {
        let mut reg = registry();
        reg.apply_tallies(Some(&"cam1".into()), Some(&"cam2".into()));
        assert_eq!(reg.holder(Tally::Pgm).unwrap().id.as_str(), "cam1");
        assert_eq!(reg.holder(Tally::Pvw).unwrap().id.as_str(), "cam2");
        assert_eq!(reg.get(&"vt".into()).unwrap().tally, Tally::Off);
    }

    #[test]
    fn test_program_wins_when_same_source() {
        let mut reg = registry();
        reg.apply_tallies(Some(&"cam1".into()), Some(&"cam1".into()));
        assert_eq!(reg.get(&"cam1".into()).unwrap().tally, Tally::Pgm);
        assert!(reg.holder(Tally::Pvw).is_none());
    }

    #[test]
    fn test_tally_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Tally::Pgm).unwrap(), "\"PGM\"");
        assert_eq!(serde_json::to_string(&Tally::Off).unwrap(), "\"OFF\"");
    }
}
