//! Graphics overlay visibility list

use serde::{Deserialize, Serialize};

/// A named graphics overlay that can be shown or hidden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Unique id (e.g. "score", "lower-third")
    pub id: String,
    /// Display name
    pub label: String,
    /// Whether the overlay is on air
    #[serde(default)]
    pub is_active: bool,
}

impl Overlay {
    /// Create a hidden overlay
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            is_active: false,
        }
    }
}

/// Ordered overlay list
#[derive(Debug, Clone, Default)]
pub struct OverlayList {
    overlays: Vec<Overlay>,
}

impl OverlayList {
    /// Create a list, dropping duplicate ids
    pub fn new(overlays: Vec<Overlay>) -> Self {
        let mut list = Self::default();
        for overlay in overlays {
            if list.get(&overlay.id).is_none() {
                list.overlays.push(overlay);
            }
        }
        list
    }

    /// Look up an overlay
    pub fn get(&self, id: &str) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// All overlays in order
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Set visibility; returns None for an unknown id
    pub fn set_active(&mut self, id: &str, active: bool) -> Option<bool> {
        let overlay = self.overlays.iter_mut().find(|o| o.id == id)?;
        overlay.is_active = active;
        Some(active)
    }

    /// Flip visibility; returns the new state
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let active = !self.get(id)?.is_active;
        self.set_active(id, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_toggle() {
        let mut list = OverlayList::new(vec![Overlay::new("score", "Scorebug")]);
        assert_eq!(list.set_active("score", true), Some(true));
        assert!(list.get("score").unwrap().is_active);
        assert_eq!(list.toggle("score"), Some(false));
        assert_eq!(list.set_active("missing", true), None);
        assert_eq!(list.toggle("missing"), None);
    }
}
