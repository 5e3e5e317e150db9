//! Audio channel store
//!
//! Per-channel mixer state. Channels are replaced wholesale on update; the
//! narrow setters touch exactly one field each.

use serde::{Deserialize, Serialize};

use crate::source::SourceId;

/// Highest level a channel fader accepts (unity is 1.0)
pub const LEVEL_CEILING: f64 = 1.1;

/// Identifier of an audio channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One parametric EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    pub frequency_hz: f32,
    pub gain_db: f32,
    pub q: f32,
}

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compressor {
    pub enabled: bool,
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: -18.0,
            ratio: 3.0,
            attack_ms: 10.0,
            release_ms: 120.0,
        }
    }
}

/// Brickwall limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limiter {
    pub enabled: bool,
    pub ceiling_db: f32,
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            enabled: true,
            ceiling_db: -1.0,
        }
    }
}

/// Noise gate settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub enabled: bool,
    pub threshold_db: f32,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: -50.0,
        }
    }
}

/// De-esser settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeEsser {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub amount_db: f32,
}

impl Default for DeEsser {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency_hz: 6500.0,
            amount_db: 4.0,
        }
    }
}

/// Channel processing chain parameters
///
/// Stored and round-tripped only; no signal processing happens here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processing {
    /// Input trim in dB
    pub gain_db: f32,
    /// Alignment delay in milliseconds
    pub delay_ms: f32,
    /// Five-band EQ, low to high
    pub eq: [EqBand; 5],
    pub compressor: Compressor,
    pub limiter: Limiter,
    pub gate: Gate,
    pub de_esser: DeEsser,
    pub mic_boost: bool,
    /// Automatic gain control
    pub agc: bool,
    /// Stereo position, -1.0 (left) to 1.0 (right)
    pub pan: f32,
}

impl Default for Processing {
    fn default() -> Self {
        let band = |frequency_hz| EqBand {
            frequency_hz,
            gain_db: 0.0,
            q: 0.7,
        };
        Self {
            gain_db: 0.0,
            delay_ms: 0.0,
            eq: [
                band(80.0),
                band(250.0),
                band(1000.0),
                band(4000.0),
                band(12000.0),
            ],
            compressor: Compressor::default(),
            limiter: Limiter::default(),
            gate: Gate::default(),
            de_esser: DeEsser::default(),
            mic_boost: false,
            agc: false,
            pan: 0.0,
        }
    }
}

/// Mixer state of one audio channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChannel {
    /// Unique id
    pub id: ChannelId,
    /// Source this channel follows
    pub source_id: Option<SourceId>,
    /// Fader level, 0.0..=LEVEL_CEILING
    pub level: f64,
    pub is_muted: bool,
    /// Solo is a monitoring flag only; it never mutes other channels
    pub is_solo: bool,
    /// Pre-fade listen
    pub is_pfl: bool,
    #[serde(default)]
    pub processing: Processing,
}

impl AudioChannel {
    /// Create a channel at unity level
    pub fn new(id: impl Into<String>, source_id: Option<SourceId>) -> Self {
        Self {
            id: ChannelId(id.into()),
            source_id,
            level: 1.0,
            is_muted: false,
            is_solo: false,
            is_pfl: false,
            processing: Processing::default(),
        }
    }
}

/// Clamp a requested level into the accepted fader range
///
/// Non-finite input maps to silence.
pub fn clamp_level(level: f64) -> f64 {
    if level.is_finite() {
        level.clamp(0.0, LEVEL_CEILING)
    } else {
        0.0
    }
}

/// Ordered store of audio channels
#[derive(Debug, Clone, Default)]
pub struct AudioChannelStore {
    channels: Vec<AudioChannel>,
}

impl AudioChannelStore {
    /// Create a store, dropping duplicate ids and clamping levels
    pub fn new(channels: Vec<AudioChannel>) -> Self {
        let mut store = Self::default();
        for mut channel in channels {
            if store.get(&channel.id).is_some() {
                continue;
            }
            channel.level = clamp_level(channel.level);
            store.channels.push(channel);
        }
        store
    }

    /// Look up a channel
    pub fn get(&self, id: &ChannelId) -> Option<&AudioChannel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    fn get_mut(&mut self, id: &ChannelId) -> Option<&mut AudioChannel> {
        self.channels.iter_mut().find(|c| &c.id == id)
    }

    /// All channels in order
    pub fn channels(&self) -> &[AudioChannel] {
        &self.channels
    }

    /// Replace the whole record for `channel.id`
    ///
    /// Returns false (and changes nothing) if the id is unknown.
    pub fn update_channel(&mut self, mut channel: AudioChannel) -> bool {
        channel.level = clamp_level(channel.level);
        match self.get_mut(&channel.id) {
            Some(slot) => {
                *slot = channel;
                true
            }
            None => false,
        }
    }

    /// Flip mute; returns the new state
    pub fn toggle_mute(&mut self, id: &ChannelId) -> Option<bool> {
        let channel = self.get_mut(id)?;
        channel.is_muted = !channel.is_muted;
        Some(channel.is_muted)
    }

    /// Flip solo; returns the new state
    pub fn toggle_solo(&mut self, id: &ChannelId) -> Option<bool> {
        let channel = self.get_mut(id)?;
        channel.is_solo = !channel.is_solo;
        Some(channel.is_solo)
    }

    /// Flip pre-fade listen; returns the new state
    pub fn toggle_pfl(&mut self, id: &ChannelId) -> Option<bool> {
        let channel = self.get_mut(id)?;
        channel.is_pfl = !channel.is_pfl;
        Some(channel.is_pfl)
    }

    /// Set the fader level; returns the level actually applied
    pub fn set_level(&mut self, id: &ChannelId, level: f64) -> Option<f64> {
        let channel = self.get_mut(id)?;
        channel.level = clamp_level(level);
        Some(channel.level)
    }
}
