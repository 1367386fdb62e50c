//! Game settings
//!
//! Read once at startup: LocalStorage on the web, an optional JSON file
//! natively. The in-game music toggle is round state and is never saved.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Background music volume when audible (0.0 - 1.0)
    pub music_volume: f32,
    /// Pickup effect volume (0.0 - 1.0)
    pub pickup_volume: f32,
    /// Peak gain of the win arpeggio (0.0 - 1.0)
    pub win_tone_gain: f32,
    /// Music preference a new round starts with
    pub music_enabled: bool,

    // === Input ===
    /// Touch swipes push the catcher
    pub swipe_gestures: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_volume: MUSIC_VOLUME,
            pickup_volume: PICKUP_VOLUME,
            win_tone_gain: WIN_TONE_GAIN,
            music_enabled: true,
            swipe_gestures: true,
        }
    }
}

impl Settings {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Clamp volumes into range; non-finite values fall back to defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.music_volume = sanitize_volume(self.music_volume, defaults.music_volume);
        self.pickup_volume = sanitize_volume(self.pickup_volume, defaults.pickup_volume);
        self.win_tone_gain = sanitize_volume(self.win_tone_gain, defaults.win_tone_gain);
        self
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "life_balance_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring malformed settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Load settings from a JSON file, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: Option<&std::path::Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring malformed settings in {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read settings {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

fn sanitize_volume(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback }
}
