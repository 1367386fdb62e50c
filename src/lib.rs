//! Life Balance - a falling-item catcher where every catch costs something
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, falling, catching, scoring)
//! - `input`: Keyboard / pointer / swipe input merged into one direction
//! - `audio`: Unlock-gated music and one-shot effects
//! - `events`: Typed boundary channel to the presentation host
//! - `round`: Round controller (pause, resume, restart, resize)
//! - `settings`: Runtime configuration

pub mod audio;
pub mod events;
pub mod input;
pub mod round;
pub mod session;
pub mod settings;
pub mod sim;

pub use events::{CoreEvent, EventBus, HostCommand};
pub use round::RoundController;
pub use session::AudioSession;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta accepted before clamping (tab switches, breakpoints)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Catcher horizontal speed (units/s)
    pub const CATCHER_SPEED: f32 = 600.0;
    /// Catcher display height as a fraction of min(width, height)
    pub const CATCHER_HEIGHT_FRAC: f32 = 0.4;
    /// Catcher art aspect ratio (width / height)
    pub const CATCHER_ASPECT: f32 = 0.6;
    /// Gap between the catcher's feet and the bottom of the screen
    pub const CATCHER_BOTTOM_MARGIN: f32 = 10.0;
    /// Collision box relative to the catcher's display size
    pub const CATCHER_HITBOX_WIDTH_FRAC: f32 = 0.5;
    pub const CATCHER_HITBOX_HEIGHT_FRAC: f32 = 0.75;

    /// Falling item display height as a fraction of min(width, height)
    pub const ITEM_HEIGHT_FRAC: f32 = 0.13;
    /// Falling item width cap as a fraction of min(width, height)
    pub const ITEM_MAX_WIDTH_FRAC: f32 = 0.25;
    /// Items are born above the top edge
    pub const ITEM_SPAWN_Y: f32 = -50.0;
    /// Items are removed once their center passes height + this
    pub const ITEM_DESPAWN_MARGIN: f32 = 50.0;
    /// Falling speed range (units/s), drawn once per item
    pub const FALL_SPEED_MIN: u32 = 200;
    pub const FALL_SPEED_MAX: u32 = 350;
    /// Per-item size variance range
    pub const SIZE_VARIANCE_MIN: f32 = 0.9;
    pub const SIZE_VARIANCE_MAX: f32 = 1.05;

    /// Delay before the first spawn of a round (ms)
    pub const SPAWN_FIRST_DELAY_MS: u32 = 650;
    /// Randomized delay between later spawns (ms)
    pub const SPAWN_DELAY_MIN_MS: u32 = 520;
    pub const SPAWN_DELAY_MAX_MS: u32 = 780;

    /// Pointer dead zone around the catcher center
    pub const POINTER_DEAD_ZONE: f32 = 20.0;
    /// Minimum swipe displacement
    pub const SWIPE_MIN_DISTANCE: f32 = 30.0;
    /// How long a swipe keeps the catcher moving (s)
    pub const SWIPE_BURST_SECS: f32 = 0.3;

    /// Background music volume when audible
    pub const MUSIC_VOLUME: f32 = 0.3;
    /// Pickup effect volume
    pub const PICKUP_VOLUME: f32 = 0.8;
    /// Peak gain of the synthesized win arpeggio
    pub const WIN_TONE_GAIN: f32 = 0.1;
    /// Win arpeggio length (s)
    pub const WIN_TONE_SECS: f64 = 0.8;
    /// Delay before music auto-starts when a round opens already unlocked (s)
    pub const MUSIC_AUTOSTART_DELAY: f32 = 0.1;
}

/// Clamp a center coordinate so an entity of `half_extent` stays inside
/// `[0, span]`. Entities wider than the span are centered.
#[inline]
pub fn clamp_centered(pos: f32, half_extent: f32, span: f32) -> f32 {
    let lo = half_extent;
    let hi = span - half_extent;
    if hi.is_nan() || hi < lo || !pos.is_finite() {
        span / 2.0
    } else {
        pos.clamp(lo, hi)
    }
}
