//! Audio state machine
//!
//! Music and effects are gated on a one-time unlock (browsers refuse sound
//! until a user gesture). After unlock the music track loops for the rest
//! of the session; muting, pausing and the user toggle only ever change its
//! volume, so the track never restarts from the top.
//!
//! The actual output device sits behind [`AudioBackend`].

mod headless;
#[cfg(target_arch = "wasm32")]
mod web;

pub use headless::{AudioCall, HeadlessAudio};
#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

use crate::consts::MUSIC_AUTOSTART_DELAY;
use crate::session::AudioSession;
use crate::settings::Settings;

/// Playable clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    /// Looping background track
    Music,
    /// Catch effect
    Pickup,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("audio context unavailable")]
    ContextUnavailable,
    #[error("clip {0:?} is not loaded")]
    MissingClip(Clip),
    #[error("audio context refused to resume: {0}")]
    ResumeRejected(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Identifies one resume request so late completions can be recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockTicket(pub u32);

/// Output device
pub trait AudioBackend {
    /// The device is waiting for a user gesture
    fn is_suspended(&self) -> bool;
    /// Start an asynchronous resume; the result comes back via `poll_resume`
    fn begin_resume(&mut self, ticket: UnlockTicket) -> Result<(), AudioError>;
    /// Completed resume requests, oldest first
    fn poll_resume(&mut self) -> Option<(UnlockTicket, Result<(), AudioError>)>;
    fn play_loop(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError>;
    fn set_volume(&mut self, clip: Clip, volume: f32);
    fn play_one_shot(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError>;
    fn is_playing(&self, clip: Clip) -> bool;
    fn stop(&mut self, clip: Clip);
    /// Short synthesized ascending arpeggio; self-terminating
    fn play_win_tone(&mut self, gain: f32) -> Result<(), AudioError>;
}

/// Unlock progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    Locked,
    Unlocking(UnlockTicket),
    Unlocked,
}

/// What the listener hears from the music track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicState {
    Stopped,
    Playing,
    /// Running at volume 0
    Muted,
}

#[derive(Debug, Clone)]
pub struct AudioMachine {
    session: AudioSession,
    unlock: UnlockState,
    next_ticket: u32,
    music_playing: bool,
    /// User preference (toggle)
    music_enabled: bool,
    /// Round explicitly paused
    paused: bool,
    music_volume: f32,
    pickup_volume: f32,
    win_tone_gain: f32,
    /// Countdown to starting music in an already-unlocked session
    autostart: Option<f32>,
}

impl AudioMachine {
    pub fn new(session: AudioSession, settings: &Settings) -> Self {
        let unlocked = session.is_unlocked();
        Self {
            session,
            unlock: if unlocked {
                UnlockState::Unlocked
            } else {
                UnlockState::Locked
            },
            next_ticket: 0,
            music_playing: false,
            music_enabled: settings.music_enabled,
            paused: false,
            music_volume: settings.music_volume,
            pickup_volume: settings.pickup_volume,
            win_tone_gain: settings.win_tone_gain,
            autostart: unlocked.then_some(MUSIC_AUTOSTART_DELAY),
        }
    }

    pub fn unlock_state(&self) -> UnlockState {
        self.unlock
    }

    pub fn music_state(&self) -> MusicState {
        if !self.music_playing {
            MusicState::Stopped
        } else if self.target_volume() > 0.0 {
            MusicState::Playing
        } else {
            MusicState::Muted
        }
    }

    pub fn is_music_enabled(&self) -> bool {
        self.music_enabled
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn target_volume(&self) -> f32 {
        if self.music_enabled && !self.paused {
            self.music_volume
        } else {
            0.0
        }
    }

    /// Wall-clock housekeeping: deferred music start and resume completions
    pub fn advance<B: AudioBackend + ?Sized>(&mut self, dt: f32, backend: &mut B) {
        if let Some(remaining) = self.autostart.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.autostart = None;
                self.start_music(backend);
            }
        }
        self.poll(backend);
    }

    /// Apply finished resume requests
    pub fn poll<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        while let Some((ticket, result)) = backend.poll_resume() {
            match (self.unlock, result) {
                (UnlockState::Unlocking(pending), Ok(())) if pending == ticket => {
                    log::info!("Audio context resumed");
                    self.complete_unlock(backend);
                }
                (UnlockState::Unlocking(pending), Err(e)) if pending == ticket => {
                    log::warn!("Audio unlock failed, will retry on next gesture: {e}");
                    self.unlock = UnlockState::Locked;
                }
                (state, result) => {
                    log::debug!("Ignoring stale resume {ticket:?} ({result:?}) in {state:?}");
                }
            }
        }
    }

    /// Any key press, pointer down or tap
    pub fn gesture<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.sync_session();
        match self.unlock {
            UnlockState::Unlocked => self.start_music(backend),
            UnlockState::Unlocking(_) => {}
            UnlockState::Locked => self.request_unlock(backend),
        }
    }

    /// Unlocked by someone else holding the session (e.g. a splash screen)
    fn sync_session(&mut self) {
        if self.session.is_unlocked() && self.unlock != UnlockState::Unlocked {
            self.unlock = UnlockState::Unlocked;
        }
    }

    /// Locked -> Unlocking, or straight to Unlocked when the device already runs
    fn request_unlock<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if !backend.is_suspended() {
            self.complete_unlock(backend);
            return;
        }
        let ticket = self.take_ticket();
        match backend.begin_resume(ticket) {
            Ok(()) => {
                log::info!("Unlocking audio ({ticket:?})");
                self.unlock = UnlockState::Unlocking(ticket);
            }
            Err(e) => log::warn!("Cannot unlock audio: {e}"),
        }
    }

    fn take_ticket(&mut self) -> UnlockTicket {
        self.next_ticket += 1;
        UnlockTicket(self.next_ticket)
    }

    fn complete_unlock<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.unlock = UnlockState::Unlocked;
        self.session.set_unlocked(true);
        self.start_music(backend);
    }

    fn start_music<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.unlock != UnlockState::Unlocked || self.music_playing {
            return;
        }
        self.autostart = None;
        let volume = self.target_volume();
        match backend.play_loop(Clip::Music, volume) {
            Ok(()) => {
                log::info!("Music started at volume {volume}");
                self.music_playing = true;
            }
            Err(e) => log::warn!("Music unavailable, continuing silently: {e}"),
        }
    }

    fn apply_volume<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.music_playing {
            backend.set_volume(Clip::Music, self.target_volume());
        }
    }

    /// Round paused: mute regardless of preference, keep the track running
    pub fn pause<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.paused = true;
        self.apply_volume(backend);
    }

    /// Round resumed: audible again only if the user wants music
    pub fn resume<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.paused = false;
        self.apply_volume(backend);
    }

    /// Round restarted: make sure the music is going
    pub fn restart<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.paused = false;
        if self.music_playing {
            self.apply_volume(backend);
            return;
        }
        self.sync_session();
        match self.unlock {
            UnlockState::Unlocked => self.start_music(backend),
            // Music starts when the pending resume completes
            UnlockState::Unlocking(_) => {}
            UnlockState::Locked => self.request_unlock(backend),
        }
    }

    /// Flip the user's music preference
    pub fn toggle<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        self.music_enabled = !self.music_enabled;
        log::info!("Music enabled: {}", self.music_enabled);
        self.apply_volume(backend);
        if !self.music_enabled && backend.is_playing(Clip::Pickup) {
            backend.stop(Clip::Pickup);
        }
    }

    /// Catch effect; restarts rather than overlapping itself
    pub fn play_pickup<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if !self.music_enabled || !self.ready(backend) {
            return;
        }
        if backend.is_playing(Clip::Pickup) {
            backend.stop(Clip::Pickup);
        }
        if let Err(e) = backend.play_one_shot(Clip::Pickup, self.pickup_volume) {
            log::warn!("Pickup effect skipped: {e}");
        }
    }

    /// Earned fanfare
    pub fn play_win<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        if !self.music_enabled || !self.ready(backend) {
            return;
        }
        if let Err(e) = backend.play_win_tone(self.win_tone_gain) {
            log::warn!("Win tone skipped: {e}");
        }
    }

    /// Effects need a running device; a suspended one gets nudged and the
    /// effect is dropped
    fn ready<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if !backend.is_suspended() {
            return true;
        }
        if self.unlock == UnlockState::Unlocked {
            let ticket = self.take_ticket();
            if let Err(e) = backend.begin_resume(ticket) {
                log::debug!("Resume nudge failed: {e}");
            }
        }
        log::debug!("Audio suspended, effect skipped");
        false
    }

    /// Teardown: silence everything
    pub fn shutdown<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        backend.stop(Clip::Pickup);
        if self.music_playing {
            backend.stop(Clip::Music);
            self.music_playing = false;
        }
        self.autostart = None;
    }
}
