//! In-memory audio backend
//!
//! Used by the native build and by tests. Records every call so behaviour
//! can be asserted without a sound device.

use std::collections::VecDeque;

use super::{AudioBackend, AudioError, Clip, UnlockTicket};

/// One recorded backend call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCall {
    BeginResume(UnlockTicket),
    PlayLoop(Clip, f32),
    SetVolume(Clip, f32),
    PlayOneShot(Clip, f32),
    Stop(Clip),
    WinTone(f32),
}

#[derive(Debug, Clone, Default)]
struct ClipState {
    loaded: bool,
    playing: bool,
    looping: bool,
    volume: Option<f32>,
    starts: u32,
}

#[derive(Debug, Clone)]
pub struct HeadlessAudio {
    suspended: bool,
    fail_resumes: bool,
    /// Resume requests are not completed while set
    hold_resumes: bool,
    pending: VecDeque<UnlockTicket>,
    /// Completions queued by hand, delivered before `pending`
    injected: VecDeque<(UnlockTicket, Result<(), AudioError>)>,
    music: ClipState,
    pickup: ClipState,
    win_tones: u32,
    calls: Vec<AudioCall>,
}

impl Default for HeadlessAudio {
    fn default() -> Self {
        Self::running()
    }
}

impl HeadlessAudio {
    /// Device that plays immediately
    pub fn running() -> Self {
        let loaded = ClipState {
            loaded: true,
            ..ClipState::default()
        };
        Self {
            suspended: false,
            fail_resumes: false,
            hold_resumes: false,
            pending: VecDeque::new(),
            injected: VecDeque::new(),
            music: loaded.clone(),
            pickup: loaded,
            win_tones: 0,
            calls: Vec::new(),
        }
    }

    /// Device that needs a resume before it plays, like a fresh browser tab
    pub fn suspended() -> Self {
        Self {
            suspended: true,
            ..Self::running()
        }
    }

    /// Make future resume requests fail
    pub fn fail_resumes(&mut self, fail: bool) {
        self.fail_resumes = fail;
    }

    /// Keep requested resumes in flight until released
    pub fn hold_resumes(&mut self, hold: bool) {
        self.hold_resumes = hold;
    }

    /// Deliver an arbitrary completion, e.g. one for a request the caller
    /// has already given up on
    pub fn push_completion(&mut self, ticket: UnlockTicket, result: Result<(), AudioError>) {
        self.injected.push_back((ticket, result));
    }

    /// Simulate the device being suspended again (tab backgrounded)
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn remove_clip(&mut self, clip: Clip) {
        let state = self.clip_mut(clip);
        state.loaded = false;
        state.playing = false;
    }

    pub fn restore_clip(&mut self, clip: Clip) {
        self.clip_mut(clip).loaded = true;
    }

    /// A one-shot reached its end
    pub fn finish(&mut self, clip: Clip) {
        let state = self.clip_mut(clip);
        if !state.looping {
            state.playing = false;
        }
    }

    pub fn volume(&self, clip: Clip) -> Option<f32> {
        self.clip(clip).volume
    }

    /// Times the clip was started from the beginning
    pub fn starts(&self, clip: Clip) -> u32 {
        self.clip(clip).starts
    }

    pub fn win_tones(&self) -> u32 {
        self.win_tones
    }

    pub fn resume_requests(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, AudioCall::BeginResume(_)))
            .count()
    }

    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }

    fn clip(&self, clip: Clip) -> &ClipState {
        match clip {
            Clip::Music => &self.music,
            Clip::Pickup => &self.pickup,
        }
    }

    fn clip_mut(&mut self, clip: Clip) -> &mut ClipState {
        match clip {
            Clip::Music => &mut self.music,
            Clip::Pickup => &mut self.pickup,
        }
    }

    fn start(&mut self, clip: Clip, volume: f32, looping: bool) -> Result<(), AudioError> {
        let state = self.clip_mut(clip);
        if !state.loaded {
            return Err(AudioError::MissingClip(clip));
        }
        state.playing = true;
        state.looping = looping;
        state.volume = Some(volume);
        state.starts += 1;
        Ok(())
    }
}

impl AudioBackend for HeadlessAudio {
    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn begin_resume(&mut self, ticket: UnlockTicket) -> Result<(), AudioError> {
        self.calls.push(AudioCall::BeginResume(ticket));
        self.pending.push_back(ticket);
        Ok(())
    }

    fn poll_resume(&mut self) -> Option<(UnlockTicket, Result<(), AudioError>)> {
        if let Some(completion) = self.injected.pop_front() {
            return Some(completion);
        }
        if self.hold_resumes {
            return None;
        }
        let ticket = self.pending.pop_front()?;
        if self.fail_resumes {
            return Some((
                ticket,
                Err(AudioError::ResumeRejected("not allowed".into())),
            ));
        }
        self.suspended = false;
        Some((ticket, Ok(())))
    }

    fn play_loop(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError> {
        self.calls.push(AudioCall::PlayLoop(clip, volume));
        self.start(clip, volume, true)
    }

    fn set_volume(&mut self, clip: Clip, volume: f32) {
        self.calls.push(AudioCall::SetVolume(clip, volume));
        self.clip_mut(clip).volume = Some(volume);
    }

    fn play_one_shot(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError> {
        self.calls.push(AudioCall::PlayOneShot(clip, volume));
        self.start(clip, volume, false)
    }

    fn is_playing(&self, clip: Clip) -> bool {
        self.clip(clip).playing
    }

    fn stop(&mut self, clip: Clip) {
        self.calls.push(AudioCall::Stop(clip));
        self.clip_mut(clip).playing = false;
    }

    fn play_win_tone(&mut self, gain: f32) -> Result<(), AudioError> {
        self.calls.push(AudioCall::WinTone(gain));
        self.win_tones += 1;
        Ok(())
    }
}
