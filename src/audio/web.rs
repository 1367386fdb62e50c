//! Audio backend using the Web Audio API
//!
//! Music and the pickup effect are streamed through `<audio>` elements; the
//! win arpeggio is synthesized with oscillators. The `AudioContext` is the
//! unlock gate: browsers create it suspended until a user gesture.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioContextState, GainNode, HtmlAudioElement, OscillatorNode, OscillatorType,
};

use super::{AudioBackend, AudioError, Clip, UnlockTicket};
use crate::consts::WIN_TONE_SECS;

const MUSIC_URL: &str = "audio/bgm.mp3";
const PICKUP_URL: &str = "audio/sfx.wav";

/// Arpeggio steps (Hz), 0.1 s apart
const WIN_NOTES: [f32; 4] = [440.0, 554.0, 659.0, 880.0];
const WIN_NOTE_STEP: f64 = 0.1;
/// Gain holds this long before decaying
const WIN_HOLD: f64 = 0.3;

type Completions = Rc<RefCell<VecDeque<(UnlockTicket, Result<(), AudioError>)>>>;

pub struct WebAudio {
    ctx: Option<AudioContext>,
    music: Option<HtmlAudioElement>,
    pickup: Option<HtmlAudioElement>,
    completed: Completions,
}

impl Default for WebAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudio {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            music: load_clip(MUSIC_URL),
            pickup: load_clip(PICKUP_URL),
            completed: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    fn element(&self, clip: Clip) -> Result<&HtmlAudioElement, AudioError> {
        let el = match clip {
            Clip::Music => self.music.as_ref(),
            Clip::Pickup => self.pickup.as_ref(),
        };
        el.ok_or(AudioError::MissingClip(clip))
    }

    fn start(&self, clip: Clip, volume: f32, looping: bool) -> Result<(), AudioError> {
        let el = self.element(clip)?;
        el.set_loop(looping);
        el.set_volume(f64::from(volume.clamp(0.0, 1.0)));
        el.set_current_time(0.0);
        let promise = el
            .play()
            .map_err(|e| AudioError::Playback(format!("{e:?}")))?;
        // Rejections (e.g. 404) surface asynchronously; log and carry on
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("{clip:?} playback rejected: {e:?}");
            }
        });
        Ok(())
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }
}

fn load_clip(url: &str) -> Option<HtmlAudioElement> {
    match HtmlAudioElement::new_with_src(url) {
        Ok(el) => {
            el.set_preload("auto");
            Some(el)
        }
        Err(e) => {
            log::warn!("Failed to load {url}: {e:?}");
            None
        }
    }
}

impl AudioBackend for WebAudio {
    fn is_suspended(&self) -> bool {
        self.ctx
            .as_ref()
            .is_some_and(|ctx| ctx.state() == AudioContextState::Suspended)
    }

    fn begin_resume(&mut self, ticket: UnlockTicket) -> Result<(), AudioError> {
        let ctx = self.ctx.as_ref().ok_or(AudioError::ContextUnavailable)?;
        let promise = ctx
            .resume()
            .map_err(|e| AudioError::ResumeRejected(format!("{e:?}")))?;
        let completed = Rc::clone(&self.completed);
        wasm_bindgen_futures::spawn_local(async move {
            let result = JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| AudioError::ResumeRejected(format!("{e:?}")));
            completed.borrow_mut().push_back((ticket, result));
        });
        Ok(())
    }

    fn poll_resume(&mut self) -> Option<(UnlockTicket, Result<(), AudioError>)> {
        self.completed.borrow_mut().pop_front()
    }

    fn play_loop(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError> {
        self.start(clip, volume, true)
    }

    fn set_volume(&mut self, clip: Clip, volume: f32) {
        if let Ok(el) = self.element(clip) {
            el.set_volume(f64::from(volume.clamp(0.0, 1.0)));
        }
    }

    fn play_one_shot(&mut self, clip: Clip, volume: f32) -> Result<(), AudioError> {
        self.start(clip, volume, false)
    }

    fn is_playing(&self, clip: Clip) -> bool {
        self.element(clip)
            .is_ok_and(|el| !el.paused() && !el.ended())
    }

    fn stop(&mut self, clip: Clip) {
        if let Ok(el) = self.element(clip) {
            if let Err(e) = el.pause() {
                log::debug!("Failed to stop {clip:?}: {e:?}");
            }
            el.set_current_time(0.0);
        }
    }

    fn play_win_tone(&mut self, gain: f32) -> Result<(), AudioError> {
        let ctx = self.ctx.as_ref().ok_or(AudioError::ContextUnavailable)?;
        let (osc, amp) = Self::create_osc(ctx, WIN_NOTES[0], OscillatorType::Triangle)
            .ok_or_else(|| AudioError::Playback("oscillator unavailable".into()))?;
        let t = ctx.current_time();

        for (i, freq) in WIN_NOTES.iter().enumerate() {
            osc.frequency()
                .set_value_at_time(*freq, t + i as f64 * WIN_NOTE_STEP)
                .ok();
        }
        amp.gain().set_value_at_time(gain, t).ok();
        amp.gain().set_value_at_time(gain, t + WIN_HOLD).ok();
        amp.gain()
            .exponential_ramp_to_value_at_time(0.001, t + WIN_TONE_SECS)
            .ok();

        osc.start().map_err(|e| AudioError::Playback(format!("{e:?}")))?;
        osc.stop_with_when(t + WIN_TONE_SECS).ok();
        Ok(())
    }
}
