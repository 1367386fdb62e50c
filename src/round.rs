//! Round controller
//!
//! Owns one round: the simulation state, merged input, the audio state
//! machine and its backend, and the boundary event bus. The host calls
//! [`RoundController::frame`] once per display frame and forwards DOM input
//! and boundary commands; everything else happens in here.
//!
//! Outbound events raised while stepping are queued and delivered after the
//! step finishes, so subscribers never observe a half-applied tick.

use glam::Vec2;
use serde::Serialize;

use crate::audio::{AudioBackend, AudioMachine};
use crate::consts::*;
use crate::events::{CoreEvent, EventBus, EventKind, HostCommand, SubscriptionId};
use crate::input::{InputUnifier, PointerKind};
use crate::session::AudioSession;
use crate::settings::Settings;
use crate::sim::{
    Aabb, Category, Facing, GameEvent, GameState, RoundPhase, ScoreBoard, TickInput, WorldBounds,
    tick,
};

/// Catcher as the presentation layer draws it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatcherView {
    pub rect: Aabb,
    pub facing: Facing,
}

/// One falling item as the presentation layer draws it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemView {
    pub id: u32,
    pub category: Category,
    pub rect: Aabb,
}

/// Everything needed to draw a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub bounds: WorldBounds,
    pub phase: RoundPhase,
    pub catcher: CatcherView,
    pub items: Vec<ItemView>,
    pub scores: ScoreBoard,
    /// Action key held
    pub action: bool,
}

pub struct RoundController<B: AudioBackend> {
    state: GameState,
    input: InputUnifier,
    audio: AudioMachine,
    backend: B,
    bus: EventBus,
    /// Core events waiting for the end of the current step
    outbox: Vec<CoreEvent>,
    tick_events: Vec<GameEvent>,
    accumulator: f32,
    shut_down: bool,
}

impl<B: AudioBackend> RoundController<B> {
    /// Start a round. The initial all-zero `score-update` is queued and
    /// delivered by the first [`frame`](Self::frame) or
    /// [`flush_events`](Self::flush_events), once the host has subscribed.
    pub fn new(
        seed: u64,
        bounds: WorldBounds,
        session: AudioSession,
        settings: &Settings,
        backend: B,
    ) -> Self {
        let bounds = if bounds.is_valid() {
            bounds
        } else {
            log::warn!("Invalid initial bounds {bounds:?}, using 1x1");
            WorldBounds::new(1.0, 1.0)
        };
        log::info!(
            "Round starting: seed={seed}, {}x{}, audio unlocked={}",
            bounds.width,
            bounds.height,
            session.is_unlocked()
        );

        let state = GameState::new(seed, bounds);
        let outbox = vec![CoreEvent::ScoreUpdate(state.scores)];
        Self {
            state,
            input: InputUnifier::new(settings.swipe_gestures),
            audio: AudioMachine::new(session, settings),
            backend,
            bus: EventBus::new(),
            outbox,
            tick_events: Vec::new(),
            accumulator: 0.0,
            shut_down: false,
        }
    }

    // === Accessors ===

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn scores(&self) -> ScoreBoard {
        self.state.scores
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }

    pub fn audio(&self) -> &AudioMachine {
        &self.audio
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // === Boundary channel ===

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&CoreEvent) + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }

    pub fn subscribe_all(&mut self, handler: impl FnMut(&CoreEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Deliver queued core events to subscribers
    pub fn flush_events(&mut self) {
        for event in std::mem::take(&mut self.outbox) {
            self.bus.publish(&event);
        }
    }

    /// Apply a boundary command
    pub fn dispatch(&mut self, command: HostCommand) {
        if self.shut_down {
            log::debug!("Ignoring {command:?} after shutdown");
            return;
        }
        log::debug!("Command: {command:?}");
        match command {
            HostCommand::TogglePause(true) => self.pause(),
            HostCommand::TogglePause(false) => self.resume(),
            HostCommand::ResumeGame => self.continue_after_earn(),
            HostCommand::RestartGame => self.restart(),
            HostCommand::ToggleAudio => self.toggle_audio(),
        }
        self.flush_events();
    }

    /// Apply a JSON boundary command; malformed input is logged and skipped
    pub fn dispatch_json(&mut self, json: &str) {
        match HostCommand::from_json(json) {
            Ok(command) => self.dispatch(command),
            Err(e) => log::warn!("Skipping malformed command {json:?}: {e}"),
        }
    }

    // === Frame loop ===

    /// Advance by one display frame of `dt` seconds
    pub fn frame(&mut self, dt: f32) {
        if self.shut_down {
            return;
        }
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        self.input.advance(dt);
        self.audio.advance(dt, &mut self.backend);

        // No backlog builds up while frozen
        if self.state.phase.is_running() {
            self.accumulator += dt;
        } else {
            self.accumulator = 0.0;
        }

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = TickInput {
                direction: self.input.direction(self.state.catcher.x),
            };
            tick(&mut self.state, &input, SIM_DT, &mut self.tick_events);
            self.accumulator -= SIM_DT;
            substeps += 1;
            self.handle_tick_events();
        }

        self.flush_events();
    }

    fn handle_tick_events(&mut self) {
        for event in std::mem::take(&mut self.tick_events) {
            match event {
                GameEvent::Spawned { .. } => {}
                GameEvent::Caught { scores, .. } => {
                    self.outbox.push(CoreEvent::ScoreUpdate(scores));
                    self.audio.play_pickup(&mut self.backend);
                }
                GameEvent::Earned { category } => {
                    log::info!("Earned {category}");
                    self.accumulator = 0.0;
                    self.audio.play_win(&mut self.backend);
                    self.outbox.push(CoreEvent::GameOver(category));
                }
            }
        }
    }

    // === Round transitions ===

    /// Running -> Paused; music muted, not stopped
    pub fn pause(&mut self) {
        if !self.state.phase.is_running() {
            log::debug!("Pause ignored in {:?}", self.state.phase);
            return;
        }
        log::info!("Paused");
        self.state.phase = RoundPhase::Paused;
        self.accumulator = 0.0;
        self.audio.pause(&mut self.backend);
    }

    /// Paused -> Running with a soft score reset
    pub fn resume(&mut self) {
        if self.state.phase != RoundPhase::Paused {
            log::debug!("Resume ignored in {:?}", self.state.phase);
            return;
        }
        log::info!("Resumed");
        self.soft_restart();
    }

    /// Earned (or Paused) -> Running with a soft score reset
    pub fn continue_after_earn(&mut self) {
        if self.state.phase.is_running() {
            log::debug!("Continue ignored while running");
            return;
        }
        log::info!("Continuing from {:?}", self.state.phase);
        self.soft_restart();
    }

    /// Scores back to zero, entities kept, spawn timer re-armed with a fresh
    /// random delay
    fn soft_restart(&mut self) {
        self.state.phase = RoundPhase::Running;
        self.state.scores.reset();
        self.state.spawner.arm_random(&mut self.state.rng);
        self.accumulator = 0.0;
        self.outbox.push(CoreEvent::ScoreUpdate(self.state.scores));
        self.audio.resume(&mut self.backend);
    }

    /// Any phase -> Running with everything reset
    pub fn restart(&mut self) {
        log::info!("Restarting round");
        self.state.restart();
        self.input.clear();
        self.accumulator = 0.0;
        self.outbox.push(CoreEvent::ScoreUpdate(self.state.scores));
        self.audio.restart(&mut self.backend);
    }

    pub fn toggle_audio(&mut self) {
        self.audio.toggle(&mut self.backend);
    }

    /// New screen size; phase untouched
    pub fn resize(&mut self, width: f32, height: f32) {
        let bounds = WorldBounds::new(width, height);
        if !bounds.is_valid() {
            log::warn!("Ignoring invalid resize {width}x{height}");
            return;
        }
        log::debug!("Resize to {width}x{height}");
        self.state.resize(bounds);
    }

    // === Input ===

    pub fn key_down(&mut self, key: &str) {
        self.audio.gesture(&mut self.backend);
        self.input.keyboard.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.keyboard.key_up(key);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, kind: PointerKind) {
        self.audio.gesture(&mut self.backend);
        self.input.pointer_down(Vec2::new(x, y), kind);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.input.pointer_move(Vec2::new(x, y));
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, kind: PointerKind) {
        self.input.pointer_up(Vec2::new(x, y), kind);
    }

    pub fn pointer_cancel(&mut self) {
        self.input.pointer_cancel();
    }

    /// Focus lost: drop held keys and pointers
    pub fn release_input(&mut self) {
        self.input.clear();
    }

    // === Presentation ===

    pub fn snapshot(&self) -> RenderSnapshot {
        let bounds = self.state.bounds;
        RenderSnapshot {
            bounds,
            phase: self.state.phase,
            catcher: CatcherView {
                rect: self.state.catcher.bounds(&bounds),
                facing: self.state.catcher.facing,
            },
            items: self
                .state
                .items
                .iter()
                .map(|item| ItemView {
                    id: item.id,
                    category: item.category,
                    rect: item.bounds(&bounds),
                })
                .collect(),
            scores: self.state.scores,
            action: self.input.action_pressed(),
        }
    }

    /// Teardown: drop subscriptions, silence audio, stop stepping
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("Shutting down round");
        self.shut_down = true;
        self.bus.clear();
        self.outbox.clear();
        self.audio.shutdown(&mut self.backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Clip, HeadlessAudio, MusicState, UnlockState};
    use crate::sim::FallingItem;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Round = RoundController<HeadlessAudio>;

    fn round() -> Round {
        RoundController::new(
            7,
            WorldBounds::new(1000.0, 500.0),
            AudioSession::new(),
            &Settings::default(),
            HeadlessAudio::running(),
        )
    }

    fn record(round: &mut Round) -> Rc<RefCell<Vec<CoreEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        round.subscribe_all(move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    /// Park a motionless item of `category` on the catcher's hitbox
    fn drop_on_catcher(round: &mut Round, category: Category) {
        let state = &mut round.state;
        let id = state.next_entity_id();
        let pos = state.catcher.hitbox(&state.bounds).center();
        state.items.push(FallingItem {
            id,
            category,
            pos,
            vel_y: 0.0,
            size_mul: 1.0,
            alive: true,
        });
    }

    fn quiet(round: &mut Round) {
        round.state.spawner.disarm();
    }

    fn catch(round: &mut Round, category: Category) {
        drop_on_catcher(round, category);
        round.frame(SIM_DT);
    }

    #[test]
    fn initial_score_update_is_delivered_on_first_frame() {
        let mut round = round();
        let events = record(&mut round);
        assert!(events.borrow().is_empty());
        round.frame(0.0);
        assert_eq!(
            events.borrow().as_slice(),
            &[CoreEvent::ScoreUpdate(ScoreBoard::new())]
        );
    }

    #[test]
    fn five_love_catches_end_the_round() {
        let mut round = round();
        quiet(&mut round);
        round.flush_events();
        let events = record(&mut round);

        for _ in 0..5 {
            catch(&mut round, Category::Love);
        }

        assert_eq!(round.scores().get(Category::Love), 5);
        assert_eq!(
            round.phase(),
            RoundPhase::Earned {
                category: Category::Love
            }
        );
        let events = events.borrow();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[4], CoreEvent::ScoreUpdate(s) if s.get(Category::Love) == 5));
        assert_eq!(events[5], CoreEvent::GameOver(Category::Love));
    }

    #[test]
    fn earned_round_is_frozen() {
        let mut round = round();
        quiet(&mut round);
        for _ in 0..5 {
            catch(&mut round, Category::Passion);
        }
        let ticks = round.state().time_ticks;
        drop_on_catcher(&mut round, Category::Love);
        round.frame(0.1);
        assert_eq!(round.state().time_ticks, ticks);
        assert_eq!(round.scores().get(Category::Love), 0);
        assert_eq!(round.state().spawner.remaining(), None);
    }

    #[test]
    fn trade_off_is_applied_through_the_controller() {
        let mut round = round();
        quiet(&mut round);
        catch(&mut round, Category::Freedom);
        catch(&mut round, Category::Love);
        assert_eq!(round.scores().get(Category::Love), 1);
        assert_eq!(round.scores().get(Category::Freedom), 0);
    }

    #[test]
    fn resume_game_resets_scores_and_runs() {
        let mut round = round();
        quiet(&mut round);
        for _ in 0..5 {
            catch(&mut round, Category::Love);
        }
        round.flush_events();
        let events = record(&mut round);

        round.dispatch(HostCommand::ResumeGame);
        assert_eq!(round.phase(), RoundPhase::Running);
        assert!(round.scores().is_zero());
        assert_eq!(
            events.borrow().as_slice(),
            &[CoreEvent::ScoreUpdate(ScoreBoard::new())]
        );
        let delay = round.state().spawner.remaining().unwrap();
        assert!((0.52..=0.78).contains(&delay));
    }

    #[test]
    fn pause_freezes_and_resume_rearms_a_fresh_delay() {
        let mut round = round();
        catch(&mut round, Category::Identity);
        round.dispatch(HostCommand::TogglePause(true));
        assert_eq!(round.phase(), RoundPhase::Paused);

        let ticks = round.state().time_ticks;
        for _ in 0..120 {
            round.frame(0.1);
        }
        assert_eq!(round.state().time_ticks, ticks);

        round.dispatch(HostCommand::TogglePause(false));
        assert_eq!(round.phase(), RoundPhase::Running);
        assert!(round.scores().is_zero());
        let delay = round.state().spawner.remaining().unwrap();
        assert!((0.52..=0.78).contains(&delay));
        // No backlog: one frame is at most one frame's worth of ticks
        round.frame(SIM_DT);
        assert_eq!(round.state().time_ticks, ticks + 1);
    }

    #[test]
    fn resume_keeps_entity_positions() {
        let mut round = round();
        quiet(&mut round);
        round.key_down("ArrowLeft");
        for _ in 0..10 {
            round.frame(SIM_DT);
        }
        round.key_up("ArrowLeft");
        let x = round.state().catcher.x;
        round.pause();
        round.resume();
        assert_eq!(round.state().catcher.x, x);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut round = round();
        let rearmed = round.state().spawner.remaining();
        round.resume();
        assert_eq!(round.state().spawner.remaining(), rearmed);

        round.pause();
        round.pause();
        assert_eq!(round.phase(), RoundPhase::Paused);

        round.continue_after_earn();
        round.continue_after_earn();
        assert_eq!(round.phase(), RoundPhase::Running);
    }

    #[test]
    fn pause_is_ignored_once_earned() {
        let mut round = round();
        quiet(&mut round);
        for _ in 0..5 {
            catch(&mut round, Category::Ambition);
        }
        round.dispatch(HostCommand::TogglePause(true));
        round.dispatch(HostCommand::TogglePause(false));
        assert_eq!(round.phase().earned_category(), Some(Category::Ambition));
    }

    #[test]
    fn restart_clears_everything() {
        let mut round = round();
        for _ in 0..120 {
            round.frame(SIM_DT);
        }
        assert!(!round.state().items.is_empty());
        catch(&mut round, Category::Friendship);
        round.key_down("ArrowRight");
        round.frame(0.1);
        round.dispatch(HostCommand::TogglePause(true));

        round.dispatch(HostCommand::RestartGame);
        assert_eq!(round.phase(), RoundPhase::Running);
        assert!(round.state().items.is_empty());
        assert!(round.scores().is_zero());
        assert_eq!(round.state().catcher.x, 500.0);
        assert_eq!(round.state().catcher.bottom, 490.0);
        assert_eq!(round.state().spawner.remaining(), Some(0.65));
        // Held keys are dropped
        let x = round.state().catcher.x;
        round.frame(SIM_DT);
        assert_eq!(round.state().catcher.x, x);
    }

    #[test]
    fn restart_from_earned() {
        let mut round = round();
        quiet(&mut round);
        for _ in 0..5 {
            catch(&mut round, Category::Love);
        }
        round.restart();
        assert_eq!(round.phase(), RoundPhase::Running);
        assert!(round.scores().is_zero());
    }

    #[test]
    fn restart_unlocks_audio_in_a_fresh_session() {
        let session = AudioSession::new();
        let mut round = RoundController::new(
            7,
            WorldBounds::new(1000.0, 500.0),
            session.clone(),
            &Settings::default(),
            HeadlessAudio::suspended(),
        );
        round.dispatch(HostCommand::RestartGame);
        assert_eq!(round.backend().resume_requests(), 1);
        assert!(matches!(round.audio().unlock_state(), UnlockState::Unlocking(_)));

        round.frame(0.0);
        assert!(session.is_unlocked());
        assert_eq!(round.audio().music_state(), MusicState::Playing);
    }

    #[test]
    fn first_gesture_starts_music_and_effects_follow_catches() {
        let mut round = round();
        quiet(&mut round);
        round.pointer_down(500.0, 400.0, PointerKind::Touch);
        assert_eq!(round.audio().unlock_state(), UnlockState::Unlocked);
        assert_eq!(round.audio().music_state(), MusicState::Playing);

        catch(&mut round, Category::Love);
        assert_eq!(round.backend().starts(Clip::Pickup), 1);
        for _ in 0..4 {
            catch(&mut round, Category::Love);
        }
        assert_eq!(round.backend().win_tones(), 1);
    }

    #[test]
    fn toggle_audio_mid_round_keeps_the_track() {
        let mut round = round();
        round.key_down("a");
        round.dispatch(HostCommand::ToggleAudio);
        round.dispatch(HostCommand::ToggleAudio);
        assert_eq!(round.backend().starts(Clip::Music), 1);
        assert_eq!(round.backend().volume(Clip::Music), Some(0.3));
    }

    #[test]
    fn pause_mutes_music_without_stopping_it() {
        let mut round = round();
        round.key_down(" ");
        round.dispatch(HostCommand::TogglePause(true));
        assert_eq!(round.backend().volume(Clip::Music), Some(0.0));
        assert!(round.backend().is_playing(Clip::Music));
        round.dispatch(HostCommand::TogglePause(false));
        assert_eq!(round.backend().volume(Clip::Music), Some(0.3));
    }

    #[test]
    fn resize_keeps_phase_and_reclamps() {
        let mut round = round();
        round.pause();
        round.state.catcher.x = 900.0;
        round.resize(400.0, 300.0);
        assert_eq!(round.phase(), RoundPhase::Paused);
        let half = round.state().catcher.bounds(&round.state().bounds).size().x / 2.0;
        assert!(round.state().catcher.x <= 400.0 - half + 1e-3);
        assert_eq!(round.state().catcher.bottom, 290.0);
    }

    #[test]
    fn invalid_resize_is_ignored() {
        let mut round = round();
        round.resize(0.0, 300.0);
        round.resize(f32::NAN, 300.0);
        assert_eq!(round.state().bounds, WorldBounds::new(1000.0, 500.0));
    }

    #[test]
    fn malformed_commands_are_skipped() {
        let mut round = round();
        round.dispatch_json(r#"{"command":"launch-rockets"}"#);
        round.dispatch_json("not json");
        assert_eq!(round.phase(), RoundPhase::Running);
        round.dispatch_json(r#"{"command":"toggle-pause","payload":true}"#);
        assert_eq!(round.phase(), RoundPhase::Paused);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut round = round();
        quiet(&mut round);
        drop_on_catcher(&mut round, Category::Identity);
        round.key_down(" ");
        let snap = round.snapshot();
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.items[0].category, Category::Identity);
        assert_eq!(snap.catcher.facing, Facing::Right);
        assert!(snap.action);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains(r#""category":"Identity""#));
    }

    #[test]
    fn shutdown_drops_subscribers_and_stops_stepping() {
        let mut round = round();
        round.key_down("d");
        let events = record(&mut round);
        round.shutdown();
        assert!(round.is_shut_down());
        assert!(!round.backend().is_playing(Clip::Music));

        let ticks = round.state().time_ticks;
        round.frame(0.1);
        round.dispatch(HostCommand::RestartGame);
        assert_eq!(round.state().time_ticks, ticks);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn frame_delta_is_clamped() {
        let mut round = round();
        quiet(&mut round);
        round.frame(5.0);
        let ticks = round.state().time_ticks;
        assert!((5..=6).contains(&ticks));
        round.frame(f32::INFINITY);
        assert_eq!(round.state().time_ticks, ticks);
    }
}
