//! Life Balance entry point
//!
//! On the web this is the host shell: DOM listeners, the frame loop, and the
//! CustomEvent bridge to the presentation layer. Natively it runs a headless
//! autopilot session and prints the final board.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{CustomEvent, CustomEventInit, Event, EventTarget, KeyboardEvent, PointerEvent};

    use life_balance::audio::WebAudio;
    use life_balance::input::{to_play_area, PointerKind};
    use life_balance::sim::WorldBounds;
    use life_balance::{AudioSession, RoundController, Settings};

    /// Core -> host DOM event; `detail` is the JSON message
    const EVENT_NAME: &str = "life-balance:event";
    /// Host -> core DOM event
    const COMMAND_NAME: &str = "life-balance:command";
    /// Element the game is laid out in; falls back to the window
    const CONTAINER_ID: &str = "life-balance";

    type Round = RoundController<WebAudio>;

    struct Listener {
        target: EventTarget,
        kind: &'static str,
        closure: Closure<dyn FnMut(Event)>,
    }

    /// Game instance holding all host-side state
    struct Game {
        round: Round,
        last_time: f64,
        listeners: Vec<Listener>,
    }

    thread_local! {
        static SESSION: AudioSession = AudioSession::new();
        static GAME: RefCell<Option<Game>> = const { RefCell::new(None) };
        /// Serialized core events waiting to be dispatched to the DOM
        static OUTGOING: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    }

    /// Run `f` against the live round, if any. Re-entrant calls are dropped.
    fn with_round<R>(f: impl FnOnce(&mut Round) -> R) -> Option<R> {
        let result = GAME.with(|game| match game.try_borrow_mut() {
            Ok(mut game) => game.as_mut().map(|g| f(&mut g.round)),
            Err(_) => {
                log::warn!("Round busy, input dropped");
                None
            }
        });
        dispatch_outgoing();
        result
    }

    /// Publish queued core events as DOM CustomEvents, outside any borrow of
    /// the round so page handlers may send commands straight back
    fn dispatch_outgoing() {
        let pending = OUTGOING.with(|q| std::mem::take(&mut *q.borrow_mut()));
        let Some(window) = web_sys::window() else {
            return;
        };
        for json in pending {
            let init = CustomEventInit::new();
            init.set_detail(&JsValue::from_str(&json));
            match CustomEvent::new_with_event_init_dict(EVENT_NAME, &init) {
                Ok(event) => {
                    if let Err(e) = window.dispatch_event(&event) {
                        log::warn!("Failed to dispatch {EVENT_NAME}: {e:?}");
                    }
                }
                Err(e) => log::warn!("Failed to create {EVENT_NAME}: {e:?}"),
            }
        }
    }

    fn container() -> Option<web_sys::Element> {
        web_sys::window()?.document()?.get_element_by_id(CONTAINER_ID)
    }

    /// Current play area size in CSS pixels
    fn play_area(window: &web_sys::Window) -> (f32, f32) {
        if let Some(el) = container() {
            let (w, h) = (el.client_width(), el.client_height());
            if w > 0 && h > 0 {
                return (w as f32, h as f32);
            }
        }
        let dim = |v: Result<JsValue, JsValue>| {
            v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
        };
        (dim(window.inner_width()), dim(window.inner_height()))
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger unavailable: {e}").into());
        }

        log::info!("Life Balance starting...");

        let Some(window) = web_sys::window() else {
            log::warn!("No window, not starting");
            return;
        };

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let (width, height) = play_area(&window);
        let session = SESSION.with(AudioSession::clone);

        let mut round = RoundController::new(
            seed,
            WorldBounds::new(width, height),
            session,
            &settings,
            WebAudio::new(),
        );

        let outgoing = OUTGOING.with(Rc::clone);
        round.subscribe_all(move |event| match event.to_json() {
            Ok(json) => outgoing.borrow_mut().push(json),
            Err(e) => log::warn!("Failed to serialize {event:?}: {e}"),
        });

        GAME.with(|game| {
            *game.borrow_mut() = Some(Game {
                round,
                last_time: 0.0,
                listeners: Vec::new(),
            })
        });

        setup_listeners(&window);
        request_animation_frame();

        log::info!("Life Balance running with seed {seed}");
    }

    fn listen(target: &EventTarget, kind: &'static str, handler: impl FnMut(Event) + 'static) {
        let closure = Closure::<dyn FnMut(Event)>::new(handler);
        if let Err(e) =
            target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
        {
            log::warn!("Failed to listen for {kind}: {e:?}");
            return;
        }
        GAME.with(|game| {
            if let Some(game) = game.borrow_mut().as_mut() {
                game.listeners.push(Listener {
                    target: target.clone(),
                    kind,
                    closure,
                });
            }
        });
    }

    /// Pointer position in play-area coordinates. `offset_x` would be
    /// relative to whichever child was hit, so use client coordinates.
    fn pointer(event: &Event) -> Option<(f32, f32, PointerKind)> {
        let event = event.dyn_ref::<PointerEvent>()?;
        let origin = container()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                Vec2::new(rect.left() as f32, rect.top() as f32)
            })
            .unwrap_or(Vec2::ZERO);
        let client = Vec2::new(event.client_x() as f32, event.client_y() as f32);
        let local = to_play_area(client, origin);
        Some((local.x, local.y, PointerKind::from_dom(&event.pointer_type())))
    }

    fn setup_listeners(window: &web_sys::Window) {
        let window_target: &EventTarget = window.as_ref();
        let pointer_target: EventTarget = container()
            .map(Into::into)
            .unwrap_or_else(|| window_target.clone());

        // Keyboard
        listen(window_target, "keydown", |event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                let key = event.key();
                with_round(|r| r.key_down(&key));
            }
        });
        listen(window_target, "keyup", |event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                let key = event.key();
                with_round(|r| r.key_up(&key));
            }
        });

        // Pointer / touch
        listen(&pointer_target, "pointerdown", |event| {
            if let Some((x, y, kind)) = pointer(&event) {
                with_round(|r| r.pointer_down(x, y, kind));
            }
        });
        listen(&pointer_target, "pointermove", |event| {
            if let Some((x, y, _)) = pointer(&event) {
                with_round(|r| r.pointer_move(x, y));
            }
        });
        listen(&pointer_target, "pointerup", |event| {
            if let Some((x, y, kind)) = pointer(&event) {
                with_round(|r| r.pointer_up(x, y, kind));
            }
        });
        listen(&pointer_target, "pointercancel", |_| {
            with_round(|r| r.pointer_cancel());
        });

        // Focus loss drops held input
        listen(window_target, "blur", |_| {
            with_round(|r| r.release_input());
        });

        // Resize
        listen(window_target, "resize", |_| {
            if let Some(window) = web_sys::window() {
                let (w, h) = play_area(&window);
                with_round(|r| r.resize(w, h));
            }
        });

        // Boundary commands
        listen(window_target, COMMAND_NAME, |event| {
            let Some(event) = event.dyn_ref::<CustomEvent>() else {
                return;
            };
            let detail = event.detail();
            let json = detail.as_string().or_else(|| {
                js_sys::JSON::stringify(&detail)
                    .ok()
                    .and_then(|s| s.as_string())
            });
            match json {
                Some(json) => {
                    with_round(|r| r.dispatch_json(&json));
                }
                None => log::warn!("Ignoring {COMMAND_NAME} without a JSON detail"),
            }
        });
    }

    fn request_animation_frame() {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(time);
        });
        if let Err(e) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            log::warn!("requestAnimationFrame failed: {e:?}");
        }
        closure.forget();
    }

    fn game_loop(time: f64) {
        let running = GAME.with(|game| {
            let mut game = game.borrow_mut();
            let Some(g) = game.as_mut() else {
                return false;
            };

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            g.last_time = time;

            g.round.frame(dt);
            true
        });
        dispatch_outgoing();

        if running {
            request_animation_frame();
        }
    }

    pub fn audio_unlocked() -> bool {
        SESSION.with(AudioSession::is_unlocked)
    }

    pub fn snapshot() -> Option<String> {
        with_round(|r| serde_json::to_string(&r.snapshot()))?
            .map_err(|e| log::warn!("Snapshot failed: {e}"))
            .ok()
    }

    pub fn shutdown() {
        let Some(mut game) = GAME.with(|game| game.borrow_mut().take()) else {
            return;
        };
        for listener in game.listeners.drain(..) {
            if let Err(e) = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.closure.as_ref().unchecked_ref(),
            ) {
                log::warn!("Failed to remove {} listener: {e:?}", listener.kind);
            }
        }
        game.round.shutdown();
        OUTGOING.with(|q| q.borrow_mut().clear());
        log::info!("Life Balance shut down");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

/// Whether audio has been unlocked this page session
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn audio_unlocked() -> bool {
    wasm_game::audio_unlocked()
}

/// JSON render snapshot of the current frame
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn snapshot() -> Option<String> {
    wasm_game::snapshot()
}

/// Tear the game down: listeners removed, subscriptions dropped, audio
/// stopped, frame loop ended
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn shutdown() {
    wasm_game::shutdown();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Life Balance (native) starting...");
    log::info!("Native mode runs a headless autopilot - serve the wasm build to play");

    let path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let settings = life_balance::Settings::load_from(path.as_deref());
    autopilot::run(&settings);
}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use std::cell::RefCell;
    use std::rc::Rc;

    use life_balance::audio::HeadlessAudio;
    use life_balance::consts::{POINTER_DEAD_ZONE, SIM_DT};
    use life_balance::events::EventKind;
    use life_balance::sim::{RoundPhase, WorldBounds};
    use life_balance::{AudioSession, CoreEvent, RoundController, Settings};

    const SEED: u64 = 0x11FE_BA1A;
    const WIDTH: f32 = 800.0;
    const HEIGHT: f32 = 600.0;
    /// Give up after this much simulated time
    const MAX_SECS: f32 = 300.0;

    type Round = RoundController<HeadlessAudio>;

    /// Hold the arrow key that moves the catcher under the lowest item
    fn steer(round: &mut Round) {
        let state = round.state();
        let target = state
            .items
            .iter()
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|item| item.pos.x);
        let x = state.catcher.x;

        round.key_up("ArrowLeft");
        round.key_up("ArrowRight");
        match target {
            Some(t) if t < x - POINTER_DEAD_ZONE => round.key_down("ArrowLeft"),
            Some(t) if t > x + POINTER_DEAD_ZONE => round.key_down("ArrowRight"),
            _ => {}
        }
    }

    pub fn run(settings: &Settings) {
        let mut round = RoundController::new(
            SEED,
            WorldBounds::new(WIDTH, HEIGHT),
            AudioSession::new(),
            settings,
            HeadlessAudio::running(),
        );

        let catches = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&catches);
        round.subscribe(EventKind::ScoreUpdate, move |event| {
            if let CoreEvent::ScoreUpdate(board) = event {
                if !board.is_zero() {
                    *counter.borrow_mut() += 1;
                }
                log::debug!("Board: {}", serde_json::to_string(board).unwrap_or_default());
            }
        });
        round.subscribe(EventKind::GameOver, |event| {
            if let CoreEvent::GameOver(category) = event {
                log::info!("Game over: {category} maxed out");
            }
        });

        let mut elapsed = 0.0;
        while elapsed < MAX_SECS {
            steer(&mut round);
            round.frame(SIM_DT);
            elapsed += SIM_DT;
            if matches!(round.phase(), RoundPhase::Earned { .. }) {
                break;
            }
        }

        let scores = round.scores();
        match round.phase().earned_category() {
            Some(category) => println!("Earned {category} after {elapsed:.1}s"),
            None => println!("No category earned in {MAX_SECS:.0}s"),
        }
        println!("Catches: {}", catches.borrow());
        for (category, score) in scores.iter() {
            println!("  {category:<10} {score}");
        }
        round.shutdown();
    }
}
