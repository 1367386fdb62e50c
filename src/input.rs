//! Input unification
//!
//! Three independent sources feed one horizontal direction per tick:
//! held keys, a held pointer compared against the catcher, and short
//! touch swipes that push the catcher for a fixed burst.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Merged horizontal intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    #[default]
    None,
}

/// Kind of pointing device behind a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    /// Maps a DOM `pointerType` string; unknown types count as touch
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "mouse" => PointerKind::Mouse,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Touch,
        }
    }
}

/// Viewport (client) coordinates to play-area coordinates, given the
/// play area's top-left corner in the viewport
pub fn to_play_area(client: Vec2, origin: Vec2) -> Vec2 {
    client - origin
}

/// Held keyboard state
#[derive(Debug, Clone, Default)]
pub struct KeyboardInput {
    left: bool,
    right: bool,
    action: bool,
}

impl KeyboardInput {
    /// Returns true if the key is one the game listens to
    pub fn key_down(&mut self, key: &str) -> bool {
        self.set(key, true)
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        self.set(key, false)
    }

    fn set(&mut self, key: &str, held: bool) -> bool {
        match key {
            "ArrowLeft" | "a" | "A" => self.left = held,
            "ArrowRight" | "d" | "D" => self.right = held,
            " " => self.action = held,
            _ => return false,
        }
        true
    }

    /// Left wins when both are held
    pub fn direction(&self) -> Direction {
        if self.left {
            Direction::Left
        } else if self.right {
            Direction::Right
        } else {
            Direction::None
        }
    }

    pub fn action_pressed(&self) -> bool {
        self.action
    }
}

/// Continuous pointer/touch follow
#[derive(Debug, Clone, Default)]
pub struct PointerInput {
    down: bool,
    x: f32,
}

impl PointerInput {
    pub fn press(&mut self, x: f32) {
        self.down = true;
        self.x = x;
    }

    /// Moves are only tracked while pressed
    pub fn move_to(&mut self, x: f32) {
        if self.down {
            self.x = x;
        }
    }

    pub fn release(&mut self) {
        self.down = false;
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    pub fn direction(&self, catcher_x: f32) -> Direction {
        if !self.down {
            Direction::None
        } else if self.x < catcher_x - POINTER_DEAD_ZONE {
            Direction::Left
        } else if self.x > catcher_x + POINTER_DEAD_ZONE {
            Direction::Right
        } else {
            Direction::None
        }
    }
}

/// Discrete swipe gestures
#[derive(Debug, Clone, Default)]
pub struct SwipeInput {
    start: Option<Vec2>,
    direction: Direction,
    /// Seconds left in the current burst
    burst: f32,
}

impl SwipeInput {
    /// A new gesture cancels any running burst
    pub fn begin(&mut self, pos: Vec2) {
        self.start = Some(pos);
        self.direction = Direction::None;
        self.burst = 0.0;
    }

    /// Finish the gesture; a long enough, mostly horizontal swipe starts a burst
    pub fn end(&mut self, pos: Vec2) {
        let Some(start) = self.start.take() else {
            return;
        };
        let delta = pos - start;
        if delta.length() < SWIPE_MIN_DISTANCE {
            return;
        }
        if delta.x.abs() > delta.y.abs() {
            self.direction = if delta.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            };
            self.burst = SWIPE_BURST_SECS;
        }
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    /// Burst countdown in wall-clock time
    pub fn advance(&mut self, dt: f32) {
        if self.burst > 0.0 {
            self.burst -= dt;
            if self.burst <= 0.0 {
                self.burst = 0.0;
                self.direction = Direction::None;
            }
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Keyboard, pointer and swipe merged into one signal
#[derive(Debug, Clone, Default)]
pub struct InputUnifier {
    pub keyboard: KeyboardInput,
    pub pointer: PointerInput,
    pub swipe: SwipeInput,
    /// Honour touch swipes
    pub swipes_enabled: bool,
}

impl InputUnifier {
    pub fn new(swipes_enabled: bool) -> Self {
        Self {
            swipes_enabled,
            ..Default::default()
        }
    }

    /// First non-`None` source wins: keyboard, then pointer, then swipe
    pub fn direction(&self, catcher_x: f32) -> Direction {
        [
            self.keyboard.direction(),
            self.pointer.direction(catcher_x),
            if self.swipes_enabled {
                self.swipe.direction()
            } else {
                Direction::None
            },
        ]
        .into_iter()
        .find(|d| *d != Direction::None)
        .unwrap_or_default()
    }

    pub fn action_pressed(&self) -> bool {
        self.keyboard.action_pressed()
    }

    pub fn pointer_down(&mut self, pos: Vec2, kind: PointerKind) {
        self.pointer.press(pos.x);
        if kind != PointerKind::Mouse {
            self.swipe.begin(pos);
        }
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        self.pointer.move_to(pos.x);
    }

    pub fn pointer_up(&mut self, pos: Vec2, kind: PointerKind) {
        self.pointer.release();
        if kind != PointerKind::Mouse {
            self.swipe.end(pos);
        }
    }

    pub fn pointer_cancel(&mut self) {
        self.pointer.release();
        self.swipe.cancel();
    }

    pub fn advance(&mut self, dt: f32) {
        self.swipe.advance(dt);
    }

    /// Drop all held state (restart, focus loss)
    pub fn clear(&mut self) {
        let swipes_enabled = self.swipes_enabled;
        *self = Self::new(swipes_enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_points_are_relative_to_play_area() {
        let origin = Vec2::new(120.0, 40.0);
        assert_eq!(
            to_play_area(Vec2::new(300.0, 90.0), origin),
            Vec2::new(180.0, 50.0)
        );
        // A press over a child element still maps through the container,
        // so the same screen point always lands on the same play-area point
        assert_eq!(to_play_area(origin, origin), Vec2::ZERO);
        assert_eq!(to_play_area(Vec2::new(10.0, 5.0), Vec2::ZERO), Vec2::new(10.0, 5.0));
    }

    #[test]
    fn keyboard_left_takes_precedence() {
        let mut kb = KeyboardInput::default();
        assert!(kb.key_down("d"));
        assert_eq!(kb.direction(), Direction::Right);
        assert!(kb.key_down("ArrowLeft"));
        assert_eq!(kb.direction(), Direction::Left);
        kb.key_up("ArrowLeft");
        assert_eq!(kb.direction(), Direction::Right);
        kb.key_up("D");
        assert_eq!(kb.direction(), Direction::None);
        assert!(!kb.key_down("x"));
    }

    #[test]
    fn space_is_action() {
        let mut kb = KeyboardInput::default();
        kb.key_down(" ");
        assert!(kb.action_pressed());
        assert_eq!(kb.direction(), Direction::None);
        kb.key_up(" ");
        assert!(!kb.action_pressed());
    }

    #[test]
    fn pointer_dead_zone() {
        let mut p = PointerInput::default();
        assert_eq!(p.direction(500.0), Direction::None);
        p.press(485.0);
        assert_eq!(p.direction(500.0), Direction::None);
        p.move_to(470.0);
        assert_eq!(p.direction(500.0), Direction::Left);
        p.move_to(530.0);
        assert_eq!(p.direction(500.0), Direction::Right);
        p.release();
        assert_eq!(p.direction(500.0), Direction::None);
        // Moves while released are ignored
        p.move_to(10.0);
        p.press(500.0);
        assert_eq!(p.direction(500.0), Direction::None);
    }

    #[test]
    fn horizontal_swipe_bursts_then_stops() {
        let mut s = SwipeInput::default();
        s.begin(Vec2::new(100.0, 100.0));
        s.end(Vec2::new(160.0, 110.0));
        assert_eq!(s.direction(), Direction::Right);
        s.advance(0.2);
        assert_eq!(s.direction(), Direction::Right);
        s.advance(0.15);
        assert_eq!(s.direction(), Direction::None);
    }

    #[test]
    fn short_or_vertical_swipes_are_ignored() {
        let mut s = SwipeInput::default();
        s.begin(Vec2::new(100.0, 100.0));
        s.end(Vec2::new(120.0, 100.0));
        assert_eq!(s.direction(), Direction::None);

        s.begin(Vec2::new(100.0, 100.0));
        s.end(Vec2::new(110.0, 200.0));
        assert_eq!(s.direction(), Direction::None);

        // End without a start
        s.end(Vec2::new(0.0, 0.0));
        assert_eq!(s.direction(), Direction::None);
    }

    #[test]
    fn new_gesture_cancels_burst() {
        let mut s = SwipeInput::default();
        s.begin(Vec2::ZERO);
        s.end(Vec2::new(-50.0, 0.0));
        assert_eq!(s.direction(), Direction::Left);
        s.begin(Vec2::ZERO);
        assert_eq!(s.direction(), Direction::None);
    }

    #[test]
    fn keyboard_wins_over_pointer() {
        let mut input = InputUnifier::new(true);
        input.pointer_down(Vec2::new(900.0, 0.0), PointerKind::Mouse);
        assert_eq!(input.direction(500.0), Direction::Right);
        input.keyboard.key_down("a");
        assert_eq!(input.direction(500.0), Direction::Left);
    }

    #[test]
    fn mouse_never_swipes() {
        let mut input = InputUnifier::new(true);
        input.pointer_down(Vec2::new(500.0, 0.0), PointerKind::Mouse);
        input.pointer_up(Vec2::new(700.0, 0.0), PointerKind::Mouse);
        assert_eq!(input.direction(500.0), Direction::None);

        input.pointer_down(Vec2::new(500.0, 0.0), PointerKind::Touch);
        input.pointer_up(Vec2::new(700.0, 0.0), PointerKind::Touch);
        assert_eq!(input.direction(500.0), Direction::Right);
    }

    #[test]
    fn disabled_swipes_are_ignored() {
        let mut input = InputUnifier::new(false);
        input.pointer_down(Vec2::new(500.0, 0.0), PointerKind::Touch);
        input.pointer_up(Vec2::new(700.0, 0.0), PointerKind::Touch);
        assert_eq!(input.direction(500.0), Direction::None);
    }

    #[test]
    fn clear_keeps_swipe_preference() {
        let mut input = InputUnifier::new(false);
        input.keyboard.key_down("a");
        input.clear();
        assert_eq!(input.direction(500.0), Direction::None);
        assert!(!input.swipes_enabled);
    }
}
