//! Falling item spawner
//!
//! A fire-once timer in simulation time. Each spawn re-arms it with a fresh
//! random delay, so nothing accumulates while the round is frozen.

use glam::Vec2;
use rand::Rng;

use super::category::{CATEGORY_ORDER, Category};
use super::state::{FallingItem, GameState, WorldBounds};
use crate::consts::*;

/// Deferred spawn timer
#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    /// Seconds until the next spawn; `None` when disarmed
    remaining: Option<f32>,
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner {
    /// Armed with the fixed first-spawn delay
    pub fn new() -> Self {
        Self {
            remaining: Some(ms_to_secs(SPAWN_FIRST_DELAY_MS)),
        }
    }

    pub fn arm_initial(&mut self) {
        self.remaining = Some(ms_to_secs(SPAWN_FIRST_DELAY_MS));
    }

    /// Arm with a fresh randomized delay, discarding any pending countdown
    pub fn arm_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.remaining = Some(random_delay(rng));
    }

    pub fn disarm(&mut self) {
        self.remaining = None;
    }

    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Count down; returns true (and disarms) when the timer fires
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.remaining = None;
            true
        } else {
            false
        }
    }
}

fn ms_to_secs(ms: u32) -> f32 {
    ms as f32 / 1000.0
}

/// Randomized gap between spawns (seconds)
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    ms_to_secs(rng.random_range(SPAWN_DELAY_MIN_MS..=SPAWN_DELAY_MAX_MS))
}

/// Build a new item at the top of the screen. Does not register it.
pub fn roll_item<R: Rng + ?Sized>(rng: &mut R, id: u32, bounds: &WorldBounds) -> FallingItem {
    let size_mul = rng.random_range(SIZE_VARIANCE_MIN..=SIZE_VARIANCE_MAX);
    let category = CATEGORY_ORDER[rng.random_range(0..Category::COUNT)];

    let half = FallingItem::display_size_for(category, size_mul, bounds).x / 2.0;
    let (lo, hi) = (half, bounds.width - half);
    let x = if hi >= lo {
        rng.random_range(lo..=hi)
    } else {
        bounds.width / 2.0
    };

    let vel_y = rng.random_range(FALL_SPEED_MIN..=FALL_SPEED_MAX) as f32;

    FallingItem {
        id,
        category,
        pos: Vec2::new(x, ITEM_SPAWN_Y),
        vel_y,
        size_mul,
        alive: true,
    }
}

/// Spawn one item into the round and re-arm the timer
pub fn spawn(state: &mut GameState) -> u32 {
    let id = state.next_entity_id();
    let item = roll_item(&mut state.rng, id, &state.bounds);
    log::debug!(
        "Spawned {} #{} at x={:.0} falling {:.0}/s",
        item.category,
        id,
        item.pos.x,
        item.vel_y
    );
    state.items.push(item);
    state.spawner.arm_random(&mut state.rng);
    id
}
