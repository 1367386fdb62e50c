//! Game state and core simulation types
//!
//! Everything one round owns: world bounds, the catcher, live falling
//! items, the score board, the phase, and the spawn timer.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::collision::Aabb;
use super::score::ScoreBoard;
use super::spawn::Spawner;
use crate::clamp_centered;
use crate::consts::*;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Simulation stepping
    Running,
    /// Explicitly paused by the player
    Paused,
    /// A category hit max; frozen until continue or restart
    Earned { category: Category },
}

impl RoundPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, RoundPhase::Running)
    }

    pub fn earned_category(&self) -> Option<Category> {
        match self {
            RoundPhase::Earned { category } => Some(*category),
            _ => None,
        }
    }
}

/// Visible play area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Base length all entity sizes scale with
    pub fn base(&self) -> f32 {
        self.width.min(self.height)
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Which way the catcher art faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// The player-controlled catcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catcher {
    /// Horizontal center
    pub x: f32,
    /// Bottom edge (feet)
    pub bottom: f32,
    pub facing: Facing,
}

impl Catcher {
    /// Default bottom-center placement
    pub fn new(bounds: &WorldBounds) -> Self {
        let mut catcher = Self {
            x: 0.0,
            bottom: 0.0,
            facing: Facing::default(),
        };
        catcher.place_default(bounds);
        catcher
    }

    pub fn place_default(&mut self, bounds: &WorldBounds) {
        self.x = bounds.width / 2.0;
        self.bottom = bounds.height - CATCHER_BOTTOM_MARGIN;
    }

    pub fn display_size(bounds: &WorldBounds) -> Vec2 {
        let height = bounds.base() * CATCHER_HEIGHT_FRAC;
        Vec2::new(height * CATCHER_ASPECT, height)
    }

    pub fn half_width(bounds: &WorldBounds) -> f32 {
        Self::display_size(bounds).x / 2.0
    }

    pub fn bounds(&self, world: &WorldBounds) -> Aabb {
        Aabb::from_bottom_center(Vec2::new(self.x, self.bottom), Self::display_size(world))
    }

    /// Collision box: narrower than the art, anchored at the feet
    pub fn hitbox(&self, world: &WorldBounds) -> Aabb {
        let size = Self::display_size(world)
            * Vec2::new(CATCHER_HITBOX_WIDTH_FRAC, CATCHER_HITBOX_HEIGHT_FRAC);
        Aabb::from_bottom_center(Vec2::new(self.x, self.bottom), size)
    }

    pub fn clamp_to(&mut self, world: &WorldBounds) {
        self.x = clamp_centered(self.x, Self::half_width(world), world.width);
    }
}

/// A falling item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallingItem {
    pub id: u32,
    pub category: Category,
    /// Center position
    pub pos: Vec2,
    /// Downward speed (units/s), constant for the item's life
    pub vel_y: f32,
    /// Size variance drawn at spawn
    pub size_mul: f32,
    /// Cleared when caught or fallen off-screen; swept at the end of a tick
    pub alive: bool,
}

impl FallingItem {
    /// Display size for `category` at `size_mul` (square art)
    pub fn display_size_for(category: Category, size_mul: f32, world: &WorldBounds) -> Vec2 {
        let base = world.base();
        let height = base * ITEM_HEIGHT_FRAC * size_mul * category.visual_size_multiplier();
        let width = height.min(base * ITEM_MAX_WIDTH_FRAC);
        Vec2::new(width, height)
    }

    pub fn display_size(&self, world: &WorldBounds) -> Vec2 {
        Self::display_size_for(self.category, self.size_mul, world)
    }

    pub fn bounds(&self, world: &WorldBounds) -> Aabb {
        Aabb::from_center(self.pos, self.display_size(world))
    }

    pub fn clamp_to(&mut self, world: &WorldBounds) {
        let half = self.display_size(world).x / 2.0;
        self.pos.x = clamp_centered(self.pos.x, half, world.width);
    }

    pub fn is_below(&self, world: &WorldBounds) -> bool {
        self.pos.y > world.height + ITEM_DESPAWN_MARGIN
    }
}

/// Complete round state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub bounds: WorldBounds,
    pub catcher: Catcher,
    /// Live items (sorted by id)
    pub items: Vec<FallingItem>,
    pub scores: ScoreBoard,
    pub phase: RoundPhase,
    pub spawner: Spawner,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new round with the given seed and screen size
    pub fn new(seed: u64, bounds: WorldBounds) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            bounds,
            catcher: Catcher::new(&bounds),
            items: Vec::new(),
            scores: ScoreBoard::new(),
            phase: RoundPhase::Running,
            spawner: Spawner::new(),
            time_ticks: 0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn item(&self, id: u32) -> Option<&FallingItem> {
        self.items
            .binary_search_by_key(&id, |i| i.id)
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// Drop dead items and keep id order for deterministic iteration
    pub fn sweep_dead(&mut self) {
        self.items.retain(|i| i.alive);
        self.items.sort_by_key(|i| i.id);
    }

    /// Apply new screen bounds; re-anchors the catcher and re-clamps items
    pub fn resize(&mut self, bounds: WorldBounds) {
        self.bounds = bounds;
        self.catcher.bottom = bounds.height - CATCHER_BOTTOM_MARGIN;
        self.catcher.clamp_to(&bounds);
        for item in &mut self.items {
            item.clamp_to(&bounds);
        }
    }

    /// Full reset of entities and scores; phase back to Running
    pub fn restart(&mut self) {
        self.items.clear();
        self.catcher.place_default(&self.bounds);
        self.catcher.facing = Facing::default();
        self.scores.reset();
        self.phase = RoundPhase::Running;
        self.spawner.arm_initial();
    }
}
