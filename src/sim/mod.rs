//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No audio, DOM or platform dependencies

pub mod category;
pub mod collision;
pub mod score;
pub mod spawn;
pub mod state;
pub mod tick;

pub use category::{CATEGORY_ORDER, Category, MAX_SCORE};
pub use collision::Aabb;
pub use score::{CatchOutcome, ScoreBoard};
pub use spawn::Spawner;
pub use state::{Catcher, Facing, FallingItem, GameState, RoundPhase, WorldBounds};
pub use tick::{GameEvent, TickInput, tick};
