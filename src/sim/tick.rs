//! Fixed timestep simulation tick
//!
//! One step of the round: move the catcher, run the spawn timer, let items
//! fall, sweep the off-screen ones, then resolve catches in id order.

use super::category::Category;
use super::score::ScoreBoard;
use super::spawn;
use super::state::{Facing, GameState, RoundPhase};
use crate::consts::*;
use crate::input::Direction;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Merged horizontal direction
    pub direction: Direction,
}

/// Something that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// An item was spawned
    Spawned { id: u32, category: Category },
    /// An item was caught; carries the board after the trade-off
    Caught {
        id: u32,
        category: Category,
        scores: ScoreBoard,
    },
    /// A category hit max; the round is now frozen
    Earned { category: Category },
}

/// Advance the round by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32, events: &mut Vec<GameEvent>) {
    // Frozen while paused or earned
    if !state.phase.is_running() {
        return;
    }

    state.time_ticks += 1;
    let bounds = state.bounds;

    // Catcher
    let vx = match input.direction {
        Direction::Left => {
            state.catcher.facing = Facing::Left;
            -CATCHER_SPEED
        }
        Direction::Right => {
            state.catcher.facing = Facing::Right;
            CATCHER_SPEED
        }
        Direction::None => 0.0,
    };
    state.catcher.x += vx * dt;
    state.catcher.clamp_to(&bounds);

    // Spawn timer
    if state.spawner.advance(dt) {
        let id = spawn::spawn(state);
        if let Some(item) = state.item(id) {
            events.push(GameEvent::Spawned {
                id,
                category: item.category,
            });
        }
    }

    // Fall + off-screen cleanup
    for item in &mut state.items {
        item.pos.y += item.vel_y * dt;
        item.clamp_to(&bounds);
        if item.is_below(&bounds) {
            item.alive = false;
        }
    }

    // Catches. An earned catch freezes the round before later items are
    // looked at.
    let hitbox = state.catcher.hitbox(&bounds);
    for item in &mut state.items {
        if !item.alive || !hitbox.overlaps(&item.bounds(&bounds)) {
            continue;
        }
        item.alive = false;

        let outcome = state.scores.on_catch(item.category);
        log::debug!(
            "Caught {} #{} -> {} (reset {})",
            item.category,
            item.id,
            outcome.snapshot.get(item.category),
            item.category.trade_off()
        );
        events.push(GameEvent::Caught {
            id: item.id,
            category: item.category,
            scores: outcome.snapshot,
        });

        if let Some(category) = outcome.earned {
            state.phase = RoundPhase::Earned { category };
            state.spawner.disarm();
            events.push(GameEvent::Earned { category });
            break;
        }
    }

    state.sweep_dead();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{FallingItem, WorldBounds};
    use glam::Vec2;

    fn world() -> WorldBounds {
        WorldBounds::new(1000.0, 500.0)
    }

    fn quiet_state() -> GameState {
        let mut state = GameState::new(12345, world());
        state.spawner.disarm();
        state
    }

    fn push_item(state: &mut GameState, category: Category, pos: Vec2) -> u32 {
        let id = state.next_entity_id();
        state.items.push(FallingItem {
            id,
            category,
            pos,
            vel_y: 0.0,
            size_mul: 1.0,
            alive: true,
        });
        id
    }

    /// Position that overlaps the catcher hitbox
    fn on_catcher(state: &GameState) -> Vec2 {
        state.catcher.hitbox(&state.bounds).center()
    }

    fn step(state: &mut GameState, direction: Direction) -> Vec<GameEvent> {
        let mut events = Vec::new();
        tick(state, &TickInput { direction }, SIM_DT, &mut events);
        events
    }

    #[test]
    fn catcher_moves_and_faces() {
        let mut state = quiet_state();
        let start = state.catcher.x;
        step(&mut state, Direction::Left);
        assert!(state.catcher.x < start);
        assert_eq!(state.catcher.facing, Facing::Left);

        let before = state.catcher.x;
        step(&mut state, Direction::None);
        assert_eq!(state.catcher.x, before);
        assert_eq!(state.catcher.facing, Facing::Left);

        step(&mut state, Direction::Right);
        assert_eq!(state.catcher.facing, Facing::Right);
    }

    #[test]
    fn catcher_stays_in_bounds() {
        let mut state = quiet_state();
        for _ in 0..600 {
            step(&mut state, Direction::Right);
        }
        let half = state.catcher.bounds(&state.bounds).size().x / 2.0;
        assert!((state.catcher.x - (1000.0 - half)).abs() < 1e-3);
    }

    #[test]
    fn items_fall_at_their_own_speed() {
        let mut state = quiet_state();
        let id = push_item(&mut state, Category::Love, Vec2::new(100.0, 0.0));
        state.items[0].vel_y = 300.0;
        step(&mut state, Direction::None);
        let y = state.item(id).unwrap().pos.y;
        assert!((y - 300.0 * SIM_DT).abs() < 1e-4);
    }

    #[test]
    fn off_screen_items_are_removed_without_scoring() {
        let mut state = quiet_state();
        push_item(&mut state, Category::Love, Vec2::new(100.0, 549.0));
        state.items[0].vel_y = 300.0;
        let events = step(&mut state, Direction::None);
        assert!(state.items.is_empty());
        assert!(events.is_empty());
        assert!(state.scores.is_zero());
    }

    #[test]
    fn catching_scores_and_removes_item() {
        let mut state = quiet_state();
        state.scores.on_catch(Category::Freedom);
        let pos = on_catcher(&state);
        let id = push_item(&mut state, Category::Love, pos);

        let events = step(&mut state, Direction::None);
        assert!(state.item(id).is_none());
        assert_eq!(state.scores.get(Category::Love), 1);
        assert_eq!(state.scores.get(Category::Freedom), 0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GameEvent::Caught { id: caught, .. } if caught == id));

        // Cannot be caught twice
        step(&mut state, Direction::None);
        assert_eq!(state.scores.get(Category::Love), 1);
    }

    #[test]
    fn earned_catch_freezes_before_remaining_items() {
        let mut state = quiet_state();
        for _ in 0..4 {
            state.scores.on_catch(Category::Love);
        }
        let pos = on_catcher(&state);
        let love = push_item(&mut state, Category::Love, pos);
        let passion = push_item(&mut state, Category::Passion, pos);

        let events = step(&mut state, Direction::None);
        assert_eq!(
            state.phase,
            RoundPhase::Earned {
                category: Category::Love
            }
        );
        assert!(state.item(love).is_none());
        assert!(state.item(passion).is_some(), "second item must not be caught");
        assert_eq!(state.scores.get(Category::Passion), 0);
        assert_eq!(
            events.last(),
            Some(&GameEvent::Earned {
                category: Category::Love
            })
        );
        assert_eq!(state.spawner.remaining(), None);

        // Frozen: no movement, no scoring
        let x = state.catcher.x;
        let ticks = state.time_ticks;
        let events = step(&mut state, Direction::Left);
        assert!(events.is_empty());
        assert_eq!(state.catcher.x, x);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn paused_round_does_not_step() {
        let mut state = GameState::new(1, world());
        state.phase = RoundPhase::Paused;
        for _ in 0..120 {
            step(&mut state, Direction::Right);
        }
        assert!(state.items.is_empty());
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.spawner.remaining(), Some(0.65));
    }

    #[test]
    fn first_spawn_after_fixed_delay() {
        let mut state = GameState::new(99, world());
        let mut spawned = 0;
        for _ in 0..38 {
            spawned += step(&mut state, Direction::None).len();
        }
        assert_eq!(spawned, 0);
        for _ in 0..2 {
            spawned += step(&mut state, Direction::None).len();
        }
        assert_eq!(spawned, 1);
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn test_determinism() {
        let mut state1 = GameState::new(99999, world());
        let mut state2 = GameState::new(99999, world());

        let inputs = [Direction::Left, Direction::None, Direction::Right];
        for i in 0..600 {
            let direction = inputs[i % inputs.len()];
            step(&mut state1, direction);
            step(&mut state2, direction);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.items.len(), state2.items.len());
        assert_eq!(state1.scores, state2.scores);
        assert!((state1.catcher.x - state2.catcher.x).abs() < 0.0001);
    }
}
