//! Trade-off scoring
//!
//! Catching a category bumps it (clamped to [`MAX_SCORE`]) and zeroes its
//! trade-off partner. The board is the single source of truth for a round.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::category::{CATEGORY_ORDER, Category, MAX_SCORE};

/// Per-category scores, every value in `0..=MAX_SCORE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreBoard {
    scores: [u8; Category::COUNT],
}

/// Result of applying one catch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchOutcome {
    /// Board after the catch
    pub snapshot: ScoreBoard,
    /// Set when the caught category is at [`MAX_SCORE`]
    pub earned: Option<Category>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> u8 {
        self.scores[category.index()]
    }

    /// Apply the catch/trade-off rule.
    ///
    /// The partner reset happens even when the increment saturates, and a
    /// category already at max is reported as earned again.
    pub fn on_catch(&mut self, category: Category) -> CatchOutcome {
        let slot = &mut self.scores[category.index()];
        *slot = (*slot + 1).min(MAX_SCORE);

        self.scores[category.trade_off().index()] = 0;

        let earned = (self.get(category) == MAX_SCORE).then_some(category);
        CatchOutcome {
            snapshot: *self,
            earned,
        }
    }

    pub fn reset(&mut self) {
        self.scores = [0; Category::COUNT];
    }

    pub fn is_zero(&self) -> bool {
        self.scores.iter().all(|s| *s == 0)
    }

    /// `(category, score)` pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (Category, u8)> + '_ {
        CATEGORY_ORDER.iter().map(|c| (*c, self.get(*c)))
    }
}

// Serialized as `{"Love": 0, "Passion": 3, ...}` in display order
impl Serialize for ScoreBoard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::COUNT))?;
        for (category, score) in self.iter() {
            map.serialize_entry(category.as_str(), &score)?;
        }
        map.end()
    }
}
