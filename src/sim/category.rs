//! The six life facets and the fixed trade-off rule between them

use serde::{Deserialize, Serialize};

/// Highest score a category can reach; reaching it earns the category
pub const MAX_SCORE: u8 = 5;

/// A scoring category carried by every falling item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Love,
    Passion,
    Freedom,
    Ambition,
    Identity,
    Friendship,
}

/// Fixed iteration order (UI layout and spawn sampling)
pub const CATEGORY_ORDER: [Category; 6] = [
    Category::Love,
    Category::Passion,
    Category::Freedom,
    Category::Ambition,
    Category::Identity,
    Category::Friendship,
];

impl Category {
    /// Number of categories
    pub const COUNT: usize = CATEGORY_ORDER.len();

    /// Position in [`CATEGORY_ORDER`]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The category that is zeroed whenever `self` is caught.
    ///
    /// A permutation with no fixed points.
    pub fn trade_off(self) -> Category {
        match self {
            Category::Love => Category::Freedom,
            Category::Passion => Category::Identity,
            Category::Freedom => Category::Ambition,
            Category::Ambition => Category::Friendship,
            Category::Identity => Category::Love,
            Category::Friendship => Category::Passion,
        }
    }

    /// Visual size compensation for transparent padding in the item art.
    /// Affects display size only, never gameplay rules.
    pub fn visual_size_multiplier(self) -> f32 {
        match self {
            Category::Identity => 1.15,
            _ => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Love => "Love",
            Category::Passion => "Passion",
            Category::Freedom => "Freedom",
            Category::Ambition => "Ambition",
            Category::Identity => "Identity",
            Category::Friendship => "Friendship",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matches_indices() {
        for (i, c) in CATEGORY_ORDER.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn trade_off_is_a_derangement() {
        let mut seen = [false; Category::COUNT];
        for c in CATEGORY_ORDER {
            let partner = c.trade_off();
            assert_ne!(partner, c, "{c} must not trade off against itself");
            assert!(!seen[partner.index()], "{partner} appears twice as a target");
            seen[partner.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn only_identity_is_compensated() {
        for c in CATEGORY_ORDER {
            let expected = if c == Category::Identity { 1.15 } else { 1.0 };
            assert_eq!(c.visual_size_multiplier(), expected);
        }
    }
}
