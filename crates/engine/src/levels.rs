//! Level tiers

use serde::Serialize;

/// A rank and the XP needed to reach it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelTier {
    pub rank: i32,
    pub name: &'static str,
    pub threshold: i64,
}

/// All tiers, sorted by threshold
pub static LEVELS: &[LevelTier] = &[
    LevelTier {
        rank: 1,
        name: "Bronze",
        threshold: 0,
    },
    LevelTier {
        rank: 2,
        name: "Silver",
        threshold: 1000,
    },
    LevelTier {
        rank: 3,
        name: "Gold",
        threshold: 5000,
    },
];

/// Resolved level for an XP total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Level {
    pub rank: i32,
    pub name: &'static str,
    /// `None` at the top tier
    pub xp_to_next: Option<i64>,
}

/// Resolve the level for an XP total. Negative totals resolve like zero.
pub fn level_for_xp(xp: i64) -> Level {
    let xp = xp.max(0);
    let idx = LEVELS
        .iter()
        .rposition(|tier| xp >= tier.threshold)
        .unwrap_or(0);
    let current = LEVELS[idx];

    Level {
        rank: current.rank,
        name: current.name,
        xp_to_next: LEVELS.get(idx + 1).map(|next| next.threshold - xp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_is_bronze() {
        let level = level_for_xp(0);
        assert_eq!(level.rank, 1);
        assert_eq!(level.name, "Bronze");
        assert_eq!(level.xp_to_next, Some(1000));
    }

    #[test]
    fn test_just_below_silver() {
        let level = level_for_xp(999);
        assert_eq!((level.rank, level.name, level.xp_to_next), (1, "Bronze", Some(1)));
    }

    #[test]
    fn test_silver_threshold() {
        let level = level_for_xp(1000);
        assert_eq!((level.rank, level.name, level.xp_to_next), (2, "Silver", Some(4000)));
    }

    #[test]
    fn test_gold_is_top() {
        let level = level_for_xp(5000);
        assert_eq!((level.rank, level.name, level.xp_to_next), (3, "Gold", None));
        assert_eq!(level_for_xp(1_000_000).xp_to_next, None);
    }

    #[test]
    fn test_negative_resolves_as_zero() {
        assert_eq!(level_for_xp(-50), level_for_xp(0));
    }

    #[test]
    fn test_tiers_sorted() {
        assert!(LEVELS.windows(2).all(|w| w[0].threshold < w[1].threshold && w[0].rank < w[1].rank));
        assert_eq!(LEVELS[0].threshold, 0);
    }

    proptest! {
        #[test]
        fn prop_rank_monotonic(a in 0i64..20_000, b in 0i64..20_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for_xp(lo).rank <= level_for_xp(hi).rank);
        }

        #[test]
        fn prop_xp_to_next_positive(xp in 0i64..20_000) {
            if let Some(needed) = level_for_xp(xp).xp_to_next {
                prop_assert!(needed > 0);
            }
        }
    }
}
