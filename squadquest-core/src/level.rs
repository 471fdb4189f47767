//! Leveling calculator.
//!
//! Pure, deterministic mapping from lifetime XP to level. The XP required to
//! advance from level L to L+1 follows the arithmetic progression
//! `100 + (L-1)*50` (level 1→2 costs 100, 2→3 costs 150, and so on).
//!
//! Level is always a cached derived value: every component that stores a
//! level recomputes it through this module, never independently.

use serde::{Deserialize, Serialize};

/// Result of resolving a lifetime XP total into a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level, starting at 1.
    pub level: i32,
    /// XP accumulated inside the current level.
    pub xp_into_level: i64,
    /// XP required to advance from the current level to the next.
    pub xp_for_next_level: i64,
}

/// XP required to advance from `level` to `level + 1`.
pub fn xp_to_advance(level: i32) -> i64 {
    100 + (level as i64 - 1) * 50
}

/// Total XP at which `level` begins (level 1 begins at 0).
///
/// Closed form of the requirement series: sum of `100 + (k-1)*50`
/// for k in 1..level.
pub fn xp_at_level_start(level: i32) -> i64 {
    let n = (level as i64 - 1).max(0);
    n * 100 + 50 * n * (n - 1) / 2
}

/// Resolve a lifetime XP total into a level and progress within it.
///
/// Negative input is clamped to 0 so the function stays total; the result
/// is monotonic in `total_xp`.
pub fn level_from_total_xp(total_xp: i64) -> LevelProgress {
    let mut remaining = total_xp.max(0);
    let mut level = 1;
    while remaining >= xp_to_advance(level) {
        remaining -= xp_to_advance(level);
        level += 1;
    }
    LevelProgress {
        level,
        xp_into_level: remaining,
        xp_for_next_level: xp_to_advance(level),
    }
}
