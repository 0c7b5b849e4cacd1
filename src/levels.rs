//! Level table and XP-to-level derivation.

/// A single rung on the leveling ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDefinition {
    /// Level number, contiguous starting at 1.
    pub level: u32,
    /// Display name for the level.
    pub name: &'static str,
    /// Cumulative XP required to reach this level.
    pub xp_required: u64,
}

/// All level definitions, ordered ascending by `xp_required`.
pub static LEVELS: &[LevelDefinition] = &[
    LevelDefinition { level: 1, name: "Commoner", xp_required: 0 },
    LevelDefinition { level: 2, name: "Squire", xp_required: 100 },
    LevelDefinition { level: 3, name: "Knight", xp_required: 250 },
    LevelDefinition { level: 4, name: "Champion", xp_required: 500 },
    LevelDefinition { level: 5, name: "Baron/Baroness", xp_required: 900 },
    LevelDefinition { level: 6, name: "Lord/Lady", xp_required: 1400 },
    LevelDefinition { level: 7, name: "Archmage", xp_required: 2000 },
    LevelDefinition { level: 8, name: "Duke/Duchess", xp_required: 2800 },
    LevelDefinition { level: 9, name: "Prince", xp_required: 4000 },
    LevelDefinition { level: 10, name: "King/Queen", xp_required: 6000 },
];

/// Return the highest level whose threshold is at or below `xp`.
///
/// Total over all inputs: XP below every threshold maps to level 1.
pub fn calculate_level(xp: u64) -> &'static LevelDefinition {
    LEVELS
        .iter()
        .rev()
        .find(|l| xp >= l.xp_required)
        .unwrap_or(&LEVELS[0])
}

/// Look up a level definition by its number.
pub fn level_definition(level: u32) -> Option<&'static LevelDefinition> {
    LEVELS.iter().find(|l| l.level == level)
}

/// XP still needed to reach the next level, or 0 at the top of the ladder.
pub fn xp_for_next_level(xp: u64) -> u64 {
    let current = calculate_level(xp);
    match level_definition(current.level + 1) {
        Some(next) => next.xp_required - xp,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries_are_exact() {
        assert_eq!(calculate_level(0).level, 1);
        assert_eq!(calculate_level(0).name, "Commoner");
        assert_eq!(calculate_level(99).level, 1);
        assert_eq!(calculate_level(100).level, 2);
        assert_eq!(calculate_level(249).level, 2);
        assert_eq!(calculate_level(250).level, 3);
        assert_eq!(calculate_level(6000).level, 10);
        assert_eq!(calculate_level(1_000_000).level, 10);
    }

    #[test]
    fn levels_are_monotonic_in_xp() {
        let mut prev = 0;
        for xp in 0..7000 {
            let level = calculate_level(xp).level;
            assert!(level >= prev, "level regressed at xp={xp}");
            prev = level;
        }
    }

    #[test]
    fn table_is_ordered_and_contiguous() {
        for (i, def) in LEVELS.iter().enumerate() {
            assert_eq!(def.level, i as u32 + 1);
            if i > 0 {
                assert!(def.xp_required > LEVELS[i - 1].xp_required);
            }
        }
    }

    #[test]
    fn next_level_distance() {
        assert_eq!(xp_for_next_level(0), 100);
        assert_eq!(xp_for_next_level(95), 5);
        assert_eq!(xp_for_next_level(100), 150);
        // Max level has no next rung.
        assert_eq!(xp_for_next_level(6000), 0);
        assert_eq!(xp_for_next_level(9999), 0);
    }
}
