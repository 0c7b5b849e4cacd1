//! Level gating for dice-avatar cosmetics.
//!
//! Each asset is either gated behind a level threshold or reserved for a
//! special out-of-band event (donations, weekly contest wins). The two are
//! distinct variants so a special asset can never leak through a numeric
//! level comparison; an asset with no entry at all is ungated.

use crate::levels;

/// How an asset unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockGate {
    /// Unlocked at and above this level.
    Threshold(u32),
    /// Granted only by a special event; never unlocked by leveling.
    SpecialEvent,
}

/// One gated asset.
#[derive(Debug, Clone, Copy)]
pub struct AssetRequirement {
    pub category: &'static str,
    pub name: &'static str,
    pub gate: UnlockGate,
    pub description: &'static str,
}

impl AssetRequirement {
    /// The level threshold, or `None` for special-event assets.
    pub fn required_level(&self) -> Option<u32> {
        match self.gate {
            UnlockGate::Threshold(level) => Some(level),
            UnlockGate::SpecialEvent => None,
        }
    }

    /// Display name of the gating level, or `"Special"`.
    pub fn gate_name(&self) -> &'static str {
        match self.gate {
            UnlockGate::Threshold(level) => levels::level_definition(level)
                .map(|l| l.name)
                .unwrap_or("Unknown"),
            UnlockGate::SpecialEvent => "Special",
        }
    }
}

const fn at(
    category: &'static str,
    name: &'static str,
    level: u32,
    description: &'static str,
) -> AssetRequirement {
    AssetRequirement {
        category,
        name,
        gate: UnlockGate::Threshold(level),
        description,
    }
}

const fn special(
    category: &'static str,
    name: &'static str,
    description: &'static str,
) -> AssetRequirement {
    AssetRequirement {
        category,
        name,
        gate: UnlockGate::SpecialEvent,
        description,
    }
}

/// Every gated asset, grouped by category.
pub static ASSET_REQUIREMENTS: &[AssetRequirement] = &[
    // Backgrounds
    at("backgrounds", "WhiteBackground", 1, "Basic white background"),
    at("backgrounds", "BlackBackground", 1, "Basic black background"),
    at("backgrounds", "BlueBackground", 2, "Blue background"),
    at("backgrounds", "GreenBackground", 2, "Green background"),
    at("backgrounds", "RedBackground", 2, "Red background"),
    at("backgrounds", "YellowBackground", 2, "Yellow background"),
    at("backgrounds", "GameBoardBackground", 4, "Game board themed background"),
    at("backgrounds", "ChessBoardBackground", 6, "Chess board themed background"),
    at("backgrounds", "CasinoBackground", 8, "Casino themed background"),
    at("backgrounds", "CardGameBackground", 10, "Card game themed background"),
    special(
        "backgrounds",
        "KingsRoomBackground",
        "King's Room background - only unlockable by winning Dice of the Week",
    ),
    // Dice
    at("dice", "WhiteDice", 1, "Basic white dice"),
    at("dice", "BlackDice", 2, "Basic black dice"),
    at("dice", "BlueDice", 2, "Basic blue dice"),
    at("dice", "GreenDice", 2, "Basic green dice"),
    at("dice", "OrangeDice", 2, "Orange dice"),
    at("dice", "PinkDice", 2, "Pink dice"),
    at("dice", "PurpleDice", 2, "Purple dice"),
    at("dice", "RedDice", 2, "Basic red dice"),
    at("dice", "YellowDice", 2, "Basic yellow dice"),
    at("dice", "BoxDice", 3, "Box-themed dice"),
    at("dice", "IceCubeDice", 5, "Ice cube dice"),
    at("dice", "RubikDice", 7, "Rubik's cube dice"),
    at("dice", "Dice-SkullDice", 8, "Skull-themed dice"),
    at("dice", "SafeDice", 9, "Safe-themed dice"),
    special("dice", "GiftDice", "Gift dice - only unlockable by donating to the page"),
    special("dice", "Dice-BotDice", "Dice-Bot dice - only unlockable by donating to the page"),
    // Patterns
    at("patterns", "1-2-3", 1, "Basic 1-2-3 pattern"),
    at("patterns", "2-1-4", 1, "Basic 2-1-4 pattern"),
    at("patterns", "3-6-5", 1, "Basic 3-6-5 pattern"),
    at("patterns", "4-5-6", 1, "Basic 4-5-6 pattern"),
    at("patterns", "5-4-1", 1, "Basic 5-4-1 pattern"),
    at("patterns", "6-3-2", 1, "Basic 6-3-2 pattern"),
    at("patterns", "ABC", 4, "Alphabet pattern"),
    at("patterns", "Mistery", 6, "Mystery pattern"),
    at("patterns", "Suits", 6, "Card suit pattern"),
    at("patterns", "Elements", 8, "Elemental pattern"),
    // Accessories
    at("accessories", "Bow", 2, "Basic bow accessory"),
    at("accessories", "Belt", 4, "Basic belt accessory"),
    at("accessories", "Blush", 5, "Blush accessory"),
    at("accessories", "Sunglasses", 5, "Cool sunglasses accessory"),
    at("accessories", "Scar", 7, "Scar accessory"),
    at("accessories", "Patch", 9, "Patch accessory"),
    at("accessories", "KingsCape", 10, "King's cape - very exclusive!"),
    // Crowns & Hats
    at("Crowns & Hats", "Cone", 2, "Basic cone hat"),
    at("Crowns & Hats", "Joker", 2, "Joker hat"),
    at("Crowns & Hats", "TopHat", 5, "Elegant top hat"),
    at("Crowns & Hats", "SorcererHat", 8, "Powerful sorcerer hat"),
    at("Crowns & Hats", "WizardHat", 8, "Magical wizard hat"),
    at("Crowns & Hats", "PrincesCrown", 9, "Prince's crown - royal item!"),
    at("Crowns & Hats", "QueensCrown", 10, "Queen's crown - ultimate prestige!"),
    at("Crowns & Hats", "KingsCrown", 10, "King's crown - ultimate prestige!"),
    // Items
    at("items", "ManaPotion", 1, "Mana potion"),
    at("items", "HealthPotion", 1, "Health potion"),
    at("items", "CardCastle", 3, "Card castle item"),
    at("items", "PokerChips", 4, "Poker chips"),
    at("items", "Map", 5, "Adventure map"),
    at("items", "Coins", 5, "Coins"),
    at("items", "Shield", 6, "Basic shield"),
    at("items", "Mace", 6, "Heavy mace"),
    at("items", "Bomb", 7, "Explosive bomb"),
    at("items", "Staff", 8, "Magical staff"),
    at("items", "Spellbook", 8, "Ancient spellbook"),
    at("items", "Sword", 9, "Basic sword"),
    at("items", "HolyGrail", 10, "Legendary holy grail"),
    special("items", "KingsCard", "King's Card - only unlockable by winning Card of the Week"),
    // Companions
    at("companions", "Meeple", 3, "Basic meeple companion"),
    at("companions", "Mini-Dice", 5, "Mini dice companion"),
    at("companions", "JackInTheBox", 6, "Jack in the box companion"),
    at("companions", "ChessKnight", 6, "Chess knight companion"),
    at("companions", "Dice-Skull", 7, "Legendary dice skull companion"),
    at("companions", "EightBall", 8, "Eight ball companion"),
    at("companions", "Mimic", 9, "Mysterious mimic companion"),
    at("companions", "Dice-Bot", 10, "Legendary Dice-Bot companion - unlocks at level 10"),
    // Titles
    at("titles", "Commoner", 1, "Basic title for new players"),
    at("titles", "Squire", 2, "Squire title"),
    at("titles", "Knight", 3, "Knight title"),
    at("titles", "Champion", 4, "Champion title"),
    at("titles", "Baron", 5, "Baron title"),
    at("titles", "Baroness", 5, "Baroness title"),
    at("titles", "Lord", 6, "Lord title"),
    at("titles", "Lady", 6, "Lady title"),
    at("titles", "Archmage", 7, "Archmage title"),
    at("titles", "Duke", 8, "Duke title"),
    at("titles", "Duchess", 8, "Duchess title"),
    at("titles", "Prince", 9, "Prince title"),
    at("titles", "Princess", 9, "Princess title"),
    at("titles", "King", 10, "King title"),
    at("titles", "Queen", 10, "Queen title"),
];

/// Look up the gate for an asset. `None` means the asset is ungated.
pub fn requirement(category: &str, name: &str) -> Option<&'static AssetRequirement> {
    ASSET_REQUIREMENTS
        .iter()
        .find(|r| r.category == category && r.name == name)
}

/// Whether a user at `user_level` can use the asset through normal leveling.
/// Special-event assets are never reachable this way.
pub fn can_access(user_level: u32, category: &str, name: &str) -> bool {
    match requirement(category, name) {
        None => true,
        Some(req) => match req.gate {
            UnlockGate::Threshold(level) => user_level >= level,
            UnlockGate::SpecialEvent => false,
        },
    }
}

/// All assets in a category unlocked at `user_level`.
pub fn available_assets(user_level: u32, category: &str) -> Vec<&'static AssetRequirement> {
    ASSET_REQUIREMENTS
        .iter()
        .filter(|r| r.category == category)
        .filter(|r| matches!(r.gate, UnlockGate::Threshold(level) if user_level >= level))
        .collect()
}

/// Assets whose threshold falls in `(old_level, new_level]`, for "you just
/// unlocked" notifications. Special-event assets are never surfaced.
pub fn newly_unlocked(old_level: u32, new_level: u32) -> Vec<&'static AssetRequirement> {
    ASSET_REQUIREMENTS
        .iter()
        .filter(|r| {
            matches!(r.gate, UnlockGate::Threshold(level) if level > old_level && level <= new_level)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_gating() {
        assert!(can_access(5, "dice", "BoxDice"));
        assert!(can_access(3, "dice", "BoxDice"));
        assert!(!can_access(2, "dice", "BoxDice"));
    }

    #[test]
    fn ungated_assets_are_open() {
        assert!(can_access(1, "dice", "NoSuchDice"));
        assert!(can_access(1, "nonexistent-category", "Anything"));
    }

    #[test]
    fn special_assets_never_unlock_by_level() {
        assert!(!can_access(10, "dice", "GiftDice"));
        assert!(!can_access(10, "backgrounds", "KingsRoomBackground"));

        for req in newly_unlocked(0, 10) {
            assert_ne!(req.gate, UnlockGate::SpecialEvent, "{} surfaced", req.name);
        }
        assert!(available_assets(10, "dice").iter().all(|r| r.name != "GiftDice"));
    }

    #[test]
    fn newly_unlocked_is_half_open() {
        let unlocked = newly_unlocked(1, 2);
        assert!(unlocked.iter().any(|r| r.name == "BlueBackground"));
        assert!(unlocked.iter().any(|r| r.category == "titles" && r.name == "Squire"));
        // Level-1 assets were already held, level-3 ones are still locked.
        assert!(unlocked.iter().all(|r| r.required_level() == Some(2)));

        assert!(newly_unlocked(4, 4).is_empty());
    }

    #[test]
    fn available_grows_with_level() {
        let at_one = available_assets(1, "dice").len();
        let at_five = available_assets(5, "dice").len();
        let at_ten = available_assets(10, "dice").len();
        assert!(at_one < at_five && at_five < at_ten);
        // Special dice are excluded even at max level.
        assert_eq!(at_ten, 14);
    }

    #[test]
    fn gate_names_come_from_the_level_table() {
        assert_eq!(requirement("dice", "BoxDice").unwrap().gate_name(), "Knight");
        assert_eq!(requirement("dice", "GiftDice").unwrap().gate_name(), "Special");
    }
}
