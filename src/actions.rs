//! Action catalogs and the daily limit policy.
//!
//! Two catalogs share the same award mechanics: the leveling catalog covers
//! site-wide XP actions (logins, uploads, likes received), the forum catalog
//! covers the reputation point schedule for forum writes. Keys are unique
//! across both so a single lookup resolves any awardable action.

/// How a per-day XP ceiling is evaluated against today's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpCapRule {
    /// Count today's occurrences of the action against the cap.
    CountActions,
    /// Sum the XP actually credited today for the action against the cap.
    SumXp,
}

/// One awardable action: base reward plus its anti-abuse limits.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    /// Stable key, as stored in history entries and accepted over the API.
    pub key: &'static str,
    /// Base XP credited per occurrence.
    pub xp: u64,
    /// Human-readable description, recorded in the history entry.
    pub description: &'static str,
    /// Cap on how many times the action may be logged per day, if any.
    pub max_actions_per_day: Option<u32>,
    /// Cap on cumulative XP from this action per day, if any.
    pub max_xp_per_day: Option<u64>,
    /// How `max_xp_per_day` is evaluated.
    pub cap_rule: XpCapRule,
}

const fn action(
    key: &'static str,
    xp: u64,
    description: &'static str,
    max_actions_per_day: Option<u32>,
    max_xp_per_day: Option<u64>,
    cap_rule: XpCapRule,
) -> ActionSpec {
    ActionSpec { key, xp, description, max_actions_per_day, max_xp_per_day, cap_rule }
}

/// Gamified leveling actions.
///
/// Like-type actions (likes received, game votes) credit XP to the content
/// owner and carry no per-day occurrence cap; their ceilings are on summed
/// XP instead.
pub static LEVELING_ACTIONS: &[ActionSpec] = &[
    action("DAILY_LOGIN", 2, "Daily login", Some(10), Some(10), XpCapRule::CountActions),
    action("VOTE_GAME", 1, "Vote for a game", None, Some(50), XpCapRule::SumXp),
    action("POST_GETS_LIKE", 1, "Like received on your post", None, Some(100), XpCapRule::SumXp),
    action(
        "COMMENT_GETS_LIKE",
        1,
        "Like received on your comment",
        None,
        Some(100),
        XpCapRule::SumXp,
    ),
    action("REPLY_DISCUSSION", 1, "Reply to a discussion", None, None, XpCapRule::CountActions),
    action(
        "CREATE_DISCUSSION",
        5,
        "Create a new discussion thread",
        None,
        None,
        XpCapRule::CountActions,
    ),
    action(
        "UPLOAD_IMAGE",
        10,
        "Upload an image to the gallery",
        Some(10),
        Some(5),
        XpCapRule::CountActions,
    ),
    action("UPLOAD_DIE_DESIGN", 10, "Upload a new die design", None, None, XpCapRule::CountActions),
    action(
        "WIN_DICE_THRONE_VOTE",
        20,
        "Win a Dice Throne vote",
        None,
        None,
        XpCapRule::CountActions,
    ),
];

/// Forum reputation point schedule.
pub static FORUM_ACTIONS: &[ActionSpec] = &[
    action("CREATE_POST", 5, "Create a forum post", Some(10), Some(10), XpCapRule::CountActions),
    action(
        "CREATE_COMMENT",
        1,
        "Comment on a forum post",
        Some(50),
        Some(20),
        XpCapRule::CountActions,
    ),
    action(
        "COMMENT_GALLERY",
        1,
        "Comment on a gallery image",
        Some(50),
        Some(20),
        XpCapRule::CountActions,
    ),
];

/// Resolve an action key against both catalogs, leveling catalog first.
pub fn lookup(key: &str) -> Option<&'static ActionSpec> {
    LEVELING_ACTIONS
        .iter()
        .chain(FORUM_ACTIONS.iter())
        .find(|a| a.key == key)
}
