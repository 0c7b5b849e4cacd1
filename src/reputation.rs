//! The reputation/XP award engine.
//!
//! Every awardable site event funnels through [`ReputationEngine::award`]:
//! it resolves the action against the catalogs, applies the anti-abuse
//! checks, credits XP, recomputes the cached level, appends the history
//! entry, and persists — all under the user's key lock in the store.
//!
//! Rejections are ordinary outcomes, not errors. A spam-window or daily
//! action-count rejection writes nothing at all; a daily XP-cap rejection
//! still logs a zero-XP history entry. That asymmetry is deliberate and
//! covered by tests.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    actions::{self, ActionSpec, XpCapRule},
    levels,
    metrics::{XP_AWARDS, XP_CAPPED, XP_LEVEL_UPS, XP_LIMIT_BLOCKED, XP_SPAM_BLOCKED},
    store::JsonKeyStore,
};

/// Global per-user cooldown between any two awards, in seconds.
const SPAM_WINDOW_SECS: i64 = 5;

/// One user's XP ledger. `level` and `level_name` are cached derivations of
/// `xp` and are recomputed on every award.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserXpRecord {
    pub user_id: String,
    pub username: String,
    pub xp: u64,
    pub level: u32,
    pub level_name: String,
    /// Append-only action history; the sliding window for all limit checks.
    pub actions: Vec<XpHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserXpRecord {
    fn new(user_id: &str, username: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            xp: 0,
            level: 1,
            level_name: levels::LEVELS[0].name.to_owned(),
            actions: Vec::new(),
            last_login: None,
        }
    }
}

/// A single entry in a user's award history.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct XpHistoryEntry {
    pub action: String,
    /// XP actually credited; 0 when the daily XP cap suppressed the reward.
    pub xp: u64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

/// The reported result of an award attempt.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
    /// The user's record after the attempt; `None` for an unknown action.
    pub user: Option<UserXpRecord>,
    pub leveled_up: bool,
    /// The level held before the award; present only on a level-up, so
    /// callers can list everything unlocked across the jump.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_level: Option<u32>,
    pub daily_limit_reached: bool,
    pub spam_blocked: bool,
    pub xp_awarded: bool,
}

impl AwardOutcome {
    fn invalid_action() -> Self {
        Self {
            user: None,
            leveled_up: false,
            previous_level: None,
            new_level: None,
            daily_limit_reached: false,
            spam_blocked: false,
            xp_awarded: false,
        }
    }
}

/// Read-side projection of a user's progress toward the next level.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub current_level: u32,
    pub current_level_name: String,
    pub current_xp: u64,
    pub xp_for_next_level: u64,
    pub progress_percentage: f64,
}

/// What `apply_award` did to the record, and whether it must be persisted.
#[derive(Debug, Clone, Copy)]
struct AwardEffect {
    leveled_up: bool,
    previous_level: Option<u32>,
    new_level: Option<u32>,
    daily_limit_reached: bool,
    spam_blocked: bool,
    xp_awarded: bool,
    persist: bool,
}

impl AwardEffect {
    fn rejected() -> Self {
        Self {
            leveled_up: false,
            previous_level: None,
            new_level: None,
            daily_limit_reached: false,
            spam_blocked: false,
            xp_awarded: false,
            persist: false,
        }
    }
}

/// The award state transition, pure over (record, action, now).
///
/// Check order: spam window, then the daily action-count cap (both reject
/// without logging), then the daily XP cap (logs a zero-XP entry).
fn apply_award(
    record: &mut UserXpRecord,
    spec: &ActionSpec,
    related_id: Option<String>,
    now: DateTime<Utc>,
) -> AwardEffect {
    // The cooldown spans all actions, not just the attempted one.
    let recent = record
        .actions
        .iter()
        .any(|e| now.signed_duration_since(e.timestamp) < Duration::seconds(SPAM_WINDOW_SECS));
    if recent {
        debug!(user = %record.user_id, action = spec.key, "award blocked by spam window");
        return AwardEffect {
            spam_blocked: true,
            ..AwardEffect::rejected()
        };
    }

    // Daily windows use the UTC calendar day.
    let today = now.date_naive();
    let today_of_action = |e: &&XpHistoryEntry| -> bool {
        e.timestamp.date_naive() == today && e.action == spec.key
    };

    if let Some(cap) = spec.max_actions_per_day {
        let count = record.actions.iter().filter(today_of_action).count();
        if count >= cap as usize {
            debug!(
                user = %record.user_id,
                action = spec.key,
                count, cap, "daily action limit reached"
            );
            return AwardEffect {
                daily_limit_reached: true,
                ..AwardEffect::rejected()
            };
        }
    }

    let mut award_xp = true;
    if let Some(cap) = spec.max_xp_per_day {
        let spent = match spec.cap_rule {
            XpCapRule::SumXp => record
                .actions
                .iter()
                .filter(today_of_action)
                .map(|e| e.xp)
                .sum::<u64>(),
            XpCapRule::CountActions => {
                record.actions.iter().filter(today_of_action).count() as u64
            }
        };
        if spent >= cap {
            debug!(
                user = %record.user_id,
                action = spec.key,
                spent, cap, "daily XP cap reached, logging without credit"
            );
            award_xp = false;
        }
    }

    let old_level = levels::calculate_level(record.xp).level;
    if award_xp {
        record.xp += spec.xp;
    }

    let new_level = levels::calculate_level(record.xp);
    record.level = new_level.level;
    record.level_name = new_level.name.to_owned();

    record.actions.push(XpHistoryEntry {
        action: spec.key.to_owned(),
        xp: if award_xp { spec.xp } else { 0 },
        description: if award_xp {
            spec.description.to_owned()
        } else {
            format!("{} (no XP - daily limit reached)", spec.description)
        },
        timestamp: now,
        related_id,
    });

    if spec.key == "DAILY_LOGIN" {
        record.last_login = Some(now);
    }

    let leveled_up = new_level.level > old_level;
    AwardEffect {
        leveled_up,
        previous_level: leveled_up.then_some(old_level),
        new_level: leveled_up.then_some(new_level.level),
        daily_limit_reached: false,
        spam_blocked: false,
        xp_awarded: award_xp,
        persist: true,
    }
}

/// The award engine over a user ledger store.
#[derive(Clone)]
pub struct ReputationEngine {
    store: Arc<JsonKeyStore<UserXpRecord>>,
}

impl ReputationEngine {
    pub fn new(store: Arc<JsonKeyStore<UserXpRecord>>) -> Self {
        Self { store }
    }

    /// Attempt to credit `action` to the user, creating their ledger entry
    /// on first contact. Business rejections (unknown action, spam window,
    /// daily limits) come back as flags on the outcome, never as errors.
    pub async fn award(
        &self,
        user_id: &str,
        username: &str,
        action: &str,
        related_id: Option<String>,
    ) -> Result<AwardOutcome> {
        let Some(spec) = actions::lookup(action) else {
            warn!("invalid XP action: {action}");
            return Ok(AwardOutcome::invalid_action());
        };

        let outcome = self
            .store
            .update(user_id, |slot| {
                let record = slot.get_or_insert_with(|| UserXpRecord::new(user_id, username));
                let effect = apply_award(record, spec, related_id, Utc::now());
                let outcome = AwardOutcome {
                    user: Some(record.clone()),
                    leveled_up: effect.leveled_up,
                    previous_level: effect.previous_level,
                    new_level: effect.new_level,
                    daily_limit_reached: effect.daily_limit_reached,
                    spam_blocked: effect.spam_blocked,
                    xp_awarded: effect.xp_awarded,
                };
                (outcome, effect.persist)
            })
            .await?;

        if outcome.spam_blocked {
            counter!(XP_SPAM_BLOCKED).increment(1);
        } else if outcome.daily_limit_reached {
            counter!(XP_LIMIT_BLOCKED).increment(1);
        } else if outcome.xp_awarded {
            counter!(XP_AWARDS).increment(1);
        } else {
            counter!(XP_CAPPED).increment(1);
        }

        if outcome.leveled_up {
            counter!(XP_LEVEL_UPS).increment(1);
            info!(
                "{username} leveled up to {} (level {})",
                outcome
                    .user
                    .as_ref()
                    .map(|u| u.level_name.as_str())
                    .unwrap_or_default(),
                outcome.new_level.unwrap_or_default(),
            );
        }

        Ok(outcome)
    }

    /// One user's ledger, if they have one.
    pub async fn user(&self, user_id: &str) -> Result<Option<UserXpRecord>> {
        self.store.get(user_id).await
    }

    /// Every user ledger.
    pub async fn all_users(&self) -> Result<Vec<UserXpRecord>> {
        self.store.all().await
    }

    /// The top `limit` users by XP.
    pub async fn top_users(&self, limit: usize) -> Result<Vec<UserXpRecord>> {
        let mut users = self.store.all().await?;
        users.sort_by(|a, b| b.xp.cmp(&a.xp));
        users.truncate(limit);
        Ok(users)
    }

    /// A user's award history, most recent first.
    pub async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<XpHistoryEntry>> {
        let Some(record) = self.store.get(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut entries = record.actions;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Whether the daily login award is still available today. Advisory: the
    /// actual award (and `last_login` update) goes through [`Self::award`].
    pub async fn can_perform_daily_login(&self, user_id: &str) -> Result<bool> {
        let Some(record) = self.store.get(user_id).await? else {
            return Ok(true);
        };

        let today = Utc::now().date_naive();
        Ok(record.last_login.map(|t| t.date_naive()) != Some(today))
    }

    /// Progress toward the next level, for profile display.
    pub async fn level_progress(&self, user_id: &str) -> Result<LevelProgress> {
        let Some(record) = self.store.get(user_id).await? else {
            return Ok(LevelProgress {
                current_level: 1,
                current_level_name: levels::LEVELS[0].name.to_owned(),
                current_xp: 0,
                xp_for_next_level: levels::LEVELS[1].xp_required,
                progress_percentage: 0.0,
            });
        };

        Ok(progress_for_xp(record.xp))
    }
}

fn progress_for_xp(xp: u64) -> LevelProgress {
    let current = levels::calculate_level(xp);
    let floor = current.xp_required;
    let percentage = match levels::level_definition(current.level + 1) {
        Some(next) => {
            let span = (next.xp_required - floor) as f64;
            ((xp - floor) as f64 / span * 100.0).clamp(0.0, 100.0)
        }
        // Top of the ladder: full bar, never a division by zero.
        None => 100.0,
    };

    LevelProgress {
        current_level: current.level,
        current_level_name: current.name.to_owned(),
        current_xp: xp,
        xp_for_next_level: levels::xp_for_next_level(xp),
        progress_percentage: percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, hour, min, sec).unwrap()
    }

    fn record() -> UserXpRecord {
        UserXpRecord::new("u1", "alice")
    }

    fn capped_spec(max_actions: Option<u32>, max_xp: Option<u64>, rule: XpCapRule) -> ActionSpec {
        ActionSpec {
            key: "CREATE_DISCUSSION",
            xp: 5,
            description: "Create a new discussion thread",
            max_actions_per_day: max_actions,
            max_xp_per_day: max_xp,
            cap_rule: rule,
        }
    }

    #[test]
    fn awards_and_logs_history() {
        let mut rec = record();
        let spec = actions::lookup("CREATE_DISCUSSION").unwrap();

        let effect = apply_award(&mut rec, spec, Some("post-1".into()), at(10, 0, 0));
        assert!(effect.persist);
        assert!(effect.xp_awarded);
        assert_eq!(rec.xp, 5);
        assert_eq!(rec.actions.len(), 1);
        assert_eq!(rec.actions[0].related_id.as_deref(), Some("post-1"));
    }

    #[test]
    fn spam_window_rejects_without_logging() {
        let mut rec = record();
        let spec = actions::lookup("CREATE_DISCUSSION").unwrap();

        apply_award(&mut rec, spec, None, at(10, 0, 0));
        // A different action inside the window is still blocked; the
        // cooldown is global per user.
        let other = actions::lookup("REPLY_DISCUSSION").unwrap();
        let effect = apply_award(&mut rec, other, None, at(10, 0, 4));

        assert!(effect.spam_blocked);
        assert!(!effect.persist);
        assert_eq!(rec.xp, 5);
        assert_eq!(rec.actions.len(), 1);

        // At exactly the window boundary the award goes through.
        let effect = apply_award(&mut rec, other, None, at(10, 0, 5));
        assert!(!effect.spam_blocked);
        assert_eq!(rec.actions.len(), 2);
    }

    #[test]
    fn daily_action_cap_rejects_without_logging() {
        let mut rec = record();
        let spec = capped_spec(Some(3), None, XpCapRule::CountActions);

        for i in 0..3 {
            let effect = apply_award(&mut rec, &spec, None, at(10, i, 0));
            assert!(effect.xp_awarded);
        }

        let effect = apply_award(&mut rec, &spec, None, at(11, 0, 0));
        assert!(effect.daily_limit_reached);
        assert!(!effect.spam_blocked);
        assert!(!effect.persist);
        assert_eq!(rec.actions.len(), 3);
        assert_eq!(rec.xp, 15);
    }

    #[test]
    fn daily_action_cap_resets_next_day() {
        let mut rec = record();
        let spec = capped_spec(Some(1), None, XpCapRule::CountActions);

        apply_award(&mut rec, &spec, None, at(10, 0, 0));
        assert!(apply_award(&mut rec, &spec, None, at(12, 0, 0)).daily_limit_reached);

        let next_day = Utc.with_ymd_and_hms(2026, 8, 8, 0, 0, 1).unwrap();
        let effect = apply_award(&mut rec, &spec, None, next_day);
        assert!(effect.xp_awarded);
        assert_eq!(rec.actions.len(), 2);
    }

    #[test]
    fn xp_cap_still_logs_zero_xp_entries() {
        let mut rec = record();
        let spec = ActionSpec {
            key: "POST_GETS_LIKE",
            xp: 1,
            description: "Like received on your post",
            max_actions_per_day: None,
            max_xp_per_day: Some(3),
            cap_rule: XpCapRule::SumXp,
        };

        for i in 0..3 {
            assert!(apply_award(&mut rec, &spec, None, at(10, i, 0)).xp_awarded);
        }

        let effect = apply_award(&mut rec, &spec, None, at(11, 0, 0));
        assert!(!effect.xp_awarded);
        assert!(!effect.daily_limit_reached);
        assert!(effect.persist);
        assert_eq!(rec.xp, 3);
        assert_eq!(rec.actions.len(), 4);

        let last = rec.actions.last().unwrap();
        assert_eq!(last.xp, 0);
        assert!(last.description.contains("no XP"));
    }

    #[test]
    fn count_rule_counts_zero_xp_entries_against_the_cap() {
        let mut rec = record();
        let spec = capped_spec(None, Some(2), XpCapRule::CountActions);

        assert!(apply_award(&mut rec, &spec, None, at(10, 0, 0)).xp_awarded);
        assert!(apply_award(&mut rec, &spec, None, at(10, 1, 0)).xp_awarded);
        // Cap hit: logged with zero XP.
        assert!(!apply_award(&mut rec, &spec, None, at(10, 2, 0)).xp_awarded);
        // The zero-XP entry still counts as an occurrence.
        assert!(!apply_award(&mut rec, &spec, None, at(10, 3, 0)).xp_awarded);
        assert_eq!(rec.xp, 10);
        assert_eq!(rec.actions.len(), 4);
    }

    #[test]
    fn level_up_is_reported_once() {
        let mut rec = record();
        rec.xp = 95;
        rec.level = 1;
        let spec = actions::lookup("UPLOAD_IMAGE").unwrap();

        let effect = apply_award(&mut rec, spec, None, at(10, 0, 0));
        assert!(effect.leveled_up);
        assert_eq!(effect.new_level, Some(2));
        assert_eq!(rec.level, 2);
        assert_eq!(rec.level_name, "Squire");

        let effect = apply_award(&mut rec, spec, None, at(10, 1, 0));
        assert!(!effect.leveled_up);
        assert_eq!(effect.new_level, None);
    }

    #[test]
    fn daily_login_stamps_last_login() {
        let mut rec = record();
        let spec = actions::lookup("DAILY_LOGIN").unwrap();

        assert_eq!(rec.last_login, None);
        apply_award(&mut rec, spec, None, at(9, 0, 0));
        assert_eq!(rec.last_login, Some(at(9, 0, 0)));
    }

    #[test]
    fn progress_is_bounded() {
        let p = progress_for_xp(0);
        assert_eq!(p.progress_percentage, 0.0);
        assert_eq!(p.xp_for_next_level, 100);

        let p = progress_for_xp(175);
        assert_eq!(p.current_level, 2);
        assert!((p.progress_percentage - 50.0).abs() < 1e-9);

        let p = progress_for_xp(6000);
        assert_eq!(p.current_level, 10);
        assert_eq!(p.progress_percentage, 100.0);
        assert_eq!(p.xp_for_next_level, 0);

        for xp in [0, 50, 99, 100, 899, 900, 5999, 6000, 50_000] {
            let p = progress_for_xp(xp);
            assert!((0.0..=100.0).contains(&p.progress_percentage));
        }
    }

    mod engine {
        use super::*;

        async fn engine() -> (ReputationEngine, std::path::PathBuf) {
            let root =
                std::env::temp_dir().join(format!("meeplehall-rep-{}", uuid::Uuid::new_v4()));
            let store = JsonKeyStore::open(&root).await.unwrap();
            (ReputationEngine::new(Arc::new(store)), root)
        }

        #[tokio::test]
        async fn unknown_action_is_a_noop() -> Result<()> {
            let (engine, root) = engine().await;

            let outcome = engine.award("u1", "alice", "NOT_A_REAL_ACTION", None).await?;
            assert!(outcome.user.is_none());
            assert!(!outcome.leveled_up);
            // No record was created as a side effect.
            assert!(engine.user("u1").await?.is_none());

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }

        #[tokio::test]
        async fn first_award_creates_the_ledger() -> Result<()> {
            let (engine, root) = engine().await;

            let outcome = engine.award("u1", "alice", "CREATE_DISCUSSION", None).await?;
            let user = outcome.user.unwrap();
            assert_eq!(user.xp, 5);
            assert_eq!(user.level, 1);
            assert!(outcome.xp_awarded);

            let stored = engine.user("u1").await?.unwrap();
            assert_eq!(stored.actions.len(), 1);

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }

        #[tokio::test]
        async fn back_to_back_awards_hit_the_spam_guard() -> Result<()> {
            let (engine, root) = engine().await;

            let first = engine.award("u1", "alice", "CREATE_DISCUSSION", None).await?;
            assert!(first.xp_awarded);

            let second = engine.award("u1", "alice", "REPLY_DISCUSSION", None).await?;
            assert!(second.spam_blocked);
            assert_eq!(second.user.unwrap().xp, 5);
            assert_eq!(engine.user("u1").await?.unwrap().actions.len(), 1);

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }

        #[tokio::test]
        async fn login_gate_flips_after_daily_login() -> Result<()> {
            let (engine, root) = engine().await;

            assert!(engine.can_perform_daily_login("u1").await?);
            engine.award("u1", "alice", "DAILY_LOGIN", None).await?;
            assert!(!engine.can_perform_daily_login("u1").await?);

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }

        #[tokio::test]
        async fn top_users_sorts_by_xp() -> Result<()> {
            let (engine, root) = engine().await;

            engine.award("u1", "alice", "CREATE_DISCUSSION", None).await?;
            engine.award("u2", "bob", "UPLOAD_IMAGE", None).await?;

            let top = engine.top_users(10).await?;
            assert_eq!(top.len(), 2);
            assert_eq!(top[0].username, "bob");
            assert_eq!(top[1].username, "alice");

            let top = engine.top_users(1).await?;
            assert_eq!(top.len(), 1);

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }
    }
}
