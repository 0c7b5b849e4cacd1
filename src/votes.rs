//! Per-post vote ledger with toggle semantics.
//!
//! Each (post, user) pair is in one of three states: no vote, up, or down.
//! Submitting the vote a user already holds removes it; submitting the other
//! direction switches it. Tallies are kept in lockstep with the per-user map
//! under the post's key lock.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::{metrics::VOTES_CAST, store::JsonKeyStore};

/// A vote direction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

/// One user's current vote on a post.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserVote {
    pub vote: VoteKind,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate tallies plus each user's current vote.
///
/// Invariant: `upvotes` equals the number of `Up` entries in
/// `per_user_vote`, likewise for `downvotes`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostVoteState {
    pub upvotes: u32,
    pub downvotes: u32,
    pub per_user_vote: BTreeMap<String, UserVote>,
}

impl PostVoteState {
    /// The user's current vote, if any.
    pub fn vote_of(&self, user_id: &str) -> Option<VoteKind> {
        self.per_user_vote.get(user_id).map(|v| v.vote)
    }
}

/// A stored forum post: creation metadata plus its vote state.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub post_id: String,
    pub title: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub votes: PostVoteState,
}

fn tally_of(state: &mut PostVoteState, kind: VoteKind) -> &mut u32 {
    match kind {
        VoteKind::Up => &mut state.upvotes,
        VoteKind::Down => &mut state.downvotes,
    }
}

/// The vote state transition, pure over (state, user, vote, now).
fn apply_vote(state: &mut PostVoteState, user_id: &str, vote: VoteKind, now: DateTime<Utc>) {
    let current = state.vote_of(user_id);

    if current == Some(vote) {
        // Toggle off.
        state.per_user_vote.remove(user_id);
        let tally = tally_of(state, vote);
        // A consistent state machine never underflows here; the clamp only
        // guards against damaged persisted data.
        *tally = tally.saturating_sub(1);
        return;
    }

    if let Some(previous) = current {
        let tally = tally_of(state, previous);
        *tally = tally.saturating_sub(1);
    }

    state.per_user_vote.insert(
        user_id.to_owned(),
        UserVote {
            vote,
            timestamp: now,
        },
    );
    *tally_of(state, vote) += 1;
}

/// The vote ledger over a post store.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<JsonKeyStore<PostRecord>>,
}

impl VoteLedger {
    pub fn new(store: Arc<JsonKeyStore<PostRecord>>) -> Self {
        Self { store }
    }

    /// Create a post with zero votes. Returns the stored record.
    pub async fn create_post(
        &self,
        post_id: &str,
        title: &str,
        author_id: &str,
        author_name: &str,
    ) -> Result<PostRecord> {
        self.store
            .update(post_id, |slot| {
                let record = slot.get_or_insert_with(|| PostRecord {
                    post_id: post_id.to_owned(),
                    title: title.to_owned(),
                    author_id: author_id.to_owned(),
                    author_name: author_name.to_owned(),
                    created_at: Utc::now(),
                    votes: PostVoteState::default(),
                });
                (record.clone(), true)
            })
            .await
    }

    /// Fetch a post, if it exists.
    pub async fn post(&self, post_id: &str) -> Result<Option<PostRecord>> {
        self.store.get(post_id).await
    }

    /// Apply a user's vote to a post as one atomic read-modify-write.
    ///
    /// Returns the updated record, or `None` if the post does not exist —
    /// a recoverable negative result, not an error.
    pub async fn update_vote(
        &self,
        post_id: &str,
        vote: VoteKind,
        user_id: &str,
    ) -> Result<Option<PostRecord>> {
        let updated = self
            .store
            .update(post_id, |slot| match slot {
                Some(record) => {
                    apply_vote(&mut record.votes, user_id, vote, Utc::now());
                    (Some(record.clone()), true)
                }
                None => (None, false),
            })
            .await?;

        if updated.is_some() {
            counter!(VOTES_CAST).increment(1);
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    fn consistent(state: &PostVoteState) -> bool {
        let ups = state.per_user_vote.values().filter(|v| v.vote == VoteKind::Up).count();
        let downs = state.per_user_vote.values().filter(|v| v.vote == VoteKind::Down).count();
        state.upvotes as usize == ups && state.downvotes as usize == downs
    }

    #[test]
    fn toggle_removes_the_vote() {
        let mut state = PostVoteState::default();

        apply_vote(&mut state, "u1", VoteKind::Up, now());
        assert_eq!(state.upvotes, 1);
        assert_eq!(state.vote_of("u1"), Some(VoteKind::Up));

        apply_vote(&mut state, "u1", VoteKind::Up, now());
        assert_eq!(state.upvotes, 0);
        assert_eq!(state.vote_of("u1"), None);
        assert!(consistent(&state));
    }

    #[test]
    fn switching_moves_the_tally() {
        let mut state = PostVoteState::default();

        apply_vote(&mut state, "u1", VoteKind::Up, now());
        apply_vote(&mut state, "u1", VoteKind::Down, now());

        assert_eq!(state.upvotes, 0);
        assert_eq!(state.downvotes, 1);
        assert_eq!(state.vote_of("u1"), Some(VoteKind::Down));
        assert!(consistent(&state));
    }

    #[test]
    fn users_vote_independently() {
        let mut state = PostVoteState::default();

        apply_vote(&mut state, "u1", VoteKind::Up, now());
        apply_vote(&mut state, "u2", VoteKind::Up, now());
        apply_vote(&mut state, "u3", VoteKind::Down, now());

        assert_eq!(state.upvotes, 2);
        assert_eq!(state.downvotes, 1);

        apply_vote(&mut state, "u2", VoteKind::Up, now());
        assert_eq!(state.upvotes, 1);
        assert!(consistent(&state));
    }

    #[test]
    fn tallies_never_go_negative() {
        let mut state = PostVoteState::default();

        // Damaged data: a user entry with no matching tally.
        state.per_user_vote.insert(
            "u1".into(),
            UserVote {
                vote: VoteKind::Up,
                timestamp: now(),
            },
        );

        apply_vote(&mut state, "u1", VoteKind::Up, now());
        assert_eq!(state.upvotes, 0);
        assert_eq!(state.downvotes, 0);
    }

    mod ledger {
        use super::*;

        async fn ledger() -> (VoteLedger, std::path::PathBuf) {
            let root =
                std::env::temp_dir().join(format!("meeplehall-votes-{}", uuid::Uuid::new_v4()));
            let store = JsonKeyStore::open(&root).await.unwrap();
            (VoteLedger::new(Arc::new(store)), root)
        }

        #[tokio::test]
        async fn missing_post_yields_none() -> Result<()> {
            let (ledger, root) = ledger().await;

            let result = ledger.update_vote("nope", VoteKind::Up, "u1").await?;
            assert!(result.is_none());

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }

        #[tokio::test]
        async fn create_then_vote_roundtrip() -> Result<()> {
            let (ledger, root) = ledger().await;

            let post = ledger.create_post("p1", "Best worker placement?", "u9", "carol").await?;
            assert_eq!(post.votes.upvotes, 0);

            let post = ledger.update_vote("p1", VoteKind::Up, "u1").await?.unwrap();
            assert_eq!(post.votes.upvotes, 1);
            assert_eq!(post.votes.vote_of("u1"), Some(VoteKind::Up));

            // Persisted, not just cached.
            let stored = ledger.post("p1").await?.unwrap();
            assert_eq!(stored.votes.upvotes, 1);

            std::fs::remove_dir_all(&root).ok();
            Ok(())
        }
    }
}
