//! Route handlers for the reputation, posts, and asset endpoints.

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    assets,
    error::{Error, Result},
    reputation::{LevelProgress, ReputationEngine, UserXpRecord, XpHistoryEntry},
    serve::AppState,
    votes::{PostRecord, VoteKind, VoteLedger},
};

/// Health check endpoint. Returns name and version of the service.
pub(crate) async fn health() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "version": concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
    })))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AwardRequest {
    user_id: String,
    username: String,
    action: String,
    related_id: Option<String>,
}

/// A cosmetic that became available through a level-up.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UnlockedAsset {
    category: &'static str,
    asset: &'static str,
    level: u32,
    level_name: &'static str,
    description: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AwardResponse {
    success: bool,
    user: UserXpRecord,
    leveled_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_level: Option<u32>,
    xp_awarded: bool,
    daily_limit_reached: bool,
    spam_blocked: bool,
    /// Everything the level-up made available, for the notification layer.
    newly_unlocked: Vec<UnlockedAsset>,
}

/// Credit an action to a user.
/// - POST /api/reputation/award
async fn award(
    State(engine): State<ReputationEngine>,
    Json(body): Json<AwardRequest>,
) -> Result<Json<AwardResponse>> {
    debug!("award request: {body:?}");

    if body.user_id.is_empty() || body.username.is_empty() {
        return Err(Error::bad_request(anyhow!(
            "user id and username are required"
        )));
    }

    let outcome = engine
        .award(&body.user_id, &body.username, &body.action, body.related_id)
        .await?;

    let Some(user) = outcome.user else {
        return Err(Error::bad_request(anyhow!("unknown action: {}", body.action)));
    };

    let newly_unlocked = match (outcome.previous_level, outcome.new_level) {
        (Some(old), Some(new)) => assets::newly_unlocked(old, new)
            .into_iter()
            .map(|req| UnlockedAsset {
                category: req.category,
                asset: req.name,
                // Newly unlocked assets are always threshold-gated.
                level: req.required_level().unwrap_or_default(),
                level_name: req.gate_name(),
                description: req.description,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(Json(AwardResponse {
        success: true,
        user,
        leveled_up: outcome.leveled_up,
        new_level: outcome.new_level,
        xp_awarded: outcome.xp_awarded,
        daily_limit_reached: outcome.daily_limit_reached,
        spam_blocked: outcome.spam_blocked,
        newly_unlocked,
    }))
}

#[derive(Serialize)]
struct UsersResponse {
    users: Vec<UserXpRecord>,
}

/// Every user ledger.
/// - GET /api/reputation/users
async fn list_users(State(engine): State<ReputationEngine>) -> Result<Json<UsersResponse>> {
    let users = engine.all_users().await?;
    Ok(Json(UsersResponse { users }))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

/// The leaderboard.
/// - GET /api/reputation/top?limit=10
async fn top_users(
    State(engine): State<ReputationEngine>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<UsersResponse>> {
    let users = engine.top_users(query.limit.unwrap_or(10)).await?;
    Ok(Json(UsersResponse { users }))
}

#[derive(Serialize)]
struct UserResponse {
    user: UserXpRecord,
}

/// One user's ledger.
/// - GET /api/reputation/users/{user_id}
async fn get_user(
    State(engine): State<ReputationEngine>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    match engine.user(&user_id).await? {
        Some(user) => Ok(Json(UserResponse { user })),
        None => Err(Error::not_found(anyhow!("user not found: {user_id}"))),
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<XpHistoryEntry>,
}

/// A user's award history, most recent first.
/// - GET /api/reputation/users/{user_id}/history?limit=50
async fn user_history(
    State(engine): State<ReputationEngine>,
    Path(user_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryResponse>> {
    let history = engine.history(&user_id, query.limit.unwrap_or(50)).await?;
    Ok(Json(HistoryResponse { history }))
}

#[derive(Serialize)]
struct ProgressResponse {
    progress: LevelProgress,
}

/// Progress toward the next level.
/// - GET /api/reputation/users/{user_id}/progress
async fn user_progress(
    State(engine): State<ReputationEngine>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressResponse>> {
    let progress = engine.level_progress(&user_id).await?;
    Ok(Json(ProgressResponse { progress }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanLoginResponse {
    can_login: bool,
}

/// Whether today's login award is still available.
/// - GET /api/reputation/users/{user_id}/can-login
async fn can_login(
    State(engine): State<ReputationEngine>,
    Path(user_id): Path<String>,
) -> Result<Json<CanLoginResponse>> {
    let can_login = engine.can_perform_daily_login(&user_id).await?;
    Ok(Json(CanLoginResponse { can_login }))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    title: String,
    author_id: String,
    author_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    success: bool,
    post: PostRecord,
    leveled_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_level: Option<u32>,
}

/// Create a forum post with an empty vote state, crediting the author.
/// - POST /api/posts
async fn create_post(
    State(ledger): State<VoteLedger>,
    State(engine): State<ReputationEngine>,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>> {
    if body.title.is_empty() || body.author_id.is_empty() {
        return Err(Error::bad_request(anyhow!("title and author are required")));
    }

    let post_id = Uuid::new_v4().to_string();
    let post = ledger
        .create_post(&post_id, &body.title, &body.author_id, &body.author_name)
        .await?;

    let outcome = engine
        .award(&body.author_id, &body.author_name, "CREATE_POST", Some(post_id))
        .await?;

    Ok(Json(PostResponse {
        success: true,
        post,
        leveled_up: outcome.leveled_up,
        new_level: outcome.new_level,
    }))
}

/// Fetch a post.
/// - GET /api/posts/{post_id}
async fn get_post(
    State(ledger): State<VoteLedger>,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    match ledger.post(&post_id).await? {
        Some(post) => Ok(Json(json!({ "post": post }))),
        None => Err(Error::not_found(anyhow!("post not found: {post_id}"))),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    user_id: String,
    vote: VoteKind,
}

/// Apply a vote with toggle semantics. Landing an upvote on someone else's
/// post credits the author; the vote itself never fails on the XP path.
/// - POST /api/posts/{post_id}/vote
async fn vote_post(
    State(ledger): State<VoteLedger>,
    State(engine): State<ReputationEngine>,
    Path(post_id): Path<String>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<serde_json::Value>> {
    debug!("vote request on {post_id}: {body:?}");

    let Some(post) = ledger.update_vote(&post_id, body.vote, &body.user_id).await? else {
        return Err(Error::not_found(anyhow!("post not found: {post_id}")));
    };

    let landed_upvote =
        body.vote == VoteKind::Up && post.votes.vote_of(&body.user_id) == Some(VoteKind::Up);
    if landed_upvote && post.author_id != body.user_id {
        match engine
            .award(&post.author_id, &post.author_name, "POST_GETS_LIKE", Some(post_id))
            .await
        {
            Ok(outcome) if outcome.leveled_up => {
                info!(
                    "{} leveled up to level {} from receiving a like",
                    post.author_name,
                    outcome.new_level.unwrap_or_default()
                );
            }
            Ok(_) => {}
            Err(err) => warn!("failed to award like XP: {err:?}"),
        }
    }

    Ok(Json(json!({ "success": true, "post": post })))
}

#[derive(Deserialize)]
struct AssetQuery {
    level: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetEntry {
    name: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_level: Option<u32>,
    level_name: &'static str,
    unlocked: bool,
}

#[derive(Serialize)]
struct AssetsResponse {
    category: String,
    level: u32,
    assets: Vec<AssetEntry>,
}

/// List a category's assets and what a given level can use.
/// - GET /api/assets/{category}?level=3
async fn category_assets(
    Path(category): Path<String>,
    Query(query): Query<AssetQuery>,
) -> Result<Json<AssetsResponse>> {
    let level = query.level.unwrap_or(1);
    let assets = assets::ASSET_REQUIREMENTS
        .iter()
        .filter(|r| r.category == category)
        .map(|r| AssetEntry {
            name: r.name,
            description: r.description,
            required_level: r.required_level(),
            level_name: r.gate_name(),
            unlocked: assets::can_access(level, r.category, r.name),
        })
        .collect();

    Ok(Json(AssetsResponse {
        category,
        level,
        assets,
    }))
}

/// Register all routes.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/_health", get(health))
        .route("/api/reputation/award", post(award))
        .route("/api/reputation/users", get(list_users))
        .route("/api/reputation/top", get(top_users))
        .route("/api/reputation/users/{user_id}", get(get_user))
        .route("/api/reputation/users/{user_id}/history", get(user_history))
        .route("/api/reputation/users/{user_id}/progress", get(user_progress))
        .route("/api/reputation/users/{user_id}/can-login", get(can_login))
        .route("/api/posts", post(create_post))
        .route("/api/posts/{post_id}", get(get_post))
        .route("/api/posts/{post_id}/vote", post(vote_post))
        .route("/api/assets/{category}", get(category_assets))
}
