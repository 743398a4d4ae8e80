use crate::{
    cycle::tournament_week_start,
    errors::AppError,
    models::{Meme, MemeId, User, UserId},
    session::{Countdown, TodayStatus},
    tournament::{Bracket, CoinFlip},
    validation,
    views::{MemeMetric, UserMetric},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing;

// --- Request / response bodies ---

#[derive(Debug, Deserialize)]
pub struct SubmitMemeRequest {
    pub name: String,
    pub chain: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMemeResponse {
    pub applied: bool,
    pub created: bool,
    pub meme: Meme,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub applied: bool,
    pub meme: Option<Meme>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMutationResponse {
    pub applied: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResponse {
    pub week_start: NaiveDate,
    pub bracket: Bracket,
    pub champion: Option<Meme>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemeLeaderboardQuery {
    #[serde(default)]
    pub metric: MemeMetric,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserLeaderboardQuery {
    #[serde(default)]
    pub metric: UserMetric,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TournamentQuery {
    #[serde(default)]
    pub resolve: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChainQuery {
    #[serde(default)]
    pub prefix: String,
}

// --- Memes ---

pub async fn list_memes(State(state): State<Arc<AppState>>) -> Json<Vec<Meme>> {
    let memes = state.session.list_memes().await;
    tracing::debug!("Handler returning {} memes", memes.len());
    Json(memes)
}

pub async fn submit_meme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitMemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (submission, meme) = state
        .session
        .submit_meme(&request.name, &request.chain, Utc::now())
        .await?;

    let status = if submission.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(SubmitMemeResponse { applied: true, created: submission.created, meme }),
    ))
}

pub async fn like_meme(
    State(state): State<Arc<AppState>>,
    Path(meme_id): Path<MemeId>,
) -> Result<Json<LikeResponse>, AppError> {
    let applied = state.session.like_meme(meme_id).await?;
    let meme = state.session.list_memes().await.into_iter().find(|m| m.id == meme_id);
    Ok(Json(LikeResponse { applied, meme }))
}

// --- Users ---

pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.session.list_users().await)
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    state
        .session
        .user(user_id)
        .await
        .map(Json)
        .ok_or(AppError::UserNotFound(user_id))
}

pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserMutationResponse>, AppError> {
    let applied = state.session.follow_user(user_id).await?;
    let user = state.session.current_user().await;
    Ok(Json(UserMutationResponse { applied, user }))
}

pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserMutationResponse>, AppError> {
    let applied = state.session.unfollow_user(user_id).await?;
    let user = state.session.current_user().await;
    Ok(Json(UserMutationResponse { applied, user }))
}

pub async fn current_user(State(state): State<Arc<AppState>>) -> Json<User> {
    Json(state.session.current_user().await)
}

pub async fn rename_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<UserMutationResponse>, AppError> {
    let (applied, user) = state.session.rename_user(&request.name).await?;
    Ok(Json(UserMutationResponse { applied, user }))
}

// --- Daily state & derived views ---

pub async fn today(State(state): State<Arc<AppState>>) -> Json<TodayStatus> {
    Json(state.session.today().await)
}

pub async fn countdown(State(state): State<Arc<AppState>>) -> Json<Countdown> {
    Json(state.session.countdown(Utc::now()).await)
}

pub async fn shillers_pick(State(state): State<Arc<AppState>>) -> Json<Option<Meme>> {
    Json(state.session.shillers_pick().await)
}

pub async fn meme_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MemeLeaderboardQuery>,
) -> Json<Vec<Meme>> {
    Json(state.session.meme_leaderboard(query.metric, query.limit).await)
}

pub async fn user_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserLeaderboardQuery>,
) -> Json<Vec<User>> {
    Json(state.session.user_leaderboard(query.metric, query.limit).await)
}

pub async fn tournament(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TournamentQuery>,
) -> Json<TournamentResponse> {
    let mut bracket = state.session.tournament().await;
    if query.resolve {
        bracket.resolve(&mut CoinFlip);
    }
    let champion = bracket.champion().and_then(|slot| slot.meme()).cloned();
    Json(TournamentResponse {
        week_start: tournament_week_start(Utc::now()),
        bracket,
        champion,
    })
}

pub async fn chains(Query(query): Query<ChainQuery>) -> Json<Vec<&'static str>> {
    Json(validation::suggest_chains(&query.prefix))
}
