use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bracket::{CloseSummary, Completion, VoteOutcome};
use serde::Deserialize;
use serde_json::json;
use storage::{
    dto::matches::{CompleteMatchRequest, StartVotingRequest, VoteRequest},
    models::Match,
};
use utoipa::IntoParams;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;
use crate::voter::voter_token;

use super::services;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CloseExpiredQuery {
    /// Limit the sweep to one competition
    pub competition_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/matches/{id}",
    params(
        ("id" = i64, Path, description = "Match id")
    ),
    responses(
        (status = 200, description = "`{success, match}`", body = Match),
        (status = 404, description = "Match not found")
    ),
    tag = "matches"
)]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let found = services::get_match(state.store(), id).await?;

    Ok(Json(json!({
        "success": true,
        "match": found
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/start",
    params(
        ("id" = i64, Path, description = "Match id")
    ),
    request_body(content = StartVotingRequest, description = "Voting window; defaults to the competition's"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, match}` now open for votes", body = Match),
        (status = 400, description = "Match not pending, not ready, or bad duration"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Match not found")
    ),
    tag = "matches"
)]
pub async fn start_voting(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<StartVotingRequest>>,
) -> Result<Response, WebError> {
    let Json(req) = body.unwrap_or_default();
    req.validate()?;

    let started = services::start_voting(&state.engine, id, req.duration).await?;

    Ok(Json(json!({
        "success": true,
        "match": started
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/vote",
    params(
        ("id" = i64, Path, description = "Match id")
    ),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "`{success, vote}`; a repeat voter gets `result: duplicate`", body = VoteOutcome),
        (status = 400, description = "Voting closed or performer not in this match"),
        (status = 404, description = "Match not found")
    ),
    tag = "matches"
)]
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<VoteRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let token = voter_token(req.voter_id.as_deref(), &headers);
    let outcome = services::submit_vote(&state.engine, id, req.performer_id, &token).await?;

    Ok(Json(json!({
        "success": true,
        "vote": outcome
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/{id}/complete",
    params(
        ("id" = i64, Path, description = "Match id")
    ),
    request_body(content = CompleteMatchRequest, description = "Optional winner override"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, match, advancement}`", body = Completion),
        (status = 400, description = "Not voting, tied votes, or winner not in this match"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Match not found")
    ),
    tag = "matches"
)]
pub async fn complete_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<CompleteMatchRequest>>,
) -> Result<Response, WebError> {
    let Json(req) = body.unwrap_or_default();

    let completion = services::complete_match(&state.engine, id, req.winner_id).await?;

    Ok(Json(json!({
        "success": true,
        "match": completion.completed,
        "advancement": completion.advancement
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/matches/close-expired",
    params(CloseExpiredQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, summary}` of closed, tied and failed matches", body = CloseSummary),
        (status = 401, description = "Unauthorized")
    ),
    tag = "matches"
)]
pub async fn close_expired(
    State(state): State<AppState>,
    Query(query): Query<CloseExpiredQuery>,
) -> Result<Response, WebError> {
    let summary = services::close_expired(&state.engine, query.competition_id).await?;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    }))
    .into_response())
}
