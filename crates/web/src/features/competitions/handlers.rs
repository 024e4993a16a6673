use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bracket::{AdvanceOutcome, BracketView, StandingRow};
use serde::Deserialize;
use serde_json::json;
use storage::{
    dto::{
        competition::{CompetitionResponse, CreateCompetitionRequest, UpdateCompetitionRequest},
        matches::GenerateBracketRequest,
    },
    models::Match,
};
use utoipa::IntoParams;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCompetitionsQuery {
    /// Only competitions of this festival
    pub festival_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/competitions",
    params(ListCompetitionsQuery),
    responses(
        (status = 200, description = "`{success, competitions}`", body = Vec<CompetitionResponse>)
    ),
    tag = "competitions"
)]
pub async fn list_competitions(
    State(state): State<AppState>,
    Query(query): Query<ListCompetitionsQuery>,
) -> Result<Response, WebError> {
    let competitions: Vec<CompetitionResponse> =
        services::list_competitions(state.store(), query.festival_id)
            .await?
            .into_iter()
            .map(CompetitionResponse::from)
            .collect();

    Ok(Json(json!({
        "success": true,
        "competitions": competitions
    }))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/competitions/{id}",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    responses(
        (status = 200, description = "`{success, competition}`", body = CompetitionResponse),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn get_competition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let competition = services::get_competition(state.store(), id).await?;

    Ok(Json(json!({
        "success": true,
        "competition": CompetitionResponse::from(competition)
    }))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/competitions/{id}/bracket",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    responses(
        (status = 200, description = "`{success, bracket}` grouped by bracket and round", body = BracketView),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let bracket = services::get_bracket(&state.engine, id).await?;

    Ok(Json(json!({
        "success": true,
        "bracket": bracket
    }))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/competitions/{id}/standings",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    responses(
        (status = 200, description = "`{success, standings}` sorted by points then votes", body = Vec<StandingRow>),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn get_standings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let standings = services::get_standings(&state.engine, id).await?;

    Ok(Json(json!({
        "success": true,
        "standings": standings
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/competitions",
    request_body = CreateCompetitionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "`{success, competition}`", body = CompetitionResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "competitions"
)]
pub async fn create_competition(
    State(state): State<AppState>,
    Json(req): Json<CreateCompetitionRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let competition =
        services::create_competition(state.store(), req, state.default_voting_minutes).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "competition": CompetitionResponse::from(competition)
        })),
    )
        .into_response())
}

#[utoipa::path(
    patch,
    path = "/api/competitions/{id}",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    request_body = UpdateCompetitionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, competition}`", body = CompetitionResponse),
        (status = 400, description = "Validation error or format change after generation"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn update_competition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update_req): Json<UpdateCompetitionRequest>,
) -> Result<Response, WebError> {
    update_req.validate()?;

    let updated = services::update_competition(state.store(), id, update_req).await?;

    Ok(Json(json!({
        "success": true,
        "competition": CompetitionResponse::from(updated)
    }))
    .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/competitions/{id}",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Competition, matches and votes deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn delete_competition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    services::delete_competition(state.store(), id).await?;

    Ok(Json(json!({ "success": true })).into_response())
}

#[utoipa::path(
    post,
    path = "/api/competitions/{id}/generate",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    request_body = GenerateBracketRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "`{success, matches}` for the new bracket", body = Vec<Match>),
        (status = 400, description = "Too few performers, duplicates, or not in setup"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn generate_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<GenerateBracketRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let matches = services::generate_bracket(&state.engine, id, &req.performer_ids).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "matches": matches
        })),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/competitions/{id}/bracket",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, removed}`; only allowed during setup"),
        (status = 400, description = "Competition already started"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn clear_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let removed = services::clear_bracket(&state.engine, id).await?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/competitions/{id}/reconcile",
    params(
        ("id" = i64, Path, description = "Competition id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`{success, result}` listing repaired matches", body = AdvanceOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Competition not found")
    ),
    tag = "competitions"
)]
pub async fn reconcile_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let result = services::reconcile_bracket(&state.engine, id).await?;

    Ok(Json(json!({
        "success": true,
        "result": result
    }))
    .into_response())
}
