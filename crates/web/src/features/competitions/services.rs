use bracket::{AdvanceOutcome, BracketEngine, BracketView, StandingRow};
use storage::{
    BracketStore, StorageError,
    dto::competition::{CreateCompetitionRequest, UpdateCompetitionRequest},
    models::{Competition, CompetitionChanges, Match},
};

use crate::error::{WebError, WebResult};

/// List competitions, newest first
pub async fn list_competitions(
    store: &dyn BracketStore,
    festival_id: Option<i64>,
) -> WebResult<Vec<Competition>> {
    Ok(store.list_competitions(festival_id).await?)
}

pub async fn get_competition(store: &dyn BracketStore, id: i64) -> WebResult<Competition> {
    Ok(store.find_competition(id).await?)
}

pub async fn create_competition(
    store: &dyn BracketStore,
    request: CreateCompetitionRequest,
    default_voting_minutes: i32,
) -> WebResult<Competition> {
    let new = request.into_new_competition(default_voting_minutes);
    let competition = store.create_competition(&new).await?;
    tracing::info!(
        competition_id = competition.competition_id,
        festival_id = competition.festival_id,
        "Competition created"
    );
    Ok(competition)
}

/// Update the organizer-editable fields. The format is frozen once a
/// bracket exists; the store enforces it in the same write.
pub async fn update_competition(
    store: &dyn BracketStore,
    id: i64,
    request: UpdateCompetitionRequest,
) -> WebResult<Competition> {
    let changes = CompetitionChanges::from(request);
    store
        .update_competition_details(id, &changes)
        .await
        .map_err(|e| match e {
            StorageError::Conflict(reason) => WebError::BadRequest(reason),
            other => other.into(),
        })
}

pub async fn delete_competition(store: &dyn BracketStore, id: i64) -> WebResult<()> {
    store.delete_competition(id).await?;
    tracing::info!(competition_id = id, "Competition deleted");
    Ok(())
}

pub async fn generate_bracket(
    engine: &BracketEngine,
    id: i64,
    performer_ids: &[i64],
) -> WebResult<Vec<Match>> {
    Ok(engine.generate(id, performer_ids).await?)
}

pub async fn clear_bracket(engine: &BracketEngine, id: i64) -> WebResult<u64> {
    Ok(engine.clear_bracket(id).await?)
}

pub async fn reconcile_bracket(engine: &BracketEngine, id: i64) -> WebResult<AdvanceOutcome> {
    Ok(engine.reconcile(id).await?)
}

pub async fn get_bracket(engine: &BracketEngine, id: i64) -> WebResult<BracketView> {
    Ok(engine.bracket_view(id).await?)
}

pub async fn get_standings(engine: &BracketEngine, id: i64) -> WebResult<Vec<StandingRow>> {
    Ok(engine.standings(id).await?)
}
