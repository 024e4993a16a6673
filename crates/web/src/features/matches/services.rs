use bracket::{BracketEngine, CloseSummary, Completion, VoteOutcome};
use storage::{BracketStore, models::Match};

use crate::error::WebResult;

pub async fn get_match(store: &dyn BracketStore, id: i64) -> WebResult<Match> {
    Ok(store.find_match(id).await?)
}

pub async fn start_voting(
    engine: &BracketEngine,
    id: i64,
    duration: Option<i32>,
) -> WebResult<Match> {
    Ok(engine.start_voting(id, duration).await?)
}

pub async fn submit_vote(
    engine: &BracketEngine,
    id: i64,
    performer_id: i64,
    voter_token: &str,
) -> WebResult<VoteOutcome> {
    Ok(engine.submit_vote(id, performer_id, voter_token).await?)
}

pub async fn complete_match(
    engine: &BracketEngine,
    id: i64,
    winner_id: Option<i64>,
) -> WebResult<Completion> {
    Ok(engine.complete_match(id, winner_id).await?)
}

pub async fn close_expired(
    engine: &BracketEngine,
    competition_id: Option<i64>,
) -> WebResult<CloseSummary> {
    Ok(engine.close_expired(competition_id).await?)
}
