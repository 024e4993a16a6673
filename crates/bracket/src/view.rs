//! Display projections of a bracket.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::PerformerDirectory;
use storage::models::{
    BracketType, Competition, CompetitionType, Match, MatchStatus, Performer,
};
use utoipa::ToSchema;

use crate::error::Result;
use crate::position::BracketPosition;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformerSlotView {
    pub performer_id: i64,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub seed: Option<i32>,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchView {
    pub match_id: i64,
    pub match_number: i32,
    pub round_number: i32,
    pub bracket_type: BracketType,
    pub bracket_position: String,
    pub performer_1: Option<PerformerSlotView>,
    pub performer_2: Option<PerformerSlotView>,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub status: MatchStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub voting_closes_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Render-ready bracket. Single elimination and round robin fill `rounds`;
/// double elimination fills the winners/losers maps and grand finals slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BracketView {
    pub competition_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<BTreeMap<i32, Vec<MatchView>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<BTreeMap<i32, Vec<MatchView>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub losers: Option<BTreeMap<i32, Vec<MatchView>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grand_finals: Option<MatchView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grand_finals_reset: Option<MatchView>,
}

fn slot_view(
    performer_id: Option<i64>,
    seed: Option<i32>,
    votes: i64,
    performers: &HashMap<i64, Performer>,
) -> Option<PerformerSlotView> {
    let performer_id = performer_id?;
    let profile = performers.get(&performer_id);
    Some(PerformerSlotView {
        performer_id,
        name: profile.map(|p| p.name.clone()),
        photo_url: profile.and_then(|p| p.photo_url.clone()),
        seed,
        votes,
    })
}

pub fn match_view(m: &Match, performers: &HashMap<i64, Performer>) -> MatchView {
    MatchView {
        match_id: m.match_id,
        match_number: m.match_number,
        round_number: m.round_number,
        bracket_type: m.bracket_type,
        bracket_position: m.bracket_position.clone(),
        performer_1: slot_view(m.performer_1_id, m.performer_1_seed, m.votes_performer_1, performers),
        performer_2: slot_view(m.performer_2_id, m.performer_2_seed, m.votes_performer_2, performers),
        winner_id: m.winner_id,
        loser_id: m.loser_id,
        status: m.status,
        scheduled_time: m.scheduled_time,
        voting_closes_at: m.voting_closes_at,
        completed_at: m.completed_at,
    }
}

/// Loads every performer named in `matches` from the directory
pub async fn resolve_performers(
    matches: &[Match],
    directory: &dyn PerformerDirectory,
) -> Result<HashMap<i64, Performer>> {
    let mut ids: Vec<i64> = matches
        .iter()
        .flat_map(|m| [m.performer_1_id, m.performer_2_id])
        .flatten()
        .collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let performers = directory.find_performers(&ids).await?;
    Ok(performers
        .into_iter()
        .map(|p| (p.performer_id, p))
        .collect())
}

pub async fn build_bracket_view(
    competition: &Competition,
    matches: &[Match],
    directory: &dyn PerformerDirectory,
) -> Result<BracketView> {
    let performers = resolve_performers(matches, directory).await?;
    let mut view = BracketView {
        competition_id: competition.competition_id,
        ..BracketView::default()
    };

    if competition.competition_type != CompetitionType::DoubleElimination {
        let mut rounds: BTreeMap<i32, Vec<MatchView>> = BTreeMap::new();
        for m in matches {
            rounds
                .entry(m.round_number)
                .or_default()
                .push(match_view(m, &performers));
        }
        view.rounds = Some(rounds);
        return Ok(view);
    }

    let mut winners: BTreeMap<i32, Vec<MatchView>> = BTreeMap::new();
    let mut losers: BTreeMap<i32, Vec<MatchView>> = BTreeMap::new();

    for m in matches {
        let projected = match_view(m, &performers);
        match m.bracket_type {
            BracketType::Winners => winners.entry(m.round_number).or_default().push(projected),
            BracketType::Losers => {
                let round = match m.bracket_position.parse::<BracketPosition>() {
                    Ok(position) => position.round() as i32,
                    Err(e) => {
                        tracing::warn!(match_id = m.match_id, error = %e, "Falling back to stored round");
                        m.round_number
                    }
                };
                losers.entry(round).or_default().push(projected);
            }
            BracketType::GrandFinals => view.grand_finals = Some(projected),
            BracketType::GrandFinalsReset => view.grand_finals_reset = Some(projected),
        }
    }

    view.winners = Some(winners);
    view.losers = Some(losers);
    Ok(view)
}
