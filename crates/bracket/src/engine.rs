//! The bracket engine: generation, voting, completion and advancement
//! against the collaborator traits.
//!
//! Every operation that moves a bracket forward holds the competition lock
//! and then the match lock. Votes only take the match lock, so ballots on
//! different matches never wait on each other.
//!
//! The locks only order work inside one process. Every store write is
//! conditional on the row the engine read, so a second process (the expiry
//! sweep, another API replica) loses with a conflict instead of overwriting.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use storage::models::{
    BracketType, Competition, CompetitionStatus, CompetitionType, Match, MatchStatus,
    MatchVersion, NewVote, VoteRecord,
};
use storage::{BracketStore, PerformerDirectory, StorageError};
use utoipa::ToSchema;

use crate::advancement::{self, Propagation};
use crate::clock::{Clock, SystemClock};
use crate::error::{BracketError, Result, missing};
use crate::generator;
use crate::layout::BracketLayout;
use crate::locks::{LockGuard, LockRegistry};
use crate::position::BracketPosition;
use crate::sink::{MatchSnapshot, SnapshotSink, TracingSink};
use crate::standings::{StandingRow, compute_standings};
use crate::view::{BracketView, build_bracket_view};
use crate::voting;

/// How often a conditional write is re-planned against fresh rows
const MAX_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VoteOutcome {
    Counted {
        votes_performer_1: i64,
        votes_performer_2: i64,
    },
    /// The voter already voted on this match; nothing changed
    Duplicate,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AdvanceOutcome {
    /// Matches written by this advancement, in bracket order
    pub updated: Vec<Match>,
    pub champion: Option<i64>,
    pub reset_activated: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Completion {
    #[serde(rename = "match")]
    pub completed: Match,
    pub advancement: AdvanceOutcome,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CloseFailure {
    pub match_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CloseSummary {
    pub closed: Vec<i64>,
    /// Expired matches left open because the votes are tied
    pub ties: Vec<i64>,
    pub failures: Vec<CloseFailure>,
}

/// A match and its competition, read while both locks are held
struct MatchScope {
    competition: Competition,
    current: Match,
    _competition_guard: LockGuard,
    _match_guard: LockGuard,
}

pub struct BracketEngine {
    store: Arc<dyn BracketStore>,
    directory: Arc<dyn PerformerDirectory>,
    sink: Arc<dyn SnapshotSink>,
    clock: Arc<dyn Clock>,
    locks: LockRegistry,
}

impl BracketEngine {
    pub fn new(store: Arc<dyn BracketStore>, directory: Arc<dyn PerformerDirectory>) -> Self {
        Self {
            store,
            directory,
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
            locks: LockRegistry::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &Arc<dyn BracketStore> {
        &self.store
    }

    /// Builds and persists the bracket for performers given in seed order.
    pub async fn generate(&self, competition_id: i64, performer_ids: &[i64]) -> Result<Vec<Match>> {
        let _guard = self.locks.competition(competition_id).await;
        let competition = self.find_competition(competition_id).await?;

        if competition.status != CompetitionStatus::Setup {
            return Err(BracketError::InvalidState(format!(
                "competition {competition_id} is {:?}, brackets can only be generated during setup",
                competition.status
            )));
        }
        if !self.store.list_matches(competition_id).await?.is_empty() {
            return Err(BracketError::InvalidState(
                "bracket already generated".to_string(),
            ));
        }

        let generated = generator::generate(
            competition.competition_type,
            performer_ids,
            self.clock.now(),
        )?;

        let inserted = self
            .store
            .insert_bracket(
                competition_id,
                competition.competition_type,
                generated.rounds_count,
                &generated.matches,
            )
            .await
            .map_err(|e| match e {
                StorageError::ConstraintViolation(reason) => BracketError::InvalidState(reason),
                other => other.into(),
            })?;

        tracing::info!(
            competition_id,
            format = ?competition.competition_type,
            performers = performer_ids.len(),
            matches = inserted.len(),
            rounds = generated.rounds_count,
            "Bracket generated"
        );
        Ok(inserted)
    }

    /// Drops a generated bracket so it can be generated again. Setup only.
    pub async fn clear_bracket(&self, competition_id: i64) -> Result<u64> {
        let _guard = self.locks.competition(competition_id).await;
        let competition = self.find_competition(competition_id).await?;

        if competition.status != CompetitionStatus::Setup {
            return Err(BracketError::InvalidState(format!(
                "competition {competition_id} is {:?}, brackets can only be cleared during setup",
                competition.status
            )));
        }

        let removed = self.store.clear_bracket(competition_id).await?;

        tracing::info!(competition_id, removed, "Bracket cleared");
        Ok(removed)
    }

    /// Opens voting on a ready match. `duration_minutes` falls back to the
    /// competition's default voting window.
    pub async fn start_voting(&self, match_id: i64, duration_minutes: Option<i32>) -> Result<Match> {
        let mut scope = self.lock_match_scope(match_id).await?;

        if scope.competition.status == CompetitionStatus::Completed {
            return Err(BracketError::InvalidState(format!(
                "competition {} is already completed",
                scope.competition.competition_id
            )));
        }

        let duration = duration_minutes.unwrap_or(scope.competition.voting_duration);
        let expected = scope.current.version();
        voting::open_voting(&mut scope.current, duration, self.clock.now())?;
        let started = self.store.update_match(&scope.current, expected).await?;

        let round = match started.bracket_type {
            BracketType::Winners => started.round_number,
            _ => 0,
        };
        if scope.competition.status == CompetitionStatus::Setup
            || round > scope.competition.current_round
        {
            self.store
                .activate_competition(started.competition_id, round)
                .await?;
        }

        self.publish(&started);
        tracing::info!(
            match_id,
            competition_id = started.competition_id,
            position = %started.bracket_position,
            duration,
            "Voting started"
        );
        Ok(started)
    }

    pub async fn submit_vote(
        &self,
        match_id: i64,
        performer_id: i64,
        voter_token: &str,
    ) -> Result<VoteOutcome> {
        let _guard = self.locks.matches(match_id).await;
        let current = self
            .store
            .find_match(match_id)
            .await
            .map_err(missing("Match"))?;

        voting::check_ballot(&current, performer_id, self.clock.now())?;

        let record = self
            .store
            .record_vote(&NewVote {
                match_id,
                voter_token: voter_token.to_string(),
                performer_id,
            })
            .await
            .map_err(|e| match e {
                // Closed by another writer after the ballot check
                StorageError::Conflict(_) => BracketError::VotingClosed,
                other => other.into(),
            })?;

        match record {
            VoteRecord::Counted(updated) => {
                self.publish(&updated);
                Ok(VoteOutcome::Counted {
                    votes_performer_1: updated.votes_performer_1,
                    votes_performer_2: updated.votes_performer_2,
                })
            }
            VoteRecord::Duplicate => {
                tracing::debug!(match_id, "Ignoring repeat vote");
                Ok(VoteOutcome::Duplicate)
            }
        }
    }

    /// Closes voting, records the result and advances the bracket.
    ///
    /// If advancement fails the match stays completed and the error is
    /// returned; `reconcile` finishes the downstream writes.
    pub async fn complete_match(
        &self,
        match_id: i64,
        winner_override: Option<i64>,
    ) -> Result<Completion> {
        let mut scope = self.lock_match_scope(match_id).await?;

        let mut attempt = 1;
        let (completed, winner) = loop {
            if scope.current.status != MatchStatus::Voting {
                return Err(BracketError::InvalidState(format!(
                    "match {match_id} is {:?}, only a voting match can be completed",
                    scope.current.status
                )));
            }

            // Decided on the counts read; the write fails if a vote lands first.
            let expected = scope.current.version();
            let winner = voting::decide_winner(&scope.current, winner_override)?;
            let mut closing = scope.current.clone();
            voting::close_match(&mut closing, winner, self.clock.now())?;

            match self.store.update_match(&closing, expected).await {
                Ok(completed) => break (completed, winner),
                Err(StorageError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(match_id, attempt, %reason, "Match changed while closing; re-reading");
                    attempt += 1;
                    scope.current = self
                        .store
                        .find_match(match_id)
                        .await
                        .map_err(missing("Match"))?;
                }
                Err(e) => return Err(e.into()),
            }
        };
        self.publish(&completed);
        tracing::info!(
            match_id,
            competition_id = completed.competition_id,
            winner,
            manual = winner_override.is_some(),
            "Match completed"
        );

        let advancement = match self.advance_from(&mut scope.competition, &completed).await {
            Ok(advancement) => advancement,
            Err(e) => {
                tracing::error!(
                    match_id,
                    competition_id = completed.competition_id,
                    error = %e,
                    "Match completed but advancement failed; bracket needs reconcile"
                );
                return Err(e);
            }
        };

        Ok(Completion {
            completed,
            advancement,
        })
    }

    /// Re-runs advancement for a completed match. Safe to repeat.
    pub async fn advance(&self, match_id: i64) -> Result<AdvanceOutcome> {
        let mut scope = self.lock_match_scope(match_id).await?;

        if !scope.current.is_completed() {
            return Err(BracketError::InvalidState(format!(
                "match {match_id} has not been completed"
            )));
        }

        let current = scope.current.clone();
        self.advance_from(&mut scope.competition, &current).await
    }

    /// Completes every voting match whose window has closed.
    pub async fn close_expired(&self, competition_id: Option<i64>) -> Result<CloseSummary> {
        let expired = self
            .store
            .list_expired_matches(competition_id, self.clock.now())
            .await?;

        let mut summary = CloseSummary::default();
        for m in expired {
            match self.complete_match(m.match_id, None).await {
                Ok(_) => summary.closed.push(m.match_id),
                Err(BracketError::AmbiguousResult) => {
                    tracing::warn!(
                        match_id = m.match_id,
                        "Voting window closed on a tie; waiting for an explicit winner"
                    );
                    summary.ties.push(m.match_id);
                }
                Err(BracketError::InvalidState(reason)) => {
                    tracing::debug!(match_id = m.match_id, %reason, "Match closed concurrently");
                }
                Err(e) => summary.failures.push(CloseFailure {
                    match_id: m.match_id,
                    error: e.to_string(),
                }),
            }
        }

        tracing::info!(
            closed = summary.closed.len(),
            ties = summary.ties.len(),
            failures = summary.failures.len(),
            "Closed expired voting windows"
        );
        Ok(summary)
    }

    /// Replays advancement for every completed match in match order,
    /// filling whatever downstream slots are still missing.
    pub async fn reconcile(&self, competition_id: i64) -> Result<AdvanceOutcome> {
        let _guard = self.locks.competition(competition_id).await;
        let mut competition = self.find_competition(competition_id).await?;

        let outcome = self.advance_bracket(&mut competition, None).await?;
        tracing::info!(competition_id, repaired = outcome.updated.len(), "Bracket reconciled");
        Ok(outcome)
    }

    pub async fn standings(&self, competition_id: i64) -> Result<Vec<StandingRow>> {
        self.find_competition(competition_id).await?;
        let matches = self.store.list_matches(competition_id).await?;
        Ok(compute_standings(&matches))
    }

    pub async fn bracket_view(&self, competition_id: i64) -> Result<BracketView> {
        let competition = self.find_competition(competition_id).await?;
        let matches = self.store.list_matches(competition_id).await?;
        build_bracket_view(&competition, &matches, self.directory.as_ref()).await
    }

    async fn find_competition(&self, competition_id: i64) -> Result<Competition> {
        self.store
            .find_competition(competition_id)
            .await
            .map_err(missing("Competition"))
    }

    async fn lock_match_scope(&self, match_id: i64) -> Result<MatchScope> {
        // The owning competition never changes, so an unlocked read is
        // enough to pick the competition lock.
        let located = self
            .store
            .find_match(match_id)
            .await
            .map_err(missing("Match"))?;

        let competition_guard = self.locks.competition(located.competition_id).await;
        let match_guard = self.locks.matches(match_id).await;

        let current = self
            .store
            .find_match(match_id)
            .await
            .map_err(missing("Match"))?;
        let competition = self.find_competition(current.competition_id).await?;

        Ok(MatchScope {
            competition,
            current,
            _competition_guard: competition_guard,
            _match_guard: match_guard,
        })
    }

    async fn advance_from(
        &self,
        competition: &mut Competition,
        completed: &Match,
    ) -> Result<AdvanceOutcome> {
        let from = parse_position(&completed.bracket_position)?;
        self.advance_bracket(competition, Some(from)).await
    }

    /// Propagates from `from`, or from every completed match in match order,
    /// and writes the touched matches. A conflicting write re-plans against
    /// fresh rows; propagation only fills empty slots, so the earlier writes
    /// of a failed attempt are simply found already in place.
    async fn advance_bracket(
        &self,
        competition: &mut Competition,
        from: Option<BracketPosition>,
    ) -> Result<AdvanceOutcome> {
        if competition.competition_type == CompetitionType::RoundRobin {
            let matches = self.store.list_matches(competition.competition_id).await?;
            return self.settle_round_robin(competition, &matches).await;
        }

        let mut updated = Vec::new();
        let mut attempt = 1;
        let propagation = loop {
            let matches = self.store.list_matches(competition.competition_id).await?;
            let (layout, mut bracket) = load_bracket(competition, matches)?;
            let versions: BTreeMap<BracketPosition, MatchVersion> = bracket
                .iter()
                .map(|(position, m)| (*position, m.version()))
                .collect();
            let sources = match from {
                Some(position) => vec![position],
                None => completed_positions(&bracket)?,
            };

            let now = self.clock.now();
            let mut propagation = Propagation::default();
            for position in sources {
                propagation.merge(advancement::propagate(&layout, &mut bracket, position, now)?);
            }

            match self
                .write_touched(&bracket, &versions, &propagation.touched, &mut updated)
                .await
            {
                Ok(()) => break propagation,
                Err(StorageError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(
                        competition_id = competition.competition_id,
                        attempt,
                        %reason,
                        "Bracket changed while advancing; re-planning"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if propagation.reset_activated {
            tracing::info!(
                competition_id = competition.competition_id,
                "Losers bracket entrant took grand finals; reset match is on"
            );
        }
        if let Some(champion) = propagation.champion {
            self.crown(competition, champion).await?;
        }

        Ok(AdvanceOutcome {
            updated,
            champion: propagation.champion,
            reset_activated: propagation.reset_activated,
        })
    }

    async fn write_touched(
        &self,
        bracket: &BTreeMap<BracketPosition, Match>,
        versions: &BTreeMap<BracketPosition, MatchVersion>,
        touched: &BTreeSet<BracketPosition>,
        updated: &mut Vec<Match>,
    ) -> storage::Result<()> {
        for position in touched {
            let (Some(m), Some(expected)) = (bracket.get(position), versions.get(position)) else {
                continue;
            };
            let saved = self.store.update_match(m, *expected).await?;
            self.publish(&saved);
            updated.push(saved);
        }
        Ok(())
    }

    async fn settle_round_robin(
        &self,
        competition: &mut Competition,
        matches: &[Match],
    ) -> Result<AdvanceOutcome> {
        let mut outcome = AdvanceOutcome::default();
        if matches.is_empty() || !matches.iter().all(Match::is_completed) {
            return Ok(outcome);
        }

        let leader = compute_standings(matches)
            .first()
            .map(|row| row.performer_id)
            .ok_or_else(|| {
                BracketError::InvalidBracket("completed round robin has no standings".to_string())
            })?;

        self.crown(competition, leader).await?;
        outcome.champion = Some(leader);
        Ok(outcome)
    }

    async fn crown(&self, competition: &mut Competition, champion: i64) -> Result<()> {
        match competition.winner_performer_id {
            Some(existing) if existing == champion => return Ok(()),
            Some(existing) => {
                tracing::warn!(
                    competition_id = competition.competition_id,
                    existing,
                    champion,
                    "Competition already has a different winner; keeping it"
                );
                return Ok(());
            }
            None => {}
        }

        match self
            .store
            .finish_competition(competition.competition_id, champion)
            .await
        {
            Ok(finished) => {
                *competition = finished;
                tracing::info!(
                    competition_id = competition.competition_id,
                    champion,
                    "Competition completed"
                );
            }
            Err(StorageError::Conflict(_)) => {
                *competition = self.find_competition(competition.competition_id).await?;
                if let Some(existing) = competition.winner_performer_id.filter(|w| *w != champion) {
                    tracing::warn!(
                        competition_id = competition.competition_id,
                        existing,
                        champion,
                        "Competition was completed concurrently with a different winner"
                    );
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn publish(&self, m: &Match) {
        self.sink.publish(&MatchSnapshot::of(m, self.clock.now()));
    }
}

fn parse_position(token: &str) -> Result<BracketPosition> {
    token
        .parse()
        .map_err(|e: crate::position::InvalidPosition| BracketError::InvalidBracket(e.to_string()))
}

fn completed_positions(bracket: &BTreeMap<BracketPosition, Match>) -> Result<Vec<BracketPosition>> {
    let mut played: Vec<&Match> = bracket.values().filter(|m| m.is_completed()).collect();
    played.sort_by_key(|m| m.match_number);
    played
        .into_iter()
        .map(|m| parse_position(&m.bracket_position))
        .collect()
}

/// Rebuilds the routing layout and the position-keyed match map
fn load_bracket(
    competition: &Competition,
    matches: Vec<Match>,
) -> Result<(BracketLayout, BTreeMap<BracketPosition, Match>)> {
    let rounds = u32::try_from(competition.rounds_count)
        .ok()
        .filter(|rounds| *rounds > 0)
        .ok_or_else(|| {
            BracketError::InvalidBracket(format!(
                "competition {} has no generated rounds",
                competition.competition_id
            ))
        })?;
    let layout = BracketLayout::new(competition.competition_type, rounds);

    let bracket = matches
        .into_iter()
        .map(|m| Ok((parse_position(&m.bracket_position)?, m)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok((layout, bracket))
}
