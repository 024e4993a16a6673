//! Match state machine: `pending -> voting -> completed`.
//!
//! These functions only check and mutate a `Match` value; locking and
//! persistence live in the engine.

use chrono::{DateTime, Duration, Utc};
use storage::models::{Match, MatchStatus};

use crate::error::{BracketError, Result};

/// Opens the voting window on a pending match with both performers known.
pub fn open_voting(m: &mut Match, duration_minutes: i32, now: DateTime<Utc>) -> Result<()> {
    if m.status != MatchStatus::Pending {
        return Err(BracketError::InvalidState(format!(
            "match {} is {:?}, voting can only start on a pending match",
            m.match_id, m.status
        )));
    }
    if !m.is_ready() {
        return Err(BracketError::NotReady);
    }
    if duration_minutes <= 0 {
        return Err(BracketError::InvalidDuration(duration_minutes));
    }

    m.status = MatchStatus::Voting;
    m.scheduled_time.get_or_insert(now);
    m.voting_closes_at = Some(now + Duration::minutes(i64::from(duration_minutes)));
    Ok(())
}

/// Checks a ballot before it is recorded.
pub fn check_ballot(m: &Match, performer_id: i64, now: DateTime<Utc>) -> Result<()> {
    if m.status != MatchStatus::Voting {
        return Err(BracketError::VotingClosed);
    }
    if m.voting_closes_at.is_some_and(|closes| now >= closes) {
        return Err(BracketError::VotingClosed);
    }
    if !m.has_performer(performer_id) {
        return Err(BracketError::InvalidChoice(performer_id));
    }
    Ok(())
}

/// Picks the winner: an explicit override, else strictly more votes.
pub fn decide_winner(m: &Match, winner_override: Option<i64>) -> Result<i64> {
    let (Some(first), Some(second)) = (m.performer_1_id, m.performer_2_id) else {
        return Err(BracketError::NotReady);
    };

    if let Some(winner) = winner_override {
        if !m.has_performer(winner) {
            return Err(BracketError::InvalidChoice(winner));
        }
        return Ok(winner);
    }

    match m.votes_performer_1.cmp(&m.votes_performer_2) {
        std::cmp::Ordering::Greater => Ok(first),
        std::cmp::Ordering::Less => Ok(second),
        std::cmp::Ordering::Equal => Err(BracketError::AmbiguousResult),
    }
}

/// Records the result on a match that is being voted on.
pub fn close_match(m: &mut Match, winner: i64, now: DateTime<Utc>) -> Result<()> {
    if m.status != MatchStatus::Voting {
        return Err(BracketError::InvalidState(format!(
            "match {} is {:?}, only a voting match can be completed",
            m.match_id, m.status
        )));
    }
    let loser = m
        .opponent_of(winner)
        .ok_or(BracketError::InvalidChoice(winner))?;

    m.winner_id = Some(winner);
    m.loser_id = Some(loser);
    m.status = MatchStatus::Completed;
    m.completed_at = Some(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::models::{BracketType, NewMatch};

    fn ready_match() -> Match {
        let mut m = NewMatch::pending(1, 1, BracketType::Winners, "W_R1M1".to_string());
        m.performer_1_id = Some(10);
        m.performer_2_id = Some(20);
        m.into_match(1, 1)
    }

    #[test]
    fn test_open_voting_sets_window() {
        let now = Utc::now();
        let mut m = ready_match();

        open_voting(&mut m, 10, now).unwrap();

        assert_eq!(m.status, MatchStatus::Voting);
        assert_eq!(m.voting_closes_at, Some(now + Duration::minutes(10)));
        assert_eq!(m.scheduled_time, Some(now));
    }

    #[test]
    fn test_open_voting_on_tbd_match_is_not_ready() {
        let mut m = ready_match();
        m.performer_2_id = None;

        assert!(matches!(open_voting(&mut m, 10, Utc::now()), Err(BracketError::NotReady)));
        assert_eq!(m.status, MatchStatus::Pending);
    }

    #[test]
    fn test_open_voting_twice_is_invalid_state() {
        let mut m = ready_match();
        open_voting(&mut m, 10, Utc::now()).unwrap();

        assert!(matches!(
            open_voting(&mut m, 10, Utc::now()),
            Err(BracketError::InvalidState(_))
        ));
    }

    #[test]
    fn test_open_voting_rejects_non_positive_duration() {
        let mut m = ready_match();
        assert!(matches!(
            open_voting(&mut m, 0, Utc::now()),
            Err(BracketError::InvalidDuration(0))
        ));
    }

    #[test]
    fn test_ballot_checks() {
        let now = Utc::now();
        let mut m = ready_match();
        assert!(matches!(check_ballot(&m, 10, now), Err(BracketError::VotingClosed)));

        open_voting(&mut m, 5, now).unwrap();
        assert!(check_ballot(&m, 10, now).is_ok());
        assert!(matches!(check_ballot(&m, 30, now), Err(BracketError::InvalidChoice(30))));
        assert!(matches!(
            check_ballot(&m, 10, now + Duration::minutes(5)),
            Err(BracketError::VotingClosed)
        ));
    }

    #[test]
    fn test_decide_winner() {
        let mut m = ready_match();
        assert!(matches!(decide_winner(&m, None), Err(BracketError::AmbiguousResult)));
        assert_eq!(decide_winner(&m, Some(20)).unwrap(), 20);
        assert!(matches!(decide_winner(&m, Some(99)), Err(BracketError::InvalidChoice(99))));

        m.votes_performer_2 = 3;
        assert_eq!(decide_winner(&m, None).unwrap(), 20);
        m.votes_performer_1 = 4;
        assert_eq!(decide_winner(&m, None).unwrap(), 10);
    }

    #[test]
    fn test_close_match_sets_winner_and_loser() {
        let mut m = ready_match();
        open_voting(&mut m, 10, Utc::now()).unwrap();

        close_match(&mut m, 20, Utc::now()).unwrap();

        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner_id, Some(20));
        assert_eq!(m.loser_id, Some(10));
        assert!(matches!(
            close_match(&mut m, 20, Utc::now()),
            Err(BracketError::InvalidState(_))
        ));
    }
}
