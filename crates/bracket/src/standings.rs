use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storage::models::{Match, MatchStatus};
use utoipa::ToSchema;

pub const POINTS_PER_WIN: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StandingRow {
    pub performer_id: i64,
    pub played: i64,
    pub wins: i64,
    pub losses: i64,
    pub total_votes: i64,
    pub points: i64,
}

/// Standings over the completed, contested matches of a competition.
///
/// Sorted by points then total votes, both descending. Remaining ties keep
/// the order in which performers first appear by match number.
pub fn compute_standings(matches: &[Match]) -> Vec<StandingRow> {
    let mut ordered: Vec<&Match> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Completed && m.is_ready())
        .collect();
    ordered.sort_by_key(|m| m.match_number);

    let mut rows: Vec<StandingRow> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for m in ordered {
        for (performer, votes) in [
            (m.performer_1_id, m.votes_performer_1),
            (m.performer_2_id, m.votes_performer_2),
        ] {
            let Some(performer) = performer else { continue };
            let slot = *index.entry(performer).or_insert_with(|| {
                rows.push(StandingRow {
                    performer_id: performer,
                    played: 0,
                    wins: 0,
                    losses: 0,
                    total_votes: 0,
                    points: 0,
                });
                rows.len() - 1
            });

            let row = &mut rows[slot];
            row.played += 1;
            row.total_votes += votes;
            if m.winner_id == Some(performer) {
                row.wins += 1;
                row.points += POINTS_PER_WIN;
            } else if m.loser_id == Some(performer) {
                row.losses += 1;
            }
        }
    }

    // Stable sort keeps first-appearance order for full ties.
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.total_votes.cmp(&a.total_votes))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::models::{BracketType, NewMatch};

    fn result(number: i32, p1: i64, p2: i64, votes: (i64, i64), winner: i64) -> Match {
        let mut m = NewMatch::pending(number, 1, BracketType::Winners, format!("W_R1M{number}"));
        m.performer_1_id = Some(p1);
        m.performer_2_id = Some(p2);
        let mut m = m.into_match(number as i64, 1);
        m.votes_performer_1 = votes.0;
        m.votes_performer_2 = votes.1;
        m.winner_id = Some(winner);
        m.loser_id = Some(if winner == p1 { p2 } else { p1 });
        m.status = MatchStatus::Completed;
        m
    }

    #[test]
    fn test_points_are_three_per_win() {
        let matches = vec![
            result(1, 1, 2, (5, 3), 1),
            result(2, 1, 3, (4, 6), 3),
            result(3, 2, 3, (7, 2), 2),
        ];

        let standings = compute_standings(&matches);

        assert_eq!(standings.len(), 3);
        for row in &standings {
            assert_eq!(row.points, 3 * row.wins);
            assert_eq!(row.wins + row.losses, row.played);
        }
    }

    #[test]
    fn test_sorted_by_points_then_votes() {
        let matches = vec![
            result(1, 1, 2, (5, 3), 1),
            result(2, 1, 3, (4, 6), 3),
            result(3, 2, 3, (7, 2), 2),
            result(4, 4, 1, (1, 9), 1),
        ];

        let standings = compute_standings(&matches);
        let order: Vec<i64> = standings.iter().map(|r| r.performer_id).collect();

        // 1: 2 wins, 18 votes. 2 and 3: 1 win each, 10 vs 8 votes. 4: none.
        assert_eq!(order, vec![1, 2, 3, 4]);
        for pair in standings.windows(2) {
            assert!((pair[0].points, pair[0].total_votes) >= (pair[1].points, pair[1].total_votes));
        }
    }

    #[test]
    fn test_full_tie_keeps_first_appearance_order() {
        let matches = vec![result(1, 7, 8, (2, 2), 7), result(2, 8, 7, (2, 2), 8)];

        let standings = compute_standings(&matches);

        assert_eq!(standings[0].performer_id, 7);
        assert_eq!(standings[1].performer_id, 8);
    }

    #[test]
    fn test_pending_matches_and_byes_are_ignored() {
        let mut pending = result(1, 1, 2, (3, 0), 1);
        pending.status = MatchStatus::Voting;
        pending.winner_id = None;
        pending.loser_id = None;

        let mut bye = result(2, 3, 4, (0, 0), 3);
        bye.performer_2_id = None;
        bye.loser_id = None;

        assert!(compute_standings(&[pending, bye]).is_empty());
    }
}
