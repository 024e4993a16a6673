//! Builds the full match set of a competition in memory.
//!
//! Nothing here touches the store: the engine persists the result in a
//! single batch, so a failure can never leave half a bracket behind.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use storage::models::{BracketType, CompetitionType, NewMatch};

use crate::advancement::{self, BracketSlots};
use crate::error::{BracketError, Result};
use crate::layout::{BracketLayout, bracket_size, rounds_for_size, seed_positions};
use crate::position::{BracketPosition, Slot, SlotRef};

#[derive(Debug, Clone)]
pub struct GeneratedBracket {
    pub rounds_count: i32,
    pub matches: Vec<NewMatch>,
}

/// Generates every match for `format` from performers given in seed order.
pub fn generate(
    format: CompetitionType,
    performer_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<GeneratedBracket> {
    if performer_ids.len() < 2 {
        return Err(BracketError::InsufficientParticipants(performer_ids.len()));
    }

    let mut seen = HashSet::with_capacity(performer_ids.len());
    for id in performer_ids {
        if !seen.insert(*id) {
            return Err(BracketError::DuplicatePerformer(*id));
        }
    }

    match format {
        CompetitionType::RoundRobin => Ok(round_robin(performer_ids)),
        CompetitionType::SingleElimination | CompetitionType::DoubleElimination => {
            elimination(format, performer_ids, now)
        }
    }
}

/// Every pairing once, ordered by (lower seed, higher seed)
fn round_robin(performer_ids: &[i64]) -> GeneratedBracket {
    let n = performer_ids.len();
    let mut matches = Vec::with_capacity(n * (n - 1) / 2);

    for i in 0..n {
        for j in (i + 1)..n {
            let number = matches.len() as u32 + 1;
            let position = BracketPosition::winners(1, number);
            let mut m = NewMatch::pending(
                number as i32,
                1,
                BracketType::Winners,
                position.to_string(),
            );
            m.fill(Slot::First, performer_ids[i], Some(i as i32 + 1));
            m.fill(Slot::Second, performer_ids[j], Some(j as i32 + 1));
            matches.push(m);
        }
    }

    GeneratedBracket {
        rounds_count: 1,
        matches,
    }
}

fn elimination(
    format: CompetitionType,
    performer_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<GeneratedBracket> {
    let entrants = performer_ids.len();
    let size = bracket_size(entrants);
    let rounds = rounds_for_size(size);
    let layout = BracketLayout::new(format, rounds);
    let seeds = seed_positions(size);

    let mut bracket: BTreeMap<BracketPosition, NewMatch> = BTreeMap::new();
    let mut byes = Vec::new();

    for position in layout.positions() {
        if matches!(position, BracketPosition::Losers { .. }) {
            let first = SlotRef::new(position, Slot::First);
            let second = SlotRef::new(position, Slot::Second);
            if advancement::slot_is_dead(&layout, &bracket, first)
                && advancement::slot_is_dead(&layout, &bracket, second)
            {
                tracing::debug!(%position, "Skipping losers match that can never be filled");
                continue;
            }
        }

        let mut m = NewMatch::pending(
            0,
            position.round() as i32,
            position.bracket_type(),
            position.to_string(),
        );

        if let BracketPosition::Winners { round: 1, index } = position {
            let offset = 2 * (index as usize - 1);
            for (slot, seed) in [(Slot::First, seeds[offset]), (Slot::Second, seeds[offset + 1])] {
                if seed <= entrants {
                    m.fill(slot, performer_ids[seed - 1], Some(seed as i32));
                }
            }

            if let (Some(present), None) | (None, Some(present)) = (m.performer_1_id, m.performer_2_id) {
                m.complete_as_bye(present, now);
                byes.push(position);
            }
        }

        bracket.insert(position, m);
    }

    for position in byes {
        advancement::propagate(&layout, &mut bracket, position, now)?;
    }

    let matches = bracket
        .into_values()
        .enumerate()
        .map(|(i, mut m)| {
            m.match_number = i as i32 + 1;
            m
        })
        .collect();

    Ok(GeneratedBracket {
        rounds_count: rounds as i32,
        matches,
    })
}
