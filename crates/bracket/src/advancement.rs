//! Moves completed results through an elimination bracket.
//!
//! `propagate` works on an in-memory map of position to match so the same
//! code seeds round 2 during generation and advances live brackets. It only
//! ever fills empty slots, which makes running it twice harmless.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use storage::models::{Match, MatchStatus, NewMatch};

use crate::error::{BracketError, Result};
use crate::layout::{BracketLayout, Destination, Outcome};
use crate::position::{BracketPosition, Slot, SlotRef};

/// Slot access shared by persisted matches and freshly generated ones
pub trait BracketSlots {
    fn performer(&self, slot: Slot) -> Option<i64>;
    fn seed(&self, slot: Slot) -> Option<i32>;
    fn fill(&mut self, slot: Slot, performer: i64, seed: Option<i32>);
    fn status(&self) -> MatchStatus;
    fn winner(&self) -> Option<i64>;
    fn loser(&self) -> Option<i64>;
    /// Completes the match without a vote, `performer` advancing alone
    fn complete_as_bye(&mut self, performer: i64, at: DateTime<Utc>);

    fn seed_of(&self, performer: i64) -> Option<i32> {
        [Slot::First, Slot::Second]
            .into_iter()
            .find(|slot| self.performer(*slot) == Some(performer))
            .and_then(|slot| self.seed(slot))
    }
}

macro_rules! impl_bracket_slots {
    ($($ty:ty),*) => {$(
        impl BracketSlots for $ty {
            fn performer(&self, slot: Slot) -> Option<i64> {
                match slot {
                    Slot::First => self.performer_1_id,
                    Slot::Second => self.performer_2_id,
                }
            }

            fn seed(&self, slot: Slot) -> Option<i32> {
                match slot {
                    Slot::First => self.performer_1_seed,
                    Slot::Second => self.performer_2_seed,
                }
            }

            fn fill(&mut self, slot: Slot, performer: i64, seed: Option<i32>) {
                match slot {
                    Slot::First => {
                        self.performer_1_id = Some(performer);
                        self.performer_1_seed = seed;
                    }
                    Slot::Second => {
                        self.performer_2_id = Some(performer);
                        self.performer_2_seed = seed;
                    }
                }
            }

            fn status(&self) -> MatchStatus {
                self.status
            }

            fn winner(&self) -> Option<i64> {
                self.winner_id
            }

            fn loser(&self) -> Option<i64> {
                self.loser_id
            }

            fn complete_as_bye(&mut self, performer: i64, at: DateTime<Utc>) {
                self.winner_id = Some(performer);
                self.loser_id = None;
                self.status = MatchStatus::Completed;
                self.completed_at = Some(at);
            }
        }
    )*};
}

impl_bracket_slots!(Match, NewMatch);

/// Side effects of propagating one or more results
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Propagation {
    /// Positions whose match changed and must be written back
    pub touched: BTreeSet<BracketPosition>,
    /// Set when a result decided the competition
    pub champion: Option<i64>,
    /// Set when the losers-bracket entrant took grand finals
    pub reset_activated: bool,
}

impl Propagation {
    pub fn merge(&mut self, other: Propagation) {
        self.touched.extend(other.touched);
        self.champion = other.champion.or(self.champion);
        self.reset_activated |= other.reset_activated;
    }
}

/// True when the slot can never receive a performer: its feeding match was
/// never created, or completed as a bye with nobody to send down.
pub fn slot_is_dead<M: BracketSlots>(
    layout: &BracketLayout,
    matches: &BTreeMap<BracketPosition, M>,
    slot: SlotRef,
) -> bool {
    let Some(feeder) = layout.feeder(slot) else {
        return false;
    };

    match matches.get(&feeder.from) {
        None => true,
        Some(source) => {
            source.status() == MatchStatus::Completed
                && match feeder.outcome {
                    Outcome::Winner => source.winner().is_none(),
                    Outcome::Loser => source.loser().is_none(),
                }
        }
    }
}

/// Routes the result of the completed match at `from`, following any byes
/// the placement unlocks.
pub fn propagate<M: BracketSlots>(
    layout: &BracketLayout,
    matches: &mut BTreeMap<BracketPosition, M>,
    from: BracketPosition,
    now: DateTime<Utc>,
) -> Result<Propagation> {
    let mut result = Propagation::default();
    let mut queue = VecDeque::from([from]);

    while let Some(position) = queue.pop_front() {
        let source = matches
            .get(&position)
            .ok_or_else(|| BracketError::InvalidBracket(format!("no match at {position}")))?;

        if source.status() != MatchStatus::Completed {
            return Err(BracketError::InvalidState(format!(
                "match {position} has not been completed"
            )));
        }
        let winner = source.winner().ok_or_else(|| {
            BracketError::InvalidBracket(format!("completed match {position} has no winner"))
        })?;
        let loser = source.loser();
        let winner_seed = source.seed_of(winner);
        let loser_seed = loser.and_then(|id| source.seed_of(id));

        if position == BracketPosition::GrandFinals {
            let winners_entrant = source.performer(Slot::First);
            if Some(winner) == winners_entrant {
                result.champion = Some(winner);
            } else {
                let entrants = [Slot::First, Slot::Second]
                    .map(|slot| (slot, source.performer(slot), source.seed(slot)));
                for (slot, performer, seed) in entrants {
                    if let Some(performer) = performer {
                        let to = SlotRef::new(BracketPosition::GrandFinalsReset, slot);
                        place(layout, matches, to, performer, seed, now, &mut result, &mut queue)?;
                    }
                }
                result.reset_activated = true;
            }
            continue;
        }

        let routes = layout.routes(position).ok_or_else(|| {
            BracketError::InvalidBracket(format!("{position} is not part of this bracket layout"))
        })?;

        match routes.winner {
            Destination::Slot(to) => {
                place(layout, matches, to, winner, winner_seed, now, &mut result, &mut queue)?
            }
            Destination::Champion => result.champion = Some(winner),
            Destination::Eliminated => {}
        }

        if let (Some(loser), Destination::Slot(to)) = (loser, routes.loser) {
            place(layout, matches, to, loser, loser_seed, now, &mut result, &mut queue)?;
        }
    }

    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn place<M: BracketSlots>(
    layout: &BracketLayout,
    matches: &mut BTreeMap<BracketPosition, M>,
    to: SlotRef,
    performer: i64,
    seed: Option<i32>,
    now: DateTime<Utc>,
    result: &mut Propagation,
    queue: &mut VecDeque<BracketPosition>,
) -> Result<()> {
    let target = matches.get_mut(&to.position).ok_or_else(|| {
        BracketError::InvalidBracket(format!("advancement target {} is missing", to.position))
    })?;

    match target.performer(to.slot) {
        Some(existing) if existing == performer => {}
        Some(existing) => {
            tracing::warn!(
                position = %to.position,
                existing,
                performer,
                "Advancement target slot already holds another performer; leaving it"
            );
            return Ok(());
        }
        None if target.status() != MatchStatus::Pending => {
            tracing::warn!(position = %to.position, "Advancement target is no longer pending");
            return Ok(());
        }
        None => {
            target.fill(to.slot, performer, seed);
            result.touched.insert(to.position);
        }
    }

    let other = SlotRef::new(to.position, to.slot.other());
    let waiting_alone = target.status() == MatchStatus::Pending
        && target.performer(other.slot).is_none();
    if waiting_alone && slot_is_dead(layout, matches, other) {
        if let Some(target) = matches.get_mut(&to.position) {
            target.complete_as_bye(performer, now);
            result.touched.insert(to.position);
            queue.push_back(to.position);
        }
    }

    Ok(())
}
