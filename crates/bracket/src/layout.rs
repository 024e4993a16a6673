//! Routing tables for elimination brackets.
//!
//! A `BracketLayout` is derived once per (format, winners rounds) and answers
//! two questions without any string handling: where do the winner and loser
//! of a position go, and which earlier result feeds a given slot.

use std::collections::{BTreeMap, HashMap};

use storage::models::CompetitionType;

use crate::position::{BracketPosition, Slot, SlotRef};

/// Where a match result is sent once the match completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Slot(SlotRef),
    /// Winning this match wins the competition
    Champion,
    /// The performer leaves the competition
    Eliminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRoutes {
    pub winner: Destination,
    pub loser: Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner,
    Loser,
}

/// The earlier result that fills a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feeder {
    pub from: BracketPosition,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct BracketLayout {
    format: CompetitionType,
    winners_rounds: u32,
    routes: BTreeMap<BracketPosition, MatchRoutes>,
    feeders: HashMap<SlotRef, Feeder>,
}

/// Smallest power of two holding `entrants`
pub fn bracket_size(entrants: usize) -> usize {
    entrants.max(2).next_power_of_two()
}

/// Number of winners-bracket rounds for a bracket of `size`
pub fn rounds_for_size(size: usize) -> u32 {
    size.max(2).trailing_zeros()
}

/// Standard tournament seed order for a power-of-two bracket.
///
/// Adjacent pairs are round-1 opponents, so seed 1 meets seed `size`, seed 2
/// meets seed `size - 1`, and top seeds only meet in late rounds.
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut seeds = vec![1usize];
    while seeds.len() < size {
        let n = seeds.len();
        let mut next = Vec::with_capacity(n * 2);
        for seed in seeds.iter().copied() {
            next.push(seed);
            next.push(n * 2 + 1 - seed);
        }
        seeds = next;
    }
    seeds
}

impl BracketLayout {
    pub fn new(format: CompetitionType, winners_rounds: u32) -> Self {
        let mut layout = Self {
            format,
            winners_rounds,
            routes: BTreeMap::new(),
            feeders: HashMap::new(),
        };

        match format {
            CompetitionType::SingleElimination => layout.build_winners(false),
            CompetitionType::DoubleElimination => {
                layout.build_winners(true);
                layout.build_losers();
                layout.build_grand_finals();
            }
            CompetitionType::RoundRobin => {}
        }

        layout
    }

    /// Losers-bracket rounds: two per winners round after the first
    pub fn losers_rounds(&self) -> u32 {
        if self.format == CompetitionType::DoubleElimination {
            2 * self.winners_rounds.saturating_sub(1)
        } else {
            0
        }
    }

    pub fn routes(&self, position: BracketPosition) -> Option<MatchRoutes> {
        self.routes.get(&position).copied()
    }

    pub fn feeder(&self, slot: SlotRef) -> Option<Feeder> {
        self.feeders.get(&slot).copied()
    }

    /// Every position of the layout, winners first, in creation order
    pub fn positions(&self) -> impl Iterator<Item = BracketPosition> + '_ {
        self.routes.keys().copied()
    }

    fn winners_in_round(&self, round: u32) -> u32 {
        1 << (self.winners_rounds - round)
    }

    /// Matches in losers round `round`: rounds 2i-1 and 2i both hold half as
    /// many matches as winners round i+1 feeds in.
    fn losers_in_round(&self, round: u32) -> u32 {
        let stage = round.div_ceil(2);
        1 << (self.winners_rounds - stage - 1)
    }

    fn link(&mut self, from: BracketPosition, outcome: Outcome, to: SlotRef) {
        self.feeders.insert(to, Feeder { from, outcome });
    }

    fn build_winners(&mut self, double: bool) {
        let rounds = self.winners_rounds;
        for round in 1..=rounds {
            for index in 1..=self.winners_in_round(round) {
                let position = BracketPosition::winners(round, index);

                let winner = if round < rounds {
                    let to = SlotRef::new(
                        BracketPosition::winners(round + 1, index.div_ceil(2)),
                        Slot::from_feeder_index(index),
                    );
                    self.link(position, Outcome::Winner, to);
                    Destination::Slot(to)
                } else if double {
                    let to = SlotRef::new(BracketPosition::GrandFinals, Slot::First);
                    self.link(position, Outcome::Winner, to);
                    Destination::Slot(to)
                } else {
                    Destination::Champion
                };

                let loser = if double {
                    let to = self.loser_drop(round, index);
                    self.link(position, Outcome::Loser, to);
                    Destination::Slot(to)
                } else {
                    Destination::Eliminated
                };

                self.routes.insert(position, MatchRoutes { winner, loser });
            }
        }
    }

    /// Losers-bracket slot receiving the loser of winners match (round, index).
    ///
    /// Round-1 losers pair up in losers round 1. A loser of winners round r
    /// (r >= 2) meets the survivor of losers round 2r-3 in losers round 2r-2.
    /// Even winners rounds drop in reverse order, so a loser lands on the
    /// other half of the losers bracket from the performers they just beat.
    /// With a single winners round the loser goes straight to grand finals.
    fn loser_drop(&self, round: u32, index: u32) -> SlotRef {
        if self.winners_rounds == 1 {
            SlotRef::new(BracketPosition::GrandFinals, Slot::Second)
        } else if round == 1 {
            SlotRef::new(
                BracketPosition::losers(1, index.div_ceil(2)),
                Slot::from_feeder_index(index),
            )
        } else {
            let index = if round % 2 == 0 {
                self.winners_in_round(round) + 1 - index
            } else {
                index
            };
            SlotRef::new(BracketPosition::losers(2 * round - 2, index), Slot::Second)
        }
    }

    fn build_losers(&mut self) {
        let last = self.losers_rounds();
        for round in 1..=last {
            for index in 1..=self.losers_in_round(round) {
                let position = BracketPosition::losers(round, index);

                let to = if round == last {
                    SlotRef::new(BracketPosition::GrandFinals, Slot::Second)
                } else if round % 2 == 1 {
                    SlotRef::new(BracketPosition::losers(round + 1, index), Slot::First)
                } else {
                    SlotRef::new(
                        BracketPosition::losers(round + 1, index.div_ceil(2)),
                        Slot::from_feeder_index(index),
                    )
                };
                self.link(position, Outcome::Winner, to);

                self.routes.insert(
                    position,
                    MatchRoutes {
                        winner: Destination::Slot(to),
                        loser: Destination::Eliminated,
                    },
                );
            }
        }
    }

    fn build_grand_finals(&mut self) {
        // The grand finals winner only becomes champion when the winners
        // entrant takes it; the advancement engine handles the reset branch.
        self.routes.insert(
            BracketPosition::GrandFinals,
            MatchRoutes {
                winner: Destination::Champion,
                loser: Destination::Eliminated,
            },
        );
        self.routes.insert(
            BracketPosition::GrandFinalsReset,
            MatchRoutes {
                winner: Destination::Champion,
                loser: Destination::Eliminated,
            },
        );
    }
}
