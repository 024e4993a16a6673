//! Bracket position tokens.
//!
//! Every match carries a compact token naming its slot in the bracket:
//! `W_R{round}M{index}` and `L_R{round}M{index}` for the winners and losers
//! trees, `GF` and `GF_RESET` for the grand finals pair. This module is the
//! only place that builds or parses those strings.

use std::fmt;
use std::str::FromStr;

use storage::models::BracketType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid bracket position token: {0:?}")]
pub struct InvalidPosition(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BracketPosition {
    Winners { round: u32, index: u32 },
    Losers { round: u32, index: u32 },
    GrandFinals,
    GrandFinalsReset,
}

impl BracketPosition {
    pub fn winners(round: u32, index: u32) -> Self {
        Self::Winners { round, index }
    }

    pub fn losers(round: u32, index: u32) -> Self {
        Self::Losers { round, index }
    }

    pub fn bracket_type(self) -> BracketType {
        match self {
            Self::Winners { .. } => BracketType::Winners,
            Self::Losers { .. } => BracketType::Losers,
            Self::GrandFinals => BracketType::GrandFinals,
            Self::GrandFinalsReset => BracketType::GrandFinalsReset,
        }
    }

    /// 1-based round within the position's own bracket
    pub fn round(self) -> u32 {
        match self {
            Self::Winners { round, .. } | Self::Losers { round, .. } => round,
            Self::GrandFinals | Self::GrandFinalsReset => 1,
        }
    }

    /// 1-based slot of the match within its round
    pub fn index(self) -> u32 {
        match self {
            Self::Winners { index, .. } | Self::Losers { index, .. } => index,
            Self::GrandFinals | Self::GrandFinalsReset => 1,
        }
    }
}

impl fmt::Display for BracketPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winners { round, index } => write!(f, "W_R{round}M{index}"),
            Self::Losers { round, index } => write!(f, "L_R{round}M{index}"),
            Self::GrandFinals => f.write_str("GF"),
            Self::GrandFinalsReset => f.write_str("GF_RESET"),
        }
    }
}

impl FromStr for BracketPosition {
    type Err = InvalidPosition;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPosition(token.to_string());

        match token {
            "GF" => return Ok(Self::GrandFinals),
            "GF_RESET" => return Ok(Self::GrandFinalsReset),
            _ => {}
        }

        let (is_winners, rest) = if let Some(rest) = token.strip_prefix("W_R") {
            (true, rest)
        } else if let Some(rest) = token.strip_prefix("L_R") {
            (false, rest)
        } else {
            return Err(invalid());
        };

        let (round, index) = rest.split_once('M').ok_or_else(invalid)?;
        let round: u32 = round.parse().map_err(|_| invalid())?;
        let index: u32 = index.parse().map_err(|_| invalid())?;
        if round == 0 || index == 0 {
            return Err(invalid());
        }

        Ok(if is_winners {
            Self::Winners { round, index }
        } else {
            Self::Losers { round, index }
        })
    }
}

/// One of the two performer slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    /// Slot fed by the `index`-th match of the previous round when two
    /// matches merge into one: odd indices land in the first slot.
    pub fn from_feeder_index(index: u32) -> Self {
        if index % 2 == 1 { Self::First } else { Self::Second }
    }

    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// A specific slot of a specific match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub position: BracketPosition,
    pub slot: Slot,
}

impl SlotRef {
    pub fn new(position: BracketPosition, slot: Slot) -> Self {
        Self { position, slot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_render_and_parse() {
        let cases = [
            ("W_R2M1", BracketPosition::winners(2, 1)),
            ("L_R3M2", BracketPosition::losers(3, 2)),
            ("W_R10M512", BracketPosition::winners(10, 512)),
            ("GF", BracketPosition::GrandFinals),
            ("GF_RESET", BracketPosition::GrandFinalsReset),
        ];

        for (token, position) in cases {
            assert_eq!(position.to_string(), token);
            assert_eq!(token.parse::<BracketPosition>(), Ok(position));
        }
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for token in ["", "W_R", "W_R1", "W_RxM1", "L_R0M1", "W_R1M0", "X_R1M1", "gf", "W_R1M1x"] {
            assert!(token.parse::<BracketPosition>().is_err(), "{token} should not parse");
        }
    }

    #[test]
    fn test_bracket_type_follows_prefix() {
        assert_eq!(BracketPosition::losers(1, 1).bracket_type(), BracketType::Losers);
        assert_eq!(BracketPosition::GrandFinalsReset.bracket_type(), BracketType::GrandFinalsReset);
    }

    #[test]
    fn test_feeder_parity() {
        assert_eq!(Slot::from_feeder_index(1), Slot::First);
        assert_eq!(Slot::from_feeder_index(2), Slot::Second);
        assert_eq!(Slot::from_feeder_index(7), Slot::First);
    }
}
