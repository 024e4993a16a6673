//! Bracket generation and progression for festival competitions.

pub mod advancement;
pub mod clock;
pub mod engine;
pub mod error;
pub mod generator;
pub mod layout;
pub mod locks;
pub mod position;
pub mod sink;
pub mod standings;
pub mod view;
pub mod voting;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{AdvanceOutcome, BracketEngine, CloseFailure, CloseSummary, Completion, VoteOutcome};
pub use error::{BracketError, Result};
pub use position::BracketPosition;
pub use sink::{MatchSnapshot, SnapshotSink, TracingSink};
pub use standings::StandingRow;
pub use view::{BracketView, MatchView, PerformerSlotView};
