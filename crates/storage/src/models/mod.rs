mod competition;
mod matches;
mod performer;
mod vote;

pub use competition::{
    Competition, CompetitionChanges, CompetitionStatus, CompetitionType, NewCompetition,
    VotingMethod,
};
pub use matches::{BracketType, Match, MatchStatus, MatchVersion, NewMatch};
pub use performer::Performer;
pub use vote::{NewVote, Vote, VoteRecord};
