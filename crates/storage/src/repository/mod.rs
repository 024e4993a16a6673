pub mod competition;
pub mod matches;
pub mod performer;
pub mod vote;

pub use competition::CompetitionRepository;
pub use matches::MatchRepository;
pub use performer::PerformerRepository;
pub use vote::VoteRepository;
