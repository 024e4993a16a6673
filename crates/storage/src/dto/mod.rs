pub mod competition;
pub mod matches;
