pub mod competitions;
pub mod matches;
