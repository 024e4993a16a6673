use std::sync::Arc;

use bracket::BracketEngine;
use storage::BracketStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BracketEngine>,
    pub default_voting_minutes: i32,
}

impl AppState {
    pub fn new(engine: BracketEngine, default_voting_minutes: i32) -> Self {
        Self {
            engine: Arc::new(engine),
            default_voting_minutes,
        }
    }

    pub fn store(&self) -> &dyn BracketStore {
        self.engine.store().as_ref()
    }
}
