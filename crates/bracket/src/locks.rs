//! Keyed async locks for competitions and matches.
//!
//! Callers that need both take the competition lock first, then the match
//! lock. Vote submission only ever takes the match lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entries nobody holds or waits on are dropped once the map grows past this
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockKey {
    Competition(i64),
    Match(i64),
}

pub type LockGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn competition(&self, competition_id: i64) -> LockGuard {
        self.acquire(LockKey::Competition(competition_id)).await
    }

    pub async fn matches(&self, match_id: i64) -> LockGuard {
        self.acquire(LockKey::Match(match_id)).await
    }

    async fn acquire(&self, key: LockKey) -> LockGuard {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() > PRUNE_THRESHOLD {
                entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            entries.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(LockRegistry::new());
        let guard = locks.matches(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.matches(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_competition_and_match_keys_are_independent() {
        let locks = LockRegistry::new();
        let _competition = locks.competition(1).await;
        let _matches = locks.matches(1).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = LockRegistry::new();
        for id in 0..=PRUNE_THRESHOLD as i64 {
            drop(locks.matches(id).await);
        }
        let _held = locks.competition(1).await;
        assert!(locks.len() <= 2);
    }
}
