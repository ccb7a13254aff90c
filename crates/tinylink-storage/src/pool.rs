use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tinylink_core::repository::{KeyPool, Result};
use tinylink_core::ShortCode;

#[derive(Debug, Default)]
struct PoolState {
    /// Every code ever seeded, mapped to its claimed flag.
    entries: HashMap<ShortCode, bool>,
    unclaimed: VecDeque<ShortCode>,
}

/// In-memory key pool.
///
/// Claiming pops the next unclaimed code and flips its flag under a single
/// lock, so two claimants can never observe the same entry as free.
#[derive(Debug, Default)]
pub struct InMemoryKeyPool {
    state: Mutex<PoolState>,
}

impl InMemoryKeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `code` has been seeded and already claimed.
    pub fn is_claimed(&self, code: &ShortCode) -> bool {
        self.state.lock().entries.get(code).copied().unwrap_or(false)
    }

    /// Total number of entries, claimed or not.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyPool for InMemoryKeyPool {
    async fn claim(&self) -> Result<Option<ShortCode>> {
        let mut state = self.state.lock();
        let Some(code) = state.unclaimed.pop_front() else {
            return Ok(None);
        };
        state.entries.insert(code.clone(), true);
        Ok(Some(code))
    }

    async fn seed(&self, codes: &[ShortCode]) -> Result<u64> {
        let mut state = self.state.lock();
        let mut added = 0;
        for code in codes {
            if state.entries.contains_key(code) {
                continue;
            }
            state.entries.insert(code.clone(), false);
            state.unclaimed.push_back(code.clone());
            added += 1;
        }
        Ok(added)
    }

    async fn remaining(&self) -> Result<u64> {
        Ok(self.state.lock().unclaimed.len() as u64)
    }
}
