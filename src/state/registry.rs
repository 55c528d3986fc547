//! The shared claim table of a crawl run
//!
//! Every URL observed during a run passes through [`VisitRegistry::claim_or_join`],
//! a single check-and-claim under one lock. The first caller becomes the
//! owner of the URL's computation; concurrent callers attach to the same
//! shared future; callers arriving after it settled get the stored value.

use crate::state::VisitState;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// A visit computation that any number of callers may await
pub type SharedVisit<T> = Shared<BoxFuture<'static, T>>;

/// Outcome of [`VisitRegistry::claim_or_join`]
pub enum Claim<T: Clone> {
    /// The caller claimed the URL and must settle it
    Owner(SharedVisit<T>),

    /// Another caller owns the URL; await its computation
    Joined(SharedVisit<T>),

    /// The URL already settled during this run
    Settled(T),
}

enum Slot<T: Clone> {
    Pending(SharedVisit<T>),
    Settled(T),
}

struct Entry<T: Clone> {
    state: VisitState,
    slot: Slot<T>,
}

/// Visited set, pending computations and settled outcomes behind one mutex
///
/// Entries are never removed: a URL claimed once stays claimed for the
/// lifetime of the registry, whether it completed or failed.
pub struct VisitRegistry<T: Clone> {
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone + Send + Sync + 'static> VisitRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claims `key` or attaches to whoever already did
    ///
    /// `make` is only invoked when the caller becomes the owner. It must
    /// not touch the registry, since it runs while the lock is held.
    pub fn claim_or_join<F>(&self, key: &str, make: F) -> Claim<T>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut entries = self.lock();

        if let Some(entry) = entries.get(key) {
            return match &entry.slot {
                Slot::Pending(shared) => Claim::Joined(shared.clone()),
                Slot::Settled(value) => Claim::Settled(value.clone()),
            };
        }

        let shared = make().shared();
        entries.insert(
            key.to_string(),
            Entry {
                state: VisitState::Claimed,
                slot: Slot::Pending(shared.clone()),
            },
        );
        Claim::Owner(shared)
    }

    /// Records that a page is now open for `key`
    pub fn mark_in_flight(&self, key: &str) -> bool {
        self.transition(key, VisitState::InFlight)
    }

    /// Stores the final outcome for `key` and drops its pending computation
    pub fn settle(&self, key: &str, value: T, state: VisitState) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            warn!(url = %key, "Attempted to settle an unclaimed URL");
            return false;
        };

        if !entry.state.can_transition_to(state) {
            warn!(url = %key, from = %entry.state, to = %state, "Rejected visit transition");
            return false;
        }

        entry.state = state;
        entry.slot = Slot::Settled(value);
        true
    }

    fn transition(&self, key: &str, state: VisitState) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.state.can_transition_to(state) => {
                entry.state = state;
                true
            }
            Some(entry) => {
                warn!(url = %key, from = %entry.state, to = %state, "Rejected visit transition");
                false
            }
            None => false,
        }
    }

    pub fn state(&self, key: &str) -> VisitState {
        self.lock()
            .get(key)
            .map(|entry| entry.state)
            .unwrap_or(VisitState::Unseen)
    }

    /// Number of URLs claimed during this run, settled or not
    pub fn claimed_count(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of every settled outcome
    pub fn settled(&self) -> Vec<(String, T)> {
        self.lock()
            .iter()
            .filter_map(|(key, entry)| match &entry.slot {
                Slot::Settled(value) => Some((key.clone(), value.clone())),
                Slot::Pending(_) => None,
            })
            .collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for VisitRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
