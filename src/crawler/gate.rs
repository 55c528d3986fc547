//! Counting gate bounding the number of simultaneously open pages

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A slot held while a page is open
///
/// The slot is returned when the permit is dropped, including on early
/// return, error or task cancellation.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` once the gate has been closed; waiters are woken in
    /// FIFO order.
    pub async fn acquire(&self) -> Option<GatePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .ok()
            .map(|permit| GatePermit { _permit: permit })
    }

    /// Rejects all current and future waiters
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
