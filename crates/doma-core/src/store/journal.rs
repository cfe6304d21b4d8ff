// ── Optimistic mutation journal ──
//
// Every mutating store call opens a ticket whose state advances
// `Pending → Applied | Reverted` on a `watch` channel, so callers can
// fire a mutation optimistically and still await its outcome.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
    /// Request in flight; any staged draft is visible locally.
    Pending,
    /// The backend accepted the mutation; the confirmed snapshot now
    /// carries it.
    Applied,
    /// The backend rejected the mutation or transport failed; any
    /// staged draft was rolled back to the last confirmed value.
    Reverted { reason: String },
}

impl MutationState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Handle to one journaled mutation.
#[derive(Debug)]
pub struct MutationTicket {
    id: u64,
    target: String,
    state: watch::Receiver<MutationState>,
}

impl MutationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// What the mutation addressed, e.g. `"device light-1"`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// State right now, without waiting.
    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    /// Wait until the mutation settles and return the final state.
    pub async fn outcome(mut self) -> MutationState {
        loop {
            let current = self.state.borrow_and_update().clone();
            if current.is_settled() {
                return current;
            }
            if self.state.changed().await.is_err() {
                // The journal resolved and dropped the sender; the last
                // value it sent stands.
                return self.state.borrow().clone();
            }
        }
    }
}

/// Issues tickets and resolves them exactly once.
pub(crate) struct Journal {
    next_id: AtomicU64,
    in_flight: DashMap<u64, watch::Sender<MutationState>>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            in_flight: DashMap::new(),
        }
    }

    /// Open a ticket in `Pending`.
    pub(crate) fn begin(&self, target: impl Into<String>) -> MutationTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(MutationState::Pending);
        self.in_flight.insert(id, tx);

        MutationTicket {
            id,
            target: target.into(),
            state: rx,
        }
    }

    pub(crate) fn applied(&self, id: u64) {
        self.resolve(id, MutationState::Applied);
    }

    pub(crate) fn reverted(&self, id: u64, reason: impl Into<String>) {
        self.resolve(
            id,
            MutationState::Reverted {
                reason: reason.into(),
            },
        );
    }

    /// Mutations still awaiting a response.
    pub(crate) fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    fn resolve(&self, id: u64, state: MutationState) {
        // Receivers still read the final value after the sender drops.
        if let Some((_, tx)) = self.in_flight.remove(&id) {
            tx.send_replace(state);
        }
    }
}
