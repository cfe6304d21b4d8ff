// ── Snapshot freshness tracking ──

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::CoreError;

/// How trustworthy a cached snapshot currently is.
///
/// A failed refresh never empties the snapshot; it flips the cell to
/// `Stale` so readers can distinguish "old but serviceable" data from
/// fresh data without an error in hand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Freshness {
    /// No fetch has completed since the store was created.
    #[default]
    Never,
    /// The last fetch succeeded at `at`.
    Fresh { at: DateTime<Utc> },
    /// The last fetch failed at `at`; data from an earlier success is
    /// still served.
    Stale { at: DateTime<Utc>, error: String },
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// When the last fetch attempt finished, successful or not.
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::Fresh { at } | Self::Stale { at, .. } => Some(*at),
        }
    }
}

/// Watchable [`Freshness`] cell, one per fetched collection.
pub(crate) struct FreshnessCell {
    cell: watch::Sender<Freshness>,
}

impl FreshnessCell {
    pub(crate) fn new() -> Self {
        let (cell, _) = watch::channel(Freshness::Never);
        Self { cell }
    }

    pub(crate) fn mark_fresh(&self) {
        self.cell.send_replace(Freshness::Fresh { at: Utc::now() });
    }

    pub(crate) fn mark_stale(&self, error: &CoreError) {
        self.cell.send_replace(Freshness::Stale {
            at: Utc::now(),
            error: error.to_string(),
        });
    }

    pub(crate) fn get(&self) -> Freshness {
        self.cell.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Freshness> {
        self.cell.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_never_and_tracks_attempts() {
        let cell = FreshnessCell::new();
        assert_eq!(cell.get(), Freshness::Never);
        assert!(cell.get().last_attempt().is_none());

        cell.mark_fresh();
        assert!(cell.get().is_fresh());
        assert!(cell.get().last_attempt().is_some());
    }

    #[test]
    fn stale_carries_the_rendered_error() {
        let cell = FreshnessCell::new();
        cell.mark_fresh();
        cell.mark_stale(&CoreError::Connection {
            reason: "connection refused".into(),
        });

        match cell.get() {
            Freshness::Stale { error, .. } => assert!(error.contains("connection refused")),
            other => panic!("expected Stale, got: {other:?}"),
        }
        assert!(!cell.get().is_fresh());

        // The next success recovers the cell.
        cell.mark_fresh();
        assert!(cell.get().is_fresh());
        assert!(!cell.get().is_stale());
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let cell = FreshnessCell::new();
        let mut rx = cell.subscribe();

        cell.mark_fresh();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_fresh());
    }
}
