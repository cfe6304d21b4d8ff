// ── Snapshot subscriptions ──
//
// Handle types for consuming store snapshots reactively, either by
// awaiting `changed` in a loop or through the `Stream` adapter.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A live view of one resource collection.
///
/// Holds the snapshot observed at subscription time; [`changed`](Self::changed)
/// waits for the next rebuild and advances the held view, while
/// [`latest`](Self::latest) peeks at the store's current state without
/// consuming the change notification.
pub struct Subscription<T: Send + Sync + 'static> {
    held: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let held = receiver.borrow().clone();
        Self { held, receiver }
    }

    /// The snapshot this subscription last observed.
    pub fn snapshot(&self) -> &Arc<Vec<Arc<T>>> {
        &self.held
    }

    /// The store's current snapshot, which may be ahead of
    /// [`snapshot`](Self::snapshot).
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next rebuild and return the new snapshot.
    ///
    /// Returns `None` once the owning store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.held = Arc::clone(&snap);
        Some(snap)
    }

    /// Adapt into a `Stream` for combinator-style consumers.
    ///
    /// The stream yields the current snapshot first, then one item per
    /// rebuild.
    pub fn into_stream(self) -> SnapshotStream<T> {
        SnapshotStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a subscription's watch receiver.
pub struct SnapshotStream<T: Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> Stream for SnapshotStream<T> {
    type Item = Arc<Vec<Arc<T>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is always Unpin; Pin::new is enough here.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;
    use crate::store::collection::Collection;

    fn seeded(ids: &[&str]) -> Collection<String, String> {
        let col: Collection<String, String> = Collection::new();
        col.replace_all(ids.iter().map(|id| (*id).to_owned()).collect(), Clone::clone);
        col
    }

    #[tokio::test]
    async fn changed_advances_the_held_snapshot() {
        let col = seeded(&["a"]);
        let mut sub = Subscription::new(col.subscribe());
        assert_eq!(sub.snapshot().len(), 1);

        col.stage("a", "a-draft".into());
        assert_eq!(*sub.snapshot()[0], "a", "held view lags until changed");
        assert_eq!(*sub.latest()[0], "a-draft");

        let snap = sub.changed().await.unwrap();
        assert_eq!(*snap[0], "a-draft");
        assert_eq!(*sub.snapshot()[0], "a-draft");
    }

    #[tokio::test]
    async fn changed_ends_when_the_store_is_dropped() {
        let col = seeded(&[]);
        let mut sub = Subscription::new(col.subscribe());
        drop(col);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn stream_yields_the_current_snapshot_first() {
        let col = seeded(&["a"]);
        let mut stream = Subscription::new(col.subscribe()).into_stream();

        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);

        col.replace_all(vec!["a".into(), "b".into()], Clone::clone);
        let second = stream.next().await.unwrap();
        assert_eq!(second.len(), 2);
    }
}
