// ── Draft-over-confirmed reactive collection ──
//
// Lock-free concurrent storage with O(1) lookups and push-based
// change notification via `watch` channels. Every entry keeps the
// last server-confirmed value plus an optional optimistic draft;
// reads and snapshots see the draft while one is staged.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// One stored entry: the confirmed value, an optional staged draft, and
/// the position the entry held in the last full listing.
struct Slot<T> {
    confirmed: Arc<T>,
    draft: Option<Arc<T>>,
    seq: u64,
}

impl<T> Slot<T> {
    fn visible(&self) -> Arc<T> {
        self.draft
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.confirmed))
    }
}

/// A reactive collection for a single entity family.
///
/// Uses `DashMap` for O(1) concurrent lookups and `watch` channels for
/// push-based change notification. Every mutation bumps a version
/// counter and rebuilds the snapshot that subscribers receive; snapshots
/// keep the order of the last server listing.
pub(crate) struct Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    slots: DashMap<K, Slot<T>>,

    /// Listing position handed to entries confirmed outside a full
    /// replace (e.g. a create echo before the next refetch).
    next_seq: AtomicU64,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            slots: DashMap::new(),
            next_seq: AtomicU64::new(0),
            version,
            snapshot,
        }
    }

    /// Replace the confirmed state with a fresh server listing.
    ///
    /// Upserts every incoming entry, then prunes keys absent from the
    /// incoming set; this avoids the brief empty state that a
    /// clear-then-insert would cause. Staged drafts are discarded -- the
    /// listing is the new truth.
    pub(crate) fn replace_all(&self, items: Vec<T>, key_of: impl Fn(&T) -> K) {
        let incoming: HashSet<K> = items.iter().map(&key_of).collect();

        let mut seq = 0u64;
        for item in items {
            let key = key_of(&item);
            self.slots.insert(
                key,
                Slot {
                    confirmed: Arc::new(item),
                    draft: None,
                    seq,
                },
            );
            seq += 1;
        }
        self.slots.retain(|key, _| incoming.contains(key));
        self.next_seq.store(seq, Ordering::Relaxed);

        self.rebuild_snapshot();
        self.bump_version();
    }

    /// Install a server-confirmed value, clearing any staged draft.
    /// Returns `true` if the key was new.
    pub(crate) fn confirm(&self, key: K, value: T) -> bool {
        let is_new = match self.slots.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.confirmed = Arc::new(value);
                slot.draft = None;
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    confirmed: Arc::new(value),
                    draft: None,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                });
                true
            }
        };

        self.rebuild_snapshot();
        self.bump_version();

        is_new
    }

    /// Stage an optimistic draft over `key`. Returns `false` (and stages
    /// nothing) if the key is unknown.
    pub(crate) fn stage<Q>(&self, key: &Q, value: T) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let staged = match self.slots.get_mut(key) {
            Some(mut slot) => {
                slot.draft = Some(Arc::new(value));
                true
            }
            None => false,
        };

        if staged {
            self.rebuild_snapshot();
            self.bump_version();
        }
        staged
    }

    /// Drop the draft over `key`, exposing the last confirmed value
    /// again. Returns `true` if a draft was actually dropped.
    pub(crate) fn revert<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let dropped = match self.slots.get_mut(key) {
            Some(mut slot) => slot.draft.take().is_some(),
            None => false,
        };

        if dropped {
            self.rebuild_snapshot();
            self.bump_version();
        }
        dropped
    }

    /// Turn the draft over `key` into the confirmed value. Used for
    /// acknowledged mutations whose response carries no echoed body.
    /// Returns `false` if there was no draft to promote.
    pub(crate) fn promote<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let promoted = match self.slots.get_mut(key) {
            Some(mut slot) => match slot.draft.take() {
                Some(draft) => {
                    slot.confirmed = draft;
                    true
                }
                None => false,
            },
            None => false,
        };

        if promoted {
            self.rebuild_snapshot();
            self.bump_version();
        }
        promoted
    }

    /// Remove an entry. Returns the removed confirmed value if it
    /// existed.
    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.slots.remove(key).map(|(_, slot)| slot.confirmed);

        if removed.is_some() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    /// Current visible value: the draft if one is staged, otherwise the
    /// confirmed value.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots.get(key).map(|slot| slot.visible())
    }

    /// Last server-confirmed value, ignoring any staged draft.
    pub(crate) fn get_confirmed<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots.get(key).map(|slot| Arc::clone(&slot.confirmed))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// Subscribe to the bare version counter.
    pub(crate) fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect visible values in listing order and broadcast to
    /// subscribers.
    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(u64, Arc<T>)> = self
            .slots
            .iter()
            .map(|slot| (slot.seq, slot.visible()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);

        let values: Vec<Arc<T>> = entries.into_iter().map(|(_, value)| value).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    /// Increment the version counter.
    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn listed(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_owned()).collect()
    }

    fn replace(col: &Collection<String, String>, ids: &[&str]) {
        col.replace_all(listed(ids), Clone::clone);
    }

    #[test]
    fn replace_all_keeps_listing_order() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["b", "a", "c"]);

        let snap = col.snapshot();
        let order: Vec<&str> = snap.iter().map(|v| v.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn replace_all_prunes_missing_keys() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a", "b", "c"]);
        replace(&col, &["c", "a"]);

        assert_eq!(col.len(), 2);
        assert!(col.get("b").is_none());
        let snap = col.snapshot();
        let order: Vec<&str> = snap.iter().map(|v| v.as_str()).collect();
        assert_eq!(order, ["c", "a"]);
    }

    #[test]
    fn stage_shadows_confirmed_until_reverted() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a"]);

        assert!(col.stage("a", "a-draft".into()));
        assert_eq!(*col.get("a").unwrap(), "a-draft");
        assert_eq!(*col.get_confirmed("a").unwrap(), "a");
        assert_eq!(*col.snapshot()[0], "a-draft");

        assert!(col.revert("a"));
        assert_eq!(*col.get("a").unwrap(), "a");
        assert!(!col.revert("a"), "second revert has nothing to drop");
    }

    #[test]
    fn stage_refuses_unknown_keys() {
        let col: Collection<String, String> = Collection::new();
        assert!(!col.stage("ghost", "x".into()));
        assert_eq!(col.version(), 0, "a refused stage must not notify");
    }

    #[test]
    fn confirm_clears_the_draft() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a"]);
        col.stage("a", "a-draft".into());

        assert!(!col.confirm("a".into(), "a-confirmed".into()));
        assert_eq!(*col.get("a").unwrap(), "a-confirmed");
        assert_eq!(*col.get_confirmed("a").unwrap(), "a-confirmed");
    }

    #[test]
    fn confirm_appends_new_keys_after_the_listing() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a", "b"]);

        assert!(col.confirm("c".into(), "c".into()));
        let snap = col.snapshot();
        let order: Vec<&str> = snap.iter().map(|v| v.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn promote_moves_the_draft_into_confirmed() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a"]);
        col.stage("a", "a-draft".into());

        assert!(col.promote("a"));
        assert_eq!(*col.get_confirmed("a").unwrap(), "a-draft");
        assert!(!col.promote("a"), "no draft left to promote");
    }

    #[test]
    fn replace_all_discards_drafts() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a"]);
        col.stage("a", "a-draft".into());

        replace(&col, &["a"]);
        assert_eq!(*col.get("a").unwrap(), "a");
        assert!(!col.revert("a"));
    }

    #[test]
    fn remove_drops_the_entry() {
        let col: Collection<String, String> = Collection::new();
        replace(&col, &["a", "b"]);

        let removed = col.remove("a");
        assert_eq!(*removed.unwrap(), "a");
        assert!(col.get("a").is_none());
        assert_eq!(col.len(), 1);
        assert!(!col.is_empty());
    }

    #[test]
    fn every_mutation_bumps_the_version() {
        let col: Collection<String, String> = Collection::new();
        assert_eq!(col.version(), 0);

        replace(&col, &["a"]);
        col.stage("a", "d".into());
        col.revert("a");
        col.confirm("a".into(), "c".into());
        col.remove("a");

        assert_eq!(col.version(), 5);
    }

    #[tokio::test]
    async fn subscribers_see_each_rebuild() {
        let col: Collection<String, String> = Collection::new();
        let mut rx = col.subscribe();

        replace(&col, &["a"]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        col.stage("a", "a-draft".into());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update()[0], "a-draft");
    }
}
