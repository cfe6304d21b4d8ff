// ── Scene store ──
//
// Scene CRUD plus one-click execution. Executing a scene flips its
// transient `isActive` cue on immediately and arms a cancelable reset
// timer; the devices echoed by the backend are folded into the device
// store, which this store holds a handle to.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use doma_api::ConsoleClient;
use doma_api::model::Scene;
use doma_api::types::{SceneCreate, ScenePatch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::collection::Collection;
use super::device::DeviceStore;
use super::freshness::{Freshness, FreshnessCell};
use super::journal::{Journal, MutationTicket};
use super::subscription::Subscription;
use crate::error::CoreError;

/// How long the transient "running" cue stays on after an execute.
///
/// The reset fires independently of server confirmation; re-execution
/// restarts the countdown.
pub const SCENE_ACTIVE_RESET: Duration = Duration::from_secs(3);

/// Reactive store for automation scenes.
#[derive(Clone)]
pub struct SceneStore {
    inner: Arc<SceneStoreInner>,
}

struct SceneStoreInner {
    client: ConsoleClient,
    /// Devices echoed by scene execution land here.
    devices: DeviceStore,
    scenes: Collection<String, Scene>,
    freshness: FreshnessCell,
    journal: Journal,
    /// Armed `isActive` reset timers, one per scene at most.
    resets: DashMap<String, ResetGuard>,
    reset_generation: AtomicU64,
    cancel: CancellationToken,
}

struct ResetGuard {
    generation: u64,
    cancel: CancellationToken,
}

impl Drop for SceneStoreInner {
    fn drop(&mut self) {
        // Aborts every armed reset timer.
        self.cancel.cancel();
    }
}

impl SceneStore {
    pub fn new(client: ConsoleClient, devices: DeviceStore) -> Self {
        Self {
            inner: Arc::new(SceneStoreInner {
                client,
                devices,
                scenes: Collection::new(),
                freshness: FreshnessCell::new(),
                journal: Journal::new(),
                resets: DashMap::new(),
                reset_generation: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ━━ Fetch & reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn fetch_scenes(&self) -> Result<(), CoreError> {
        match self.inner.client.list_scenes().await {
            Ok(scenes) => {
                self.inner.scenes.replace_all(scenes, |s| s.id.clone());
                self.inner.freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.freshness.mark_stale(&err);
                warn!(error = %err, "scene refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    pub fn scenes(&self) -> Arc<Vec<Arc<Scene>>> {
        self.inner.scenes.snapshot()
    }

    pub fn scene(&self, id: &str) -> Option<Arc<Scene>> {
        self.inner.scenes.get(id)
    }

    pub fn subscribe_scenes(&self) -> Subscription<Scene> {
        Subscription::new(self.inner.scenes.subscribe())
    }

    pub fn freshness(&self) -> Freshness {
        self.inner.freshness.get()
    }

    // ━━ CRUD ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a scene, then refetch the listing so the server-assigned
    /// id lands in the snapshot before the ticket settles.
    pub fn create_scene(&self, scene: SceneCreate) -> Result<MutationTicket, CoreError> {
        if scene.name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "scene name must not be empty".into(),
            });
        }

        let ticket = self.inner.journal.begin(format!("scene {}", scene.name));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.create_scene(&scene).await {
                Ok(_) => {
                    let _ = store.fetch_scenes().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(scene = %scene.name, error = %err, "scene creation failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Patch a scene optimistically; the echoed scene is confirmed.
    pub fn update_scene(&self, id: &str, patch: ScenePatch) -> Result<MutationTicket, CoreError> {
        let Some(current) = self.inner.scenes.get(id) else {
            return Err(CoreError::NotFound {
                entity: "scene",
                id: id.to_owned(),
            });
        };

        self.inner.scenes.stage(id, merged_scene(&current, &patch));
        let ticket = self.inner.journal.begin(format!("scene {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.update_scene(&id, &patch).await {
                Ok(updated) => {
                    store.inner.scenes.confirm(updated.id.clone(), updated);
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.scenes.revert(&id);
                    warn!(scene = %id, error = %err, "scene update failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Delete a scene, disarm its reset timer, then refetch the listing.
    pub fn delete_scene(&self, id: &str) -> Result<MutationTicket, CoreError> {
        if self.inner.scenes.get(id).is_none() {
            return Err(CoreError::NotFound {
                entity: "scene",
                id: id.to_owned(),
            });
        }

        let ticket = self.inner.journal.begin(format!("scene {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.delete_scene(&id).await {
                Ok(()) => {
                    if let Some((_, guard)) = store.inner.resets.remove(&id) {
                        guard.cancel.cancel();
                    }
                    let _ = store.fetch_scenes().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(scene = %id, error = %err, "scene deletion failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    // ━━ Execution ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Run a scene.
    ///
    /// The `isActive` cue flips on immediately and resets after
    /// [`SCENE_ACTIVE_RESET`] whether or not the request succeeds.
    /// Echoed devices are folded into the device store as confirmed; a
    /// failure rolls the cue back and disarms this execution's timer.
    pub fn execute_scene(&self, id: &str) -> Result<MutationTicket, CoreError> {
        let Some(current) = self.inner.scenes.get(id) else {
            return Err(CoreError::NotFound {
                entity: "scene",
                id: id.to_owned(),
            });
        };

        let mut active = (*current).clone();
        active.is_active = true;
        self.inner.scenes.stage(id, active);
        let generation = self.arm_reset(id);

        let ticket = self.inner.journal.begin(format!("execute scene {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.execute_scene(&id).await {
                Ok(devices) => {
                    for device in devices {
                        store.inner.devices.confirm_device(device);
                    }
                    // The active cue is promoted only while a reset is
                    // still armed; a reset that already fired wins over
                    // a late confirmation.
                    if store.inner.resets.contains_key(&id) {
                        store.inner.scenes.promote(&id);
                    }
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.disarm_reset(&id, generation);
                    store.inner.scenes.revert(&id);
                    warn!(scene = %id, error = %err, "scene execution failed; active cue rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// `true` while an `isActive` reset is armed for `id`.
    pub fn reset_armed(&self, id: &str) -> bool {
        self.inner.resets.contains_key(id)
    }

    // ── Reset timer plumbing ─────────────────────────────────────────

    /// Arm (or rearm) the reset timer for `id`, canceling any previous
    /// one. Returns the generation identifying this arming.
    fn arm_reset(&self, id: &str) -> u64 {
        let generation = self.inner.reset_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.cancel.child_token();

        if let Some(previous) = self.inner.resets.insert(
            id.to_owned(),
            ResetGuard {
                generation,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(SCENE_ACTIVE_RESET) => {
                    store.finish_reset(&id, generation);
                }
            }
        });

        generation
    }

    /// Clear the active cue, but only if this timer is still the armed
    /// one -- a rearmed timer owns the cue now.
    fn finish_reset(&self, id: &str, generation: u64) {
        let fired = self
            .inner
            .resets
            .remove_if(id, |_, guard| guard.generation == generation)
            .is_some();
        if !fired {
            return;
        }

        if let Some(current) = self.inner.scenes.get_confirmed(id) {
            let mut reset = (*current).clone();
            reset.is_active = false;
            self.inner.scenes.confirm(id.to_owned(), reset);
        }
    }

    /// Cancel the timer armed under `generation`, if it still is.
    fn disarm_reset(&self, id: &str, generation: u64) {
        if let Some((_, guard)) = self
            .inner
            .resets
            .remove_if(id, |_, guard| guard.generation == generation)
        {
            guard.cancel.cancel();
        }
    }
}

/// Fold a partial scene update over the current value.
fn merged_scene(current: &Scene, patch: &ScenePatch) -> Scene {
    Scene {
        id: current.id.clone(),
        name: patch.name.clone().unwrap_or_else(|| current.name.clone()),
        description: patch.description.clone().or_else(|| current.description.clone()),
        actions: patch
            .actions
            .clone()
            .unwrap_or_else(|| current.actions.clone()),
        is_active: current.is_active,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use doma_api::SessionHandle;
    use doma_api::model::{ActionMap, DevicePatch};

    use super::*;

    /// Store whose client points at a closed port; fine for tests that
    /// never leave the reset plumbing.
    fn offline_store() -> SceneStore {
        let client = ConsoleClient::new("http://127.0.0.1:9", SessionHandle::new()).unwrap();
        let devices = DeviceStore::new(client.clone());
        SceneStore::new(client, devices)
    }

    fn seed_scene(store: &SceneStore, id: &str) {
        store.inner.scenes.confirm(
            id.to_owned(),
            Scene {
                id: id.to_owned(),
                name: "Night".into(),
                description: None,
                actions: ActionMap::new(),
                is_active: false,
            },
        );
    }

    fn stage_active(store: &SceneStore, id: &str) {
        let current = store.inner.scenes.get(id).unwrap();
        let mut active = (*current).clone();
        active.is_active = true;
        store.inner.scenes.stage(id, active);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_reset_clears_the_cue_once_the_delay_elapses() {
        let store = offline_store();
        seed_scene(&store, "scene-night");
        stage_active(&store, "scene-night");

        store.arm_reset("scene-night");
        assert!(store.reset_armed("scene-night"));
        assert!(store.scene("scene-night").unwrap().is_active);

        tokio::time::sleep(SCENE_ACTIVE_RESET + Duration::from_millis(50)).await;

        assert!(!store.reset_armed("scene-night"));
        assert!(!store.scene("scene-night").unwrap().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_hands_the_cue_to_the_newest_timer() {
        let store = offline_store();
        seed_scene(&store, "scene-night");
        stage_active(&store, "scene-night");
        store.arm_reset("scene-night");

        tokio::time::sleep(Duration::from_secs(1)).await;
        stage_active(&store, "scene-night");
        store.arm_reset("scene-night");

        // Past the first timer's deadline, short of the second's.
        tokio::time::sleep(SCENE_ACTIVE_RESET - Duration::from_millis(500)).await;
        assert!(store.reset_armed("scene-night"));
        assert!(store.scene("scene-night").unwrap().is_active);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!store.reset_armed("scene-night"));
        assert!(!store.scene("scene-night").unwrap().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn a_disarmed_timer_never_fires() {
        let store = offline_store();
        seed_scene(&store, "scene-night");
        stage_active(&store, "scene-night");

        let generation = store.arm_reset("scene-night");
        store.disarm_reset("scene-night", generation);
        assert!(!store.reset_armed("scene-night"));

        tokio::time::sleep(SCENE_ACTIVE_RESET * 2).await;
        assert!(
            store.scene("scene-night").unwrap().is_active,
            "the staged cue outlives a disarmed timer"
        );
    }

    #[test]
    fn merged_scene_keeps_the_active_cue_and_unpatched_fields() {
        let mut actions = ActionMap::new();
        actions.insert("light-1".into(), DevicePatch::power(false));
        let current = Scene {
            id: "scene-leave".into(),
            name: "Leaving Home".into(),
            description: Some("Everything off".into()),
            actions,
            is_active: true,
        };

        let merged = merged_scene(
            &current,
            &ScenePatch {
                name: Some("Leave".into()),
                ..ScenePatch::default()
            },
        );

        assert_eq!(merged.name, "Leave");
        assert_eq!(merged.description.as_deref(), Some("Everything off"));
        assert!(merged.is_active, "a patch never touches the cue");
        assert_eq!(merged.actions.len(), 1);
    }
}
