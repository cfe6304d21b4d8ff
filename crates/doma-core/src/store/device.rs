// ── Device, group, and room store ──
//
// Owns the console device family: the device snapshot with optimistic
// drafts, device groups with their action maps, and the room listing.
// Mutations run in the background and settle a journal ticket; reads
// never block on them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use doma_api::ConsoleClient;
use doma_api::model::{Device, DeviceGroup, DevicePatch, DeviceType, Room};
use doma_api::types::{BatchUpdate, GroupCreate, GroupPatch};
use tracing::warn;

use super::collection::Collection;
use super::freshness::{Freshness, FreshnessCell};
use super::journal::{Journal, MutationTicket};
use super::subscription::Subscription;
use crate::error::CoreError;

/// Reactive store for devices, device groups, and rooms.
///
/// Cloning is cheap and shares the underlying state; every clone sees
/// the same snapshots and journal.
#[derive(Clone)]
pub struct DeviceStore {
    inner: Arc<DeviceStoreInner>,
}

struct DeviceStoreInner {
    client: ConsoleClient,
    devices: Collection<String, Device>,
    groups: Collection<String, DeviceGroup>,
    rooms: Collection<String, Room>,
    devices_freshness: FreshnessCell,
    groups_freshness: FreshnessCell,
    rooms_freshness: FreshnessCell,
    journal: Journal,
}

impl DeviceStore {
    pub fn new(client: ConsoleClient) -> Self {
        Self {
            inner: Arc::new(DeviceStoreInner {
                client,
                devices: Collection::new(),
                groups: Collection::new(),
                rooms: Collection::new(),
                devices_freshness: FreshnessCell::new(),
                groups_freshness: FreshnessCell::new(),
                rooms_freshness: FreshnessCell::new(),
                journal: Journal::new(),
            }),
        }
    }

    // ━━ Fetches ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Refresh the device snapshot from the backend.
    ///
    /// On failure the previous snapshot stays readable and the
    /// freshness cell flips to `Stale` with the error.
    pub async fn fetch_devices(&self) -> Result<(), CoreError> {
        match self.inner.client.list_devices().await {
            Ok(devices) => {
                self.inner.devices.replace_all(devices, |d| d.id.clone());
                self.inner.devices_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.devices_freshness.mark_stale(&err);
                warn!(error = %err, "device refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    pub async fn fetch_groups(&self) -> Result<(), CoreError> {
        match self.inner.client.list_groups().await {
            Ok(groups) => {
                self.inner.groups.replace_all(groups, |g| g.id.clone());
                self.inner.groups_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.groups_freshness.mark_stale(&err);
                warn!(error = %err, "group refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    pub async fn fetch_rooms(&self) -> Result<(), CoreError> {
        match self.inner.client.list_rooms().await {
            Ok(rooms) => {
                self.inner.rooms.replace_all(rooms, |r| r.id.clone());
                self.inner.rooms_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.rooms_freshness.mark_stale(&err);
                warn!(error = %err, "room refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    // ━━ Reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Devices in listing order, drafts shadowing confirmed values.
    pub fn devices(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.devices.snapshot()
    }

    pub fn device(&self, id: &str) -> Option<Arc<Device>> {
        self.inner.devices.get(id)
    }

    /// Last server-confirmed value for `id`, ignoring any draft.
    pub fn device_confirmed(&self, id: &str) -> Option<Arc<Device>> {
        self.inner.devices.get_confirmed(id)
    }

    pub fn groups(&self) -> Arc<Vec<Arc<DeviceGroup>>> {
        self.inner.groups.snapshot()
    }

    pub fn group(&self, id: &str) -> Option<Arc<DeviceGroup>> {
        self.inner.groups.get(id)
    }

    pub fn rooms(&self) -> Arc<Vec<Arc<Room>>> {
        self.inner.rooms.snapshot()
    }

    pub fn subscribe_devices(&self) -> Subscription<Device> {
        Subscription::new(self.inner.devices.subscribe())
    }

    pub fn subscribe_groups(&self) -> Subscription<DeviceGroup> {
        Subscription::new(self.inner.groups.subscribe())
    }

    pub fn devices_freshness(&self) -> Freshness {
        self.inner.devices_freshness.get()
    }

    pub fn groups_freshness(&self) -> Freshness {
        self.inner.groups_freshness.get()
    }

    pub fn rooms_freshness(&self) -> Freshness {
        self.inner.rooms_freshness.get()
    }

    /// Mutations still awaiting a backend response.
    pub fn pending_mutations(&self) -> usize {
        self.inner.journal.pending_count()
    }

    // ━━ Derived views ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //
    // Computed from the current snapshot on every call, never cached.

    pub fn devices_by_room(&self) -> HashMap<String, Vec<Arc<Device>>> {
        let mut grouped: HashMap<String, Vec<Arc<Device>>> = HashMap::new();
        for device in self.devices().iter() {
            grouped
                .entry(device.room.clone())
                .or_default()
                .push(Arc::clone(device));
        }
        grouped
    }

    pub fn devices_by_type(&self) -> HashMap<DeviceType, Vec<Arc<Device>>> {
        let mut grouped: HashMap<DeviceType, Vec<Arc<Device>>> = HashMap::new();
        for device in self.devices().iter() {
            grouped
                .entry(device.device_type)
                .or_default()
                .push(Arc::clone(device));
        }
        grouped
    }

    /// `(on, off)` partition of the current snapshot.
    pub fn power_split(&self) -> (Vec<Arc<Device>>, Vec<Arc<Device>>) {
        self.devices()
            .iter()
            .map(Arc::clone)
            .partition(|device| device.status)
    }

    // ━━ Device mutations ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Patch one device optimistically.
    ///
    /// The merged draft becomes visible immediately; the returned ticket
    /// settles `Applied` once the echoed device is confirmed, or
    /// `Reverted` after a rollback to the last confirmed value.
    pub fn update_device(&self, id: &str, patch: DevicePatch) -> Result<MutationTicket, CoreError> {
        validate_patch(&patch)?;
        let Some(current) = self.inner.devices.get(id) else {
            return Err(CoreError::NotFound {
                entity: "device",
                id: id.to_owned(),
            });
        };

        self.inner.devices.stage(id, current.merged(&patch));
        let ticket = self.inner.journal.begin(format!("device {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.update_device(&id, &patch).await {
                Ok(updated) => {
                    store.inner.devices.confirm(updated.id.clone(), updated);
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.devices.revert(&id);
                    warn!(device = %id, error = %err, "device update failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Post several partial updates in one call.
    ///
    /// Known ids are staged immediately. The backend skips unknown ids;
    /// staged entries missing from the echo are rolled back when it
    /// arrives.
    pub fn batch_update(&self, updates: Vec<BatchUpdate>) -> Result<MutationTicket, CoreError> {
        if updates.is_empty() {
            return Err(CoreError::Validation {
                message: "batch update without entries".into(),
            });
        }
        for entry in &updates {
            validate_patch(&entry.updates)?;
        }

        let mut staged: Vec<String> = Vec::new();
        for entry in &updates {
            if let Some(current) = self.inner.devices.get(&entry.id) {
                self.inner
                    .devices
                    .stage(&entry.id, current.merged(&entry.updates));
                staged.push(entry.id.clone());
            }
        }

        let ticket = self
            .inner
            .journal
            .begin(format!("batch update ({} devices)", updates.len()));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.batch_update_devices(&updates).await {
                Ok(echoed) => {
                    let mut confirmed: HashSet<String> = HashSet::new();
                    for device in echoed {
                        let id = device.id.clone();
                        store.inner.devices.confirm(id.clone(), device);
                        confirmed.insert(id);
                    }
                    for id in &staged {
                        if !confirmed.contains(id) {
                            store.inner.devices.revert(id);
                        }
                    }
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    for id in &staged {
                        store.inner.devices.revert(id);
                    }
                    warn!(error = %err, "batch update failed; drafts rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Fold a server-confirmed device into the snapshot. Used by the
    /// scene store for echoed execution results.
    pub(crate) fn confirm_device(&self, device: Device) {
        self.inner.devices.confirm(device.id.clone(), device);
    }

    // ━━ Group mutations ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a group, then refetch the listing so the server-assigned
    /// id lands in the snapshot before the ticket settles.
    pub fn create_group(&self, group: GroupCreate) -> Result<MutationTicket, CoreError> {
        if group.name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "group name must not be empty".into(),
            });
        }

        let ticket = self.inner.journal.begin(format!("group {}", group.name));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.create_group(&group).await {
                Ok(_) => {
                    // A failed refetch leaves its mark in the freshness
                    // cell; the create itself still went through.
                    let _ = store.fetch_groups().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(group = %group.name, error = %err, "group creation failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Patch a group optimistically; the echoed group is confirmed.
    pub fn update_group(&self, id: &str, patch: GroupPatch) -> Result<MutationTicket, CoreError> {
        let Some(current) = self.inner.groups.get(id) else {
            return Err(CoreError::NotFound {
                entity: "group",
                id: id.to_owned(),
            });
        };

        self.inner.groups.stage(id, merged_group(&current, &patch));
        let ticket = self.inner.journal.begin(format!("group {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.update_group(&id, &patch).await {
                Ok(updated) => {
                    store.inner.groups.confirm(updated.id.clone(), updated);
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.groups.revert(&id);
                    warn!(group = %id, error = %err, "group update failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Delete a group, then refetch the listing.
    pub fn delete_group(&self, id: &str) -> Result<MutationTicket, CoreError> {
        if self.inner.groups.get(id).is_none() {
            return Err(CoreError::NotFound {
                entity: "group",
                id: id.to_owned(),
            });
        }

        let ticket = self.inner.journal.begin(format!("group {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.delete_group(&id).await {
                Ok(()) => {
                    let _ = store.fetch_groups().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(group = %id, error = %err, "group deletion failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Apply a group's action map. The response carries every device it
    /// touched; each one is folded in as confirmed.
    pub fn execute_group(&self, id: &str) -> Result<MutationTicket, CoreError> {
        if self.inner.groups.get(id).is_none() {
            return Err(CoreError::NotFound {
                entity: "group",
                id: id.to_owned(),
            });
        }

        let ticket = self.inner.journal.begin(format!("execute group {id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let id = id.to_owned();
        tokio::spawn(async move {
            match store.inner.client.execute_group(&id).await {
                Ok(devices) => {
                    for device in devices {
                        store.confirm_device(device);
                    }
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(group = %id, error = %err, "group execution failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }
}

/// Range checks applied before a patch leaves the store.
fn validate_patch(patch: &DevicePatch) -> Result<(), CoreError> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "device name must not be empty".into(),
            });
        }
    }
    if let Some(room) = &patch.room {
        if room.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "room must not be empty".into(),
            });
        }
    }
    if let Some(brightness) = patch.brightness {
        if brightness > 100 {
            return Err(CoreError::Validation {
                message: format!("brightness {brightness} out of range (0-100)"),
            });
        }
    }
    if let Some(temperature) = patch.temperature {
        if !(16..=30).contains(&temperature) {
            return Err(CoreError::Validation {
                message: format!("temperature {temperature} out of range (16-30)"),
            });
        }
    }
    if let Some(fan_speed) = patch.fan_speed {
        if !(1..=5).contains(&fan_speed) {
            return Err(CoreError::Validation {
                message: format!("fan speed {fan_speed} out of range (1-5)"),
            });
        }
    }
    if let Some(position) = patch.position {
        if position > 100 {
            return Err(CoreError::Validation {
                message: format!("position {position} out of range (0-100)"),
            });
        }
    }
    Ok(())
}

/// Fold a partial group update over the current value.
fn merged_group(current: &DeviceGroup, patch: &GroupPatch) -> DeviceGroup {
    DeviceGroup {
        id: current.id.clone(),
        name: patch.name.clone().unwrap_or_else(|| current.name.clone()),
        device_ids: patch
            .device_ids
            .clone()
            .unwrap_or_else(|| current.device_ids.clone()),
        actions: patch
            .actions
            .clone()
            .unwrap_or_else(|| current.actions.clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use doma_api::model::ActionMap;

    use super::*;

    #[test]
    fn patch_validation_covers_every_range() {
        assert!(validate_patch(&DevicePatch::power(true)).is_ok());
        assert!(
            validate_patch(&DevicePatch {
                brightness: Some(100),
                ..DevicePatch::default()
            })
            .is_ok()
        );

        let too_bright = validate_patch(&DevicePatch {
            brightness: Some(101),
            ..DevicePatch::default()
        });
        assert!(matches!(too_bright, Err(CoreError::Validation { .. })));

        let too_cold = validate_patch(&DevicePatch {
            temperature: Some(15),
            ..DevicePatch::default()
        });
        assert!(matches!(too_cold, Err(CoreError::Validation { .. })));

        let fan_stopped = validate_patch(&DevicePatch {
            fan_speed: Some(0),
            ..DevicePatch::default()
        });
        assert!(matches!(fan_stopped, Err(CoreError::Validation { .. })));

        let blank_name = validate_patch(&DevicePatch {
            name: Some("   ".into()),
            ..DevicePatch::default()
        });
        assert!(matches!(blank_name, Err(CoreError::Validation { .. })));
    }

    #[test]
    fn merged_group_keeps_unpatched_fields() {
        let current = DeviceGroup {
            id: "group-1".into(),
            name: "All Lights".into(),
            device_ids: vec!["light-1".into()],
            actions: ActionMap::new(),
        };

        let merged = merged_group(
            &current,
            &GroupPatch {
                name: Some("Evening Lights".into()),
                ..GroupPatch::default()
            },
        );

        assert_eq!(merged.name, "Evening Lights");
        assert_eq!(merged.id, "group-1");
        assert_eq!(merged.device_ids, vec!["light-1".to_owned()]);
    }
}
