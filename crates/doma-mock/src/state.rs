// ── Mock state & fixtures ──
//
// Everything a handler can read or mutate lives behind one `Fixtures`
// value. Mutable tables sit in `tokio::sync::Mutex<IndexMap<..>>` so
// listings keep a stable order across mutations; purely static tables
// are plain `Vec`s.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{TimeDelta, Utc};
use doma_api::model::{
    AcMode, ActionMap, AlarmRecord, AlarmStatus, Device, DeviceGroup, DeviceInfo, DevicePatch,
    DeviceSummary, DeviceType, Home, HomeRole, HomeRoom, JoinRequest, JoinStatus, Member,
    MemberRole, Room, Scene, SecuritySensor, SensorKind, SensorStatus,
};
use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::telemetry::TelemetrySource;

/// Shared handler state: fixture tables plus the telemetry source.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) fixtures: Arc<Fixtures>,
    pub(crate) telemetry: Arc<dyn TelemetrySource>,
}

pub(crate) struct Fixtures {
    pub(crate) devices: Mutex<IndexMap<String, Device>>,
    pub(crate) groups: Mutex<IndexMap<String, DeviceGroup>>,
    scenes: Mutex<IndexMap<String, Scene>>,
    /// Reset generation per executed scene. A re-execution bumps the
    /// generation, which voids the revert timer of the previous run.
    scene_resets: Mutex<HashMap<String, u64>>,
    pub(crate) rooms: Vec<Room>,
    pub(crate) homes: Mutex<IndexMap<i64, Home>>,
    pub(crate) roles: Mutex<IndexMap<i64, HomeRole>>,
    pub(crate) home_rooms: Mutex<IndexMap<i64, HomeRoom>>,
    pub(crate) members: Mutex<HashMap<i64, Vec<Member>>>,
    /// Device digests shown in the home-detail aggregate (home 1 only).
    pub(crate) home_devices: Vec<DeviceSummary>,
    pub(crate) sensors: Vec<SecuritySensor>,
    pub(crate) alarms: Mutex<IndexMap<i64, AlarmRecord>>,
    pub(crate) join_requests: Mutex<IndexMap<i64, JoinRequest>>,
    /// Numeric-id device registry backing telemetry and guest access.
    pub(crate) registry: Vec<DeviceInfo>,
    next_id: AtomicI64,
}

impl Fixtures {
    pub(crate) fn seeded() -> Self {
        let now = Utc::now();
        Self {
            devices: Mutex::new(seed_devices(now)),
            groups: Mutex::new(seed_groups()),
            scenes: Mutex::new(seed_scenes()),
            scene_resets: Mutex::new(HashMap::new()),
            rooms: seed_rooms(),
            homes: Mutex::new(seed_homes(now)),
            roles: Mutex::new(seed_roles()),
            home_rooms: Mutex::new(seed_home_rooms()),
            members: Mutex::new(seed_members()),
            home_devices: seed_home_devices(),
            sensors: seed_sensors(now),
            alarms: Mutex::new(seed_alarms(now)),
            join_requests: Mutex::new(seed_join_requests(now)),
            registry: seed_registry(now),
            next_id: AtomicI64::new(100),
        }
    }

    /// Fresh numeric id, clear of every seeded one.
    pub(crate) fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Folds an action map into the device table, refreshing `lastUpdate`,
    /// and returns the updated devices in action order. Unknown ids are
    /// skipped rather than failing the whole execution.
    pub(crate) async fn apply_actions(&self, actions: &ActionMap) -> Vec<Device> {
        let mut devices = self.devices.lock().await;
        let now = Utc::now();
        actions
            .iter()
            .filter_map(|(id, patch)| {
                let device = devices.get_mut(id)?;
                device.apply(patch);
                device.last_update = now;
                Some(device.clone())
            })
            .collect()
    }

    pub(crate) async fn scenes_snapshot(&self) -> Vec<Scene> {
        self.scenes.lock().await.values().cloned().collect()
    }

    pub(crate) async fn insert_scene(&self, scene: Scene) {
        self.scenes.lock().await.insert(scene.id.clone(), scene);
    }

    pub(crate) async fn patch_scene(
        &self,
        scene_id: &str,
        name: Option<String>,
        description: Option<String>,
        actions: Option<ActionMap>,
    ) -> Option<Scene> {
        let mut scenes = self.scenes.lock().await;
        let scene = scenes.get_mut(scene_id)?;
        if let Some(name) = name {
            scene.name = name;
        }
        if let Some(description) = description {
            scene.description = Some(description);
        }
        if let Some(actions) = actions {
            scene.actions = actions;
        }
        Some(scene.clone())
    }

    pub(crate) async fn remove_scene(&self, scene_id: &str) -> bool {
        self.scenes.lock().await.shift_remove(scene_id).is_some()
    }

    /// Marks a scene active and arms its revert timer, returning the
    /// action map to fold and the generation the timer must present.
    ///
    /// Lock order is scenes before resets here and in
    /// [`finish_scene_reset`](Self::finish_scene_reset), so an execution
    /// racing a firing timer serializes instead of deadlocking.
    pub(crate) async fn activate_scene(&self, scene_id: &str) -> Option<(ActionMap, u64)> {
        let mut scenes = self.scenes.lock().await;
        let scene = scenes.get_mut(scene_id)?;
        scene.is_active = true;
        let actions = scene.actions.clone();

        let mut resets = self.scene_resets.lock().await;
        let generation = resets.entry(scene_id.to_owned()).or_insert(0);
        *generation += 1;
        Some((actions, *generation))
    }

    /// Clears `isActive` unless a later execution re-armed the scene.
    pub(crate) async fn finish_scene_reset(&self, scene_id: &str, generation: u64) {
        let mut scenes = self.scenes.lock().await;
        let mut resets = self.scene_resets.lock().await;
        if resets.get(scene_id) != Some(&generation) {
            return;
        }
        resets.remove(scene_id);
        if let Some(scene) = scenes.get_mut(scene_id) {
            scene.is_active = false;
        }
    }
}

// ── Seed data ──

fn seed_devices(now: chrono::DateTime<Utc>) -> IndexMap<String, Device> {
    let base = |id: &str, name: &str, device_type: DeviceType, room: &str, status: bool| Device {
        id: id.to_owned(),
        name: name.to_owned(),
        device_type,
        room: room.to_owned(),
        status,
        brightness: None,
        temperature: None,
        mode: None,
        fan_speed: None,
        position: None,
        last_update: now,
    };

    [
        Device {
            brightness: Some(80),
            ..base("light-1", "Living Room Light", DeviceType::Light, "Living Room", true)
        },
        Device {
            brightness: Some(50),
            ..base("light-2", "Bedroom Lamp", DeviceType::Light, "Bedroom", false)
        },
        Device {
            temperature: Some(26),
            mode: Some(AcMode::Cool),
            fan_speed: Some(3),
            ..base("ac-1", "Living Room AC", DeviceType::Ac, "Living Room", true)
        },
        Device {
            temperature: Some(24),
            mode: Some(AcMode::Auto),
            fan_speed: Some(2),
            ..base("ac-2", "Bedroom AC", DeviceType::Ac, "Bedroom", false)
        },
        Device {
            position: Some(50),
            ..base("curtain-1", "Living Room Curtain", DeviceType::Curtain, "Living Room", true)
        },
        base("sensor-1", "Temperature Sensor", DeviceType::Sensor, "Living Room", true),
        base("switch-1", "Master Switch", DeviceType::Switch, "Hallway", true),
    ]
    .into_iter()
    .map(|device| (device.id.clone(), device))
    .collect()
}

fn on_with(tune: impl FnOnce(&mut DevicePatch)) -> DevicePatch {
    let mut patch = DevicePatch::power(true);
    tune(&mut patch);
    patch
}

fn seed_groups() -> IndexMap<String, DeviceGroup> {
    [
        DeviceGroup {
            id: "group-1".to_owned(),
            name: "Living Room Lighting".to_owned(),
            device_ids: vec!["light-1".to_owned()],
            actions: ActionMap::from_iter([(
                "light-1".to_owned(),
                on_with(|p| p.brightness = Some(100)),
            )]),
        },
        DeviceGroup {
            id: "group-2".to_owned(),
            name: "Night Mode".to_owned(),
            device_ids: vec!["light-2".to_owned(), "ac-2".to_owned()],
            actions: ActionMap::from_iter([
                ("light-2".to_owned(), on_with(|p| p.brightness = Some(30))),
                (
                    "ac-2".to_owned(),
                    on_with(|p| {
                        p.temperature = Some(26);
                        p.mode = Some(AcMode::Cool);
                        p.fan_speed = Some(1);
                    }),
                ),
            ]),
        },
    ]
    .into_iter()
    .map(|group| (group.id.clone(), group))
    .collect()
}

fn seed_scenes() -> IndexMap<String, Scene> {
    let all_off: ActionMap = ["light-1", "light-2", "ac-1", "ac-2", "curtain-1", "switch-1"]
        .into_iter()
        .map(|id| (id.to_owned(), DevicePatch::power(false)))
        .collect();

    [
        Scene {
            id: "scene-home".to_owned(),
            name: "Coming Home".to_owned(),
            description: Some("Turns on the lights and the AC".to_owned()),
            actions: ActionMap::from_iter([
                ("light-1".to_owned(), on_with(|p| p.brightness = Some(80))),
                ("light-2".to_owned(), on_with(|p| p.brightness = Some(60))),
                (
                    "ac-1".to_owned(),
                    on_with(|p| {
                        p.temperature = Some(24);
                        p.mode = Some(AcMode::Cool);
                        p.fan_speed = Some(2);
                    }),
                ),
                ("curtain-1".to_owned(), on_with(|p| p.position = Some(100))),
            ]),
            is_active: false,
        },
        Scene {
            id: "scene-leave".to_owned(),
            name: "Leaving Home".to_owned(),
            description: Some("Turns every device off".to_owned()),
            actions: all_off,
            is_active: false,
        },
        Scene {
            id: "scene-movie".to_owned(),
            name: "Movie Time".to_owned(),
            description: Some("Dims the lights and closes the curtain".to_owned()),
            actions: ActionMap::from_iter([
                ("light-1".to_owned(), on_with(|p| p.brightness = Some(20))),
                ("curtain-1".to_owned(), on_with(|p| p.position = Some(0))),
            ]),
            is_active: false,
        },
    ]
    .into_iter()
    .map(|scene| (scene.id.clone(), scene))
    .collect()
}

fn seed_rooms() -> Vec<Room> {
    [
        ("living-room", "Living Room", 3),
        ("bedroom", "Bedroom", 2),
        ("hallway", "Hallway", 1),
    ]
    .into_iter()
    .map(|(id, name, device_count)| Room {
        id: id.to_owned(),
        name: name.to_owned(),
        device_count,
    })
    .collect()
}

fn seed_homes(now: chrono::DateTime<Utc>) -> IndexMap<i64, Home> {
    [
        Home {
            id: 1,
            name: "My Home".to_owned(),
            address: "88 Chaoyang North Road, Beijing".to_owned(),
            create_time: now - TimeDelta::days(200),
        },
        Home {
            id: 2,
            name: "Vacation Villa".to_owned(),
            address: "15 Binhai Avenue, Sanya".to_owned(),
            create_time: now - TimeDelta::days(45),
        },
    ]
    .into_iter()
    .map(|home| (home.id, home))
    .collect()
}

fn seed_roles() -> IndexMap<i64, HomeRole> {
    [
        (1, "My Home", MemberRole::Owner),
        (2, "Vacation Villa", MemberRole::Member),
    ]
    .into_iter()
    .map(|(home_id, home_name, role)| {
        (
            home_id,
            HomeRole {
                home_id,
                home_name: home_name.to_owned(),
                role,
                role_name: role.label().to_owned(),
            },
        )
    })
    .collect()
}

fn seed_home_rooms() -> IndexMap<i64, HomeRoom> {
    [(1, "Living Room"), (2, "Master Bedroom"), (3, "Kitchen")]
        .into_iter()
        .map(|(id, name)| {
            (
                id,
                HomeRoom {
                    id,
                    name: name.to_owned(),
                    home_id: 1,
                    is_deleted: false,
                },
            )
        })
        .collect()
}

fn seed_members() -> HashMap<i64, Vec<Member>> {
    let members = [
        (1, "Home Owner", MemberRole::Owner),
        (2, "Family Member", MemberRole::Member),
    ]
    .into_iter()
    .map(|(user_id, username, role)| Member {
        user_id,
        username: username.to_owned(),
        role,
        role_name: role.label().to_owned(),
    })
    .collect();
    HashMap::from_iter([(1, members)])
}

fn seed_home_devices() -> Vec<DeviceSummary> {
    [
        (1, "Living Room Light", "Smart Bulb", 1, 1),
        (2, "Air Conditioner", "Smart AC", 1, 0),
        (3, "Door Lock", "Smart Lock", 1, 1),
    ]
    .into_iter()
    .map(|(id, name, type_name, online_status, active_status)| DeviceSummary {
        id,
        name: name.to_owned(),
        type_name: type_name.to_owned(),
        online_status,
        active_status,
    })
    .collect()
}

fn seed_sensors(now: chrono::DateTime<Utc>) -> Vec<SecuritySensor> {
    [
        (1, "Kitchen Flame Sensor", SensorKind::Flame, 0.2, 1.0),
        (2, "Kitchen Gas Sensor", SensorKind::Gas, 50.0, 1000.0),
        (3, "Living Room Flame Sensor", SensorKind::Flame, 0.1, 1.0),
    ]
    .into_iter()
    .map(|(id, name, kind, value, threshold)| SecuritySensor {
        id,
        name: name.to_owned(),
        kind,
        status: SensorStatus::Normal,
        value,
        threshold,
        last_update: now,
    })
    .collect()
}

fn seed_alarms(now: chrono::DateTime<Utc>) -> IndexMap<i64, AlarmRecord> {
    [
        AlarmRecord {
            id: 1,
            device_id: 1,
            device_name: "Kitchen Flame Sensor".to_owned(),
            alarm_type: SensorKind::Flame,
            alarm_time: now - TimeDelta::hours(2),
            status: AlarmStatus::Confirmed,
            description: "Flame reading above threshold".to_owned(),
        },
        AlarmRecord {
            id: 2,
            device_id: 2,
            device_name: "Kitchen Gas Sensor".to_owned(),
            alarm_type: SensorKind::Gas,
            alarm_time: now - TimeDelta::hours(24),
            status: AlarmStatus::Ignored,
            description: "Gas concentration above threshold".to_owned(),
        },
        AlarmRecord {
            id: 3,
            device_id: 1,
            device_name: "Kitchen Flame Sensor".to_owned(),
            alarm_type: SensorKind::Flame,
            alarm_time: now - TimeDelta::days(3),
            status: AlarmStatus::Pending,
            description: "Flame reading above threshold".to_owned(),
        },
    ]
    .into_iter()
    .map(|alarm| (alarm.id, alarm))
    .collect()
}

fn seed_join_requests(now: chrono::DateTime<Utc>) -> IndexMap<i64, JoinRequest> {
    IndexMap::from_iter([(
        1,
        JoinRequest {
            id: 1,
            user_id: 3,
            username: "Guest User".to_owned(),
            status: JoinStatus::Pending,
            status_name: JoinStatus::Pending.label().to_owned(),
            record_time: now - TimeDelta::days(1),
        },
    )])
}

fn seed_registry(now: chrono::DateTime<Utc>) -> Vec<DeviceInfo> {
    [
        (1, "Living Room Light", "192.168.1.100", 1, 1, 1),
        (2, "Kitchen Socket", "192.168.1.101", 3, 2, 0),
        (3, "Kitchen Flame Sensor", "192.168.1.102", 3, 3, 1),
        (4, "Kitchen Gas Sensor", "192.168.1.103", 3, 4, 1),
        (5, "Living Room Window", "192.168.1.104", 1, 5, 1),
        (6, "Entrance Camera", "192.168.1.105", 1, 6, 1),
    ]
    .into_iter()
    .map(
        |(id, name, ip_address, room_id, type_id, active_status)| DeviceInfo {
            id,
            name: name.to_owned(),
            ip_address: ip_address.to_owned(),
            home_id: 1,
            room_id,
            type_id,
            online_status: 1,
            active_status,
            last_active_time: now,
        },
    )
    .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn seed_tables_hold_the_expected_rows() {
        let fixtures = Fixtures::seeded();
        assert_eq!(fixtures.devices.lock().await.len(), 7);
        assert_eq!(fixtures.groups.lock().await.len(), 2);
        assert_eq!(fixtures.scenes_snapshot().await.len(), 3);
        assert_eq!(fixtures.rooms.len(), 3);
        assert_eq!(fixtures.homes.lock().await.len(), 2);
        assert_eq!(fixtures.sensors.len(), 3);
        assert_eq!(fixtures.alarms.lock().await.len(), 3);
        assert_eq!(fixtures.registry.len(), 6);
    }

    #[tokio::test]
    async fn apply_actions_folds_and_skips_unknown_ids() {
        let fixtures = Fixtures::seeded();
        let actions = ActionMap::from_iter([
            ("light-1".to_owned(), DevicePatch::power(false)),
            ("no-such".to_owned(), DevicePatch::power(true)),
        ]);

        let updated = fixtures.apply_actions(&actions).await;

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, "light-1");
        assert!(!updated[0].status);
        assert!(!fixtures.devices.lock().await["light-1"].status);
    }

    #[tokio::test]
    async fn stale_generation_does_not_clear_a_rearmed_scene() {
        let fixtures = Fixtures::seeded();
        let (_, first) = fixtures.activate_scene("scene-home").await.unwrap();
        let (_, second) = fixtures.activate_scene("scene-home").await.unwrap();
        assert!(second > first);

        fixtures.finish_scene_reset("scene-home", first).await;
        let scenes = fixtures.scenes_snapshot().await;
        let scene = scenes.iter().find(|s| s.id == "scene-home").unwrap();
        assert!(scene.is_active, "stale timer must not deactivate");

        fixtures.finish_scene_reset("scene-home", second).await;
        let scenes = fixtures.scenes_snapshot().await;
        let scene = scenes.iter().find(|s| s.id == "scene-home").unwrap();
        assert!(!scene.is_active);
    }
}
