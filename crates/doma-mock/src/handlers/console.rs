// ── Console family: devices, groups, scenes, rooms ──

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use chrono::Utc;
use doma_api::model::{Device, DeviceGroup, DevicePatch, Scene};
use doma_api::types::{
    BatchUpdate, GroupCreate, GroupPatch, SceneCreate, ScenePatch, WebsocketUrlResponse,
};
use uuid::Uuid;

use super::{accepted, accepted_empty, rejected};
use crate::state::AppState;

/// How long an executed scene stays `isActive` before reverting.
const SCENE_ACTIVE_RESET: Duration = Duration::from_secs(3);

// ── Devices ──

pub(crate) async fn list_devices(State(state): State<AppState>) -> Response {
    let devices: Vec<Device> = state
        .fixtures
        .devices
        .lock()
        .await
        .values()
        .cloned()
        .collect();
    accepted(devices)
}

pub(crate) async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Response {
    match state.fixtures.devices.lock().await.get(&device_id) {
        Some(device) => accepted(device.clone()),
        None => rejected("device not found"),
    }
}

pub(crate) async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(patch): Json<DevicePatch>,
) -> Response {
    let mut devices = state.fixtures.devices.lock().await;
    match devices.get_mut(&device_id) {
        Some(device) => {
            device.apply(&patch);
            device.last_update = Utc::now();
            accepted(device.clone())
        }
        None => rejected("device not found"),
    }
}

/// Unknown ids in the batch are skipped; the echo carries only the
/// devices that were actually updated.
pub(crate) async fn batch_update_devices(
    State(state): State<AppState>,
    Json(batch): Json<Vec<BatchUpdate>>,
) -> Response {
    let mut devices = state.fixtures.devices.lock().await;
    let now = Utc::now();
    let updated: Vec<Device> = batch
        .iter()
        .filter_map(|entry| {
            let device = devices.get_mut(&entry.id)?;
            device.apply(&entry.updates);
            device.last_update = now;
            Some(device.clone())
        })
        .collect();
    accepted(updated)
}

// ── Device groups ──

pub(crate) async fn list_groups(State(state): State<AppState>) -> Response {
    let groups: Vec<DeviceGroup> = state
        .fixtures
        .groups
        .lock()
        .await
        .values()
        .cloned()
        .collect();
    accepted(groups)
}

pub(crate) async fn create_group(
    State(state): State<AppState>,
    Json(body): Json<GroupCreate>,
) -> Response {
    let group = DeviceGroup {
        id: format!("group-{}", Uuid::new_v4()),
        name: body.name,
        device_ids: body.device_ids,
        actions: body.actions,
    };
    state
        .fixtures
        .groups
        .lock()
        .await
        .insert(group.id.clone(), group.clone());
    accepted(group)
}

pub(crate) async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(patch): Json<GroupPatch>,
) -> Response {
    let mut groups = state.fixtures.groups.lock().await;
    let Some(group) = groups.get_mut(&group_id) else {
        return rejected("group not found");
    };
    if let Some(name) = patch.name {
        group.name = name;
    }
    if let Some(device_ids) = patch.device_ids {
        group.device_ids = device_ids;
    }
    if let Some(actions) = patch.actions {
        group.actions = actions;
    }
    accepted(group.clone())
}

pub(crate) async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Response {
    if state
        .fixtures
        .groups
        .lock()
        .await
        .shift_remove(&group_id)
        .is_some()
    {
        accepted_empty()
    } else {
        rejected("group not found")
    }
}

pub(crate) async fn execute_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Response {
    let actions = match state.fixtures.groups.lock().await.get(&group_id) {
        Some(group) => group.actions.clone(),
        None => return rejected("group not found"),
    };
    accepted(state.fixtures.apply_actions(&actions).await)
}

// ── Scenes ──

pub(crate) async fn list_scenes(State(state): State<AppState>) -> Response {
    accepted(state.fixtures.scenes_snapshot().await)
}

pub(crate) async fn create_scene(
    State(state): State<AppState>,
    Json(body): Json<SceneCreate>,
) -> Response {
    let scene = Scene {
        id: format!("custom-{}", Uuid::new_v4()),
        name: body.name,
        description: body.description,
        actions: body.actions,
        is_active: false,
    };
    state.fixtures.insert_scene(scene.clone()).await;
    accepted(scene)
}

pub(crate) async fn update_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
    Json(patch): Json<ScenePatch>,
) -> Response {
    match state
        .fixtures
        .patch_scene(&scene_id, patch.name, patch.description, patch.actions)
        .await
    {
        Some(scene) => accepted(scene),
        None => rejected("scene not found"),
    }
}

pub(crate) async fn delete_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
) -> Response {
    if state.fixtures.remove_scene(&scene_id).await {
        accepted_empty()
    } else {
        rejected("scene not found")
    }
}

/// Applies the scene's action map, echoes the touched devices, and spawns
/// the timer that reverts `isActive` unless a later execution re-arms it.
pub(crate) async fn execute_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<String>,
) -> Response {
    let Some((actions, generation)) = state.fixtures.activate_scene(&scene_id).await else {
        return rejected("scene not found");
    };
    let updated = state.fixtures.apply_actions(&actions).await;

    let fixtures = Arc::clone(&state.fixtures);
    tokio::spawn(async move {
        tokio::time::sleep(SCENE_ACTIVE_RESET).await;
        fixtures.finish_scene_reset(&scene_id, generation).await;
    });

    accepted(updated)
}

// ── Rooms & discovery ──

pub(crate) async fn list_rooms(State(state): State<AppState>) -> Response {
    accepted(state.fixtures.rooms.clone())
}

pub(crate) async fn websocket_url() -> Response {
    accepted(WebsocketUrlResponse {
        url: "ws://localhost:3000/ws/device-status".to_owned(),
    })
}
