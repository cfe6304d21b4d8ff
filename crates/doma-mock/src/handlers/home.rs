// ── Home family: homes, rooms, members, permissions, join requests ──

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use doma_api::model::{
    Home, HomeRole, HomeRoom, HomeSummary, JoinRequest, JoinStatus, Member, MemberRole,
};
use doma_api::types::{
    Ack, HomeCreate, HomeDetailResponse, HomeRoomsResponse, HomeSearchResponse, HomesResponse,
    JoinDecision, JoinRequestsResponse, MemberAdd, MyHomeResponse, PermissionGrant,
    RoomDevicesResponse,
};
use serde::Deserialize;

use super::{bad_request, not_found};
use crate::state::AppState;

// ── Homes ──

pub(crate) async fn list_homes(State(state): State<AppState>) -> Response {
    let homes: Vec<Home> = state.fixtures.homes.lock().await.values().cloned().collect();
    Json(HomesResponse { homes }).into_response()
}

pub(crate) async fn home_detail(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    let Some(home) = state.fixtures.homes.lock().await.get(&home_id).cloned() else {
        return not_found("home not found");
    };
    let rooms: Vec<HomeRoom> = state
        .fixtures
        .home_rooms
        .lock()
        .await
        .values()
        .filter(|room| room.home_id == home_id)
        .cloned()
        .collect();
    let members = state
        .fixtures
        .members
        .lock()
        .await
        .get(&home_id)
        .cloned()
        .unwrap_or_default();
    // Only the seeded primary home carries a device digest.
    let devices = if home_id == 1 {
        state.fixtures.home_devices.clone()
    } else {
        Vec::new()
    };
    Json(HomeDetailResponse {
        home,
        rooms,
        members,
        devices,
    })
    .into_response()
}

pub(crate) async fn my_home(State(state): State<AppState>) -> Response {
    let home: Vec<HomeRole> = state.fixtures.roles.lock().await.values().cloned().collect();
    Json(MyHomeResponse { home }).into_response()
}

#[derive(Deserialize)]
pub(crate) struct KeywordQuery {
    keyword: String,
}

pub(crate) async fn search_homes(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> Response {
    let homes: Vec<HomeSummary> = state
        .fixtures
        .homes
        .lock()
        .await
        .values()
        .filter(|home| home.name.contains(&query.keyword))
        .map(|home| HomeSummary {
            id: home.id,
            name: home.name.clone(),
            address: home.address.clone(),
        })
        .collect();
    Json(HomeSearchResponse { homes }).into_response()
}

pub(crate) async fn create_home(
    State(state): State<AppState>,
    Json(body): Json<HomeCreate>,
) -> Response {
    let id = state.fixtures.next_id();
    state.fixtures.homes.lock().await.insert(
        id,
        Home {
            id,
            name: body.name.clone(),
            address: body.address,
            create_time: Utc::now(),
        },
    );
    // The creator owns what they create.
    state.fixtures.roles.lock().await.insert(
        id,
        HomeRole {
            home_id: id,
            home_name: body.name,
            role: MemberRole::Owner,
            role_name: MemberRole::Owner.label().to_owned(),
        },
    );
    Json(Ack::new("Home created")).into_response()
}

pub(crate) async fn delete_home(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    if state
        .fixtures
        .homes
        .lock()
        .await
        .shift_remove(&home_id)
        .is_none()
    {
        return not_found("home not found");
    }
    state.fixtures.roles.lock().await.shift_remove(&home_id);
    state
        .fixtures
        .home_rooms
        .lock()
        .await
        .retain(|_, room| room.home_id != home_id);
    state.fixtures.members.lock().await.remove(&home_id);
    Json(Ack::new("Home deleted")).into_response()
}

#[derive(Deserialize)]
pub(crate) struct NameBody {
    name: String,
}

pub(crate) async fn rename_home(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(body): Json<NameBody>,
) -> Response {
    let mut homes = state.fixtures.homes.lock().await;
    let Some(home) = homes.get_mut(&home_id) else {
        return not_found("home not found");
    };
    home.name = body.name.clone();
    drop(homes);
    if let Some(role) = state.fixtures.roles.lock().await.get_mut(&home_id) {
        role.home_name = body.name;
    }
    Json(Ack::new("Home renamed")).into_response()
}

#[derive(Deserialize)]
pub(crate) struct AddressBody {
    address: String,
}

pub(crate) async fn update_home_address(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(body): Json<AddressBody>,
) -> Response {
    let mut homes = state.fixtures.homes.lock().await;
    let Some(home) = homes.get_mut(&home_id) else {
        return not_found("home not found");
    };
    home.address = body.address;
    Json(Ack::new("Home address updated")).into_response()
}

// ── Rooms ──

#[derive(Deserialize)]
pub(crate) struct RoomCreateBody {
    name: String,
}

pub(crate) async fn create_room(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(body): Json<RoomCreateBody>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let id = state.fixtures.next_id();
    state.fixtures.home_rooms.lock().await.insert(
        id,
        HomeRoom {
            id,
            name: body.name,
            home_id,
            is_deleted: false,
        },
    );
    Json(Ack::new("Room created")).into_response()
}

pub(crate) async fn list_rooms(State(state): State<AppState>, Path(home_id): Path<i64>) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let rooms: Vec<HomeRoom> = state
        .fixtures
        .home_rooms
        .lock()
        .await
        .values()
        .filter(|room| room.home_id == home_id)
        .cloned()
        .collect();
    Json(HomeRoomsResponse {
        message: "success".to_owned(),
        rooms,
    })
    .into_response()
}

#[derive(Deserialize)]
pub(crate) struct IdBody {
    id: i64,
}

/// The room id travels in the body, not the path.
pub(crate) async fn delete_room(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(body): Json<IdBody>,
) -> Response {
    let mut rooms = state.fixtures.home_rooms.lock().await;
    match rooms.get(&body.id) {
        Some(room) if room.home_id == home_id => {
            rooms.shift_remove(&body.id);
            Json(Ack::new("Room deleted")).into_response()
        }
        _ => not_found("room not found"),
    }
}

/// Registry devices of one room, selected by the id in the body.
pub(crate) async fn room_devices(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(body): Json<IdBody>,
) -> Response {
    let devices = state
        .fixtures
        .registry
        .iter()
        .filter(|device| device.home_id == home_id && device.room_id == body.id)
        .cloned()
        .collect();
    Json(RoomDevicesResponse {
        devices,
        message: "success".to_owned(),
    })
    .into_response()
}

// ── Members & permissions ──

pub(crate) async fn add_member(
    State(state): State<AppState>,
    Json(member): Json<MemberAdd>,
) -> Response {
    if !state
        .fixtures
        .homes
        .lock()
        .await
        .contains_key(&member.home_id)
    {
        return not_found("home not found");
    }
    let mut members = state.fixtures.members.lock().await;
    let list = members.entry(member.home_id).or_default();
    // Re-adding a user replaces their role instead of duplicating them.
    list.retain(|existing| existing.user_id != member.user_id);
    list.push(Member {
        user_id: member.user_id,
        username: username_for(member.user_id),
        role: member.role,
        role_name: member.role.label().to_owned(),
    });
    Json(Ack::new("Member added")).into_response()
}

pub(crate) async fn grant_permission(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Json(_grant): Json<PermissionGrant>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    Json(Ack::new("Permission granted")).into_response()
}

pub(crate) async fn revoke_permission(Json(_body): Json<IdBody>) -> Response {
    Json(Ack::new("Permission revoked")).into_response()
}

// ── Join requests ──

/// The submitter is always the guest fixture account; the mock has no
/// per-request auth context.
pub(crate) async fn submit_join_request(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let id = state.fixtures.next_id();
    state.fixtures.join_requests.lock().await.insert(
        id,
        JoinRequest {
            id,
            user_id: 3,
            username: "Guest User".to_owned(),
            status: JoinStatus::Pending,
            status_name: JoinStatus::Pending.label().to_owned(),
            record_time: Utc::now(),
        },
    );
    Json(Ack::new("Request submitted")).into_response()
}

pub(crate) async fn list_join_requests(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let requests: Vec<JoinRequest> = state
        .fixtures
        .join_requests
        .lock()
        .await
        .values()
        .cloned()
        .collect();
    Json(JoinRequestsResponse { requests }).into_response()
}

/// A decided request stays decided; re-handling it is refused.
pub(crate) async fn handle_join_request(
    State(state): State<AppState>,
    Path(_home_id): Path<i64>,
    Json(decision): Json<JoinDecision>,
) -> Response {
    let mut requests = state.fixtures.join_requests.lock().await;
    let Some(request) = requests.get_mut(&decision.request_id) else {
        return not_found("join request not found");
    };
    if request.status.is_decided() {
        return bad_request("join request already handled");
    }
    request.status = decision.status;
    request.status_name = decision.status.label().to_owned();
    Json(Ack::new("Request handled")).into_response()
}

fn username_for(user_id: i64) -> String {
    match user_id {
        1 => "Home Owner".to_owned(),
        2 => "Family Member".to_owned(),
        3 => "Guest User".to_owned(),
        other => format!("User {other}"),
    }
}
