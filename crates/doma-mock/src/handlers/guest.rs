// ── Guest family: restricted device access ──

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use doma_api::types::{
    AccessibleDevicesResponse, GuestPermissionInfoResponse, PermissionCheckResponse,
};

use crate::state::AppState;

/// Registry device types a guest may see (windows and cameras).
const ACCESSIBLE_TYPES: [i64; 2] = [5, 6];

/// Operation ids a guest may perform (view and query).
const ALLOWED_OPERATIONS: [i64; 2] = [1, 2];

pub(crate) async fn accessible_devices(
    State(state): State<AppState>,
    Path((_user_id, home_id)): Path<(i64, i64)>,
) -> Response {
    let devices = state
        .fixtures
        .registry
        .iter()
        .filter(|device| device.home_id == home_id && ACCESSIBLE_TYPES.contains(&device.type_id))
        .cloned()
        .collect();
    Json(AccessibleDevicesResponse {
        devices,
        user_role: "GUEST".to_owned(),
        accessible_device_types: ACCESSIBLE_TYPES.to_vec(),
        message: "Accessible devices for guest".to_owned(),
    })
    .into_response()
}

/// Allowed when the operation is in the guest set and the device is of
/// an accessible type; everything else is a polite refusal, not an error.
pub(crate) async fn check_permission(
    State(state): State<AppState>,
    Path((_user_id, _home_id, device_id, operation_id)): Path<(i64, i64, i64, i64)>,
) -> Response {
    let accessible_device = state
        .fixtures
        .registry
        .iter()
        .any(|device| device.id == device_id && ACCESSIBLE_TYPES.contains(&device.type_id));
    let has_permission = accessible_device && ALLOWED_OPERATIONS.contains(&operation_id);
    let message = if has_permission {
        "operation allowed".to_owned()
    } else {
        "operation not allowed for guests".to_owned()
    };
    Json(PermissionCheckResponse {
        has_permission,
        message,
    })
    .into_response()
}

pub(crate) async fn permission_info() -> Response {
    Json(GuestPermissionInfoResponse {
        role: "GUEST".to_owned(),
        description: "Guest accounts see a restricted slice of the home".to_owned(),
        restrictions: vec![
            "Only designated device types are visible".to_owned(),
            "View and query operations only".to_owned(),
            "Devices cannot be added, removed, or reconfigured".to_owned(),
            "Sensitive devices such as door locks stay hidden".to_owned(),
        ],
        accessible_device_types: ACCESSIBLE_TYPES.to_vec(),
        allowed_operations: ALLOWED_OPERATIONS.to_vec(),
    })
    .into_response()
}
