//! Request and response shapes for the console REST surface.
//!
//! The console family (devices, groups, scenes, rooms) wraps payloads in
//! the `{success, data, message}` envelope; the home, guest, security,
//! and telemetry families return their documented shapes directly. Both
//! directions are modeled here so the mock backend can produce exactly
//! what the client consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::model::{
    ActionMap, AlarmStatus, DeviceInfo, DevicePatch, DeviceSummary, Home, HomeRole, HomeRoom,
    HomeSummary, JoinRequest, JoinStatus, Member, MemberRole, SensorKind, SensorReading,
    SessionRole,
};

// ── Response envelope (console family) ───────────────────────────────

/// `{success, data, message}` wrapper used by the console-family
/// endpoints. A 2xx with `success: false` is a domain failure carrying
/// only `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Successful envelope with no payload (deletes).
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }

    /// Domain failure with a human-readable reason.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Unwrap the payload, mapping `success: false` to [`Error::Rejected`]
    /// and a missing payload on success to a decode error.
    pub(crate) fn into_data(self) -> Result<T, Error> {
        if !self.success {
            return Err(Error::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected by server".to_owned()),
            });
        }
        self.data.ok_or_else(|| Error::Deserialization {
            message: "envelope marked success but carried no data".to_owned(),
            body: String::new(),
        })
    }

    /// Check `success` only, discarding any payload.
    pub(crate) fn into_ack(self) -> Result<(), Error> {
        if self.success {
            Ok(())
        } else {
            Err(Error::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected by server".to_owned()),
            })
        }
    }
}

/// Plain `{message}` acknowledgment body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────

/// Raw login body: a present `token` means success, an absent one means
/// the credentials were refused and only `message` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SessionRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Identity attached to a successful login. The token itself is stored
/// in the client's [`SessionHandle`](crate::SessionHandle), not returned.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub username: Option<String>,
    pub role: Option<SessionRole>,
    pub message: Option<String>,
}

/// `GET /auth/search-user-by-phone` hit; on a miss the server sets
/// `status: "error"` and the client surfaces it as a rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ── Devices, groups, scenes ──────────────────────────────────────────

/// One entry of a `POST /devices/batch-update` body; the full request
/// is a bare array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub id: String,
    pub updates: DevicePatch,
}

/// Body for creating a device group (the server assigns the id).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreate {
    pub name: String,
    pub device_ids: Vec<String>,
    pub actions: ActionMap,
}

/// Partial group update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionMap>,
}

/// Body for creating a scene (the server assigns the id and starts it
/// inactive).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub actions: ActionMap,
}

/// Partial scene update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionMap>,
}

/// `GET /websocket-url` payload; discovery only, nothing consumes the
/// channel in this slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsocketUrlResponse {
    pub url: String,
}

// ── Homes, members, permissions ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomesResponse {
    pub homes: Vec<Home>,
}

/// `GET /home/myHome` body; the field is named `home` on the wire even
/// though it is a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyHomeResponse {
    pub home: Vec<HomeRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeSearchResponse {
    pub homes: Vec<HomeSummary>,
}

/// `GET /home/view/{homeId}` aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDetailResponse {
    pub home: Home,
    pub rooms: Vec<HomeRoom>,
    pub members: Vec<Member>,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeCreate {
    pub name: String,
    pub address: String,
}

/// `GET /home/{homeId}/room/list` body. The list field is `Rooms` on
/// the wire, capital R and all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeRoomsResponse {
    pub message: String,
    #[serde(rename = "Rooms")]
    pub rooms: Vec<HomeRoom>,
}

/// `POST /home/{homeId}/room/device` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDevicesResponse {
    pub devices: Vec<DeviceInfo>,
    pub message: String,
}

/// Body for `POST /home/member/add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAdd {
    pub user_id: i64,
    pub home_id: i64,
    pub role: MemberRole,
}

/// Body for `POST /permission/{homeId}/add`; the home id travels in the
/// path, not the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub id: i64,
    pub user_id: i64,
    pub device_id: i64,
    pub operation_id: i64,
    pub has_permission: bool,
    pub end_time: DateTime<Utc>,
}

// ── Security ─────────────────────────────────────────────────────────

/// Optional filters for `GET /home/{homeId}/security/alarms`.
#[derive(Debug, Clone, Default)]
pub struct AlarmQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub alarm_type: Option<SensorKind>,
    pub status: Option<AlarmStatus>,
}

impl AlarmQuery {
    /// Render as query parameters, skipping unset filters.
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_time {
            params.push(("startTime", start.to_rfc3339()));
        }
        if let Some(end) = self.end_time {
            params.push(("endTime", end.to_rfc3339()));
        }
        if let Some(kind) = self.alarm_type {
            params.push(("alarmType", kind.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        params
    }
}

// ── Guests & join requests ───────────────────────────────────────────

/// `GET /guest/{userId}/home/{homeId}/accessible-devices` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibleDevicesResponse {
    pub devices: Vec<DeviceInfo>,
    pub user_role: String,
    pub accessible_device_types: Vec<i64>,
    pub message: String,
}

/// Per-operation permission probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResponse {
    pub has_permission: bool,
    pub message: String,
}

/// `GET /guest/permission-info` body: what guests may see and do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPermissionInfoResponse {
    pub role: String,
    pub description: String,
    pub restrictions: Vec<String>,
    pub accessible_device_types: Vec<i64>,
    pub allowed_operations: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequestsResponse {
    pub requests: Vec<JoinRequest>,
}

/// Owner's verdict on a join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDecision {
    pub request_id: i64,
    pub user_id: i64,
    pub status: JoinStatus,
}

// ── Telemetry ────────────────────────────────────────────────────────

/// `GET /api/sensor/device/{deviceId}/latest` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReadingResponse {
    pub success: bool,
    pub device_id: i64,
    pub device_name: String,
    pub device_type: i64,
    pub room_id: i64,
    pub home_id: i64,
    pub last_active_time: DateTime<Utc>,
    pub online_status: i32,
    pub active_status: i32,
    pub sensor_data: SensorReading,
    pub data_count: u32,
}

/// `GET /api/sensor/device/{deviceId}/realtime` body; `timestamp` is
/// the server clock at response time so pollers can judge freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeReadingResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub device_id: i64,
    pub device_name: String,
    pub online_status: i32,
    pub active_status: i32,
    pub last_active_time: DateTime<Utc>,
    pub sensor_data: SensorReading,
    pub has_data: bool,
}

/// `GET /api/sensor/device/{deviceId}/history` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingHistoryResponse {
    pub success: bool,
    pub device_id: i64,
    pub device_name: String,
    pub history_data: Vec<SensorReading>,
    pub data_count: u32,
}

/// `GET /api/sensor/home/{homeId}/all` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeReadingsResponse {
    pub success: bool,
    pub home_id: i64,
    pub device_count: u32,
    pub devices: Vec<DeviceInfo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Device;

    #[test]
    fn envelope_rejection_carries_the_server_message() {
        let envelope: Envelope<Device> =
            serde_json::from_str(r#"{"success":false,"message":"no such device"}"#).unwrap();

        match envelope.into_data() {
            Err(Error::Rejected { message }) => assert_eq!(message, "no such device"),
            other => panic!("expected rejection, got: {other:?}"),
        }
    }

    #[test]
    fn envelope_success_without_data_is_a_decode_error() {
        let envelope: Envelope<Device> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(
            envelope.into_data(),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn delete_ack_ignores_payload() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.into_ack().is_ok());
    }

    #[test]
    fn alarm_query_renders_only_set_filters() {
        let query = AlarmQuery {
            status: Some(AlarmStatus::Pending),
            ..AlarmQuery::default()
        };
        assert_eq!(query.to_params(), vec![("status", "pending".to_owned())]);
        assert!(AlarmQuery::default().to_params().is_empty());
    }
}
