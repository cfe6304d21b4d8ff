// ── Telemetry family: sensor readings and dashboard aggregates ──
//
// Nothing here is stored; every value is synthesized through the state's
// [`TelemetrySource`](crate::telemetry::TelemetrySource) at request time.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use doma_api::model::DeviceInfo;
use doma_api::types::{
    HomeReadingsResponse, LatestReadingResponse, ReadingHistoryResponse, RealtimeReadingResponse,
};
use serde::Deserialize;

use super::not_found;
use crate::state::AppState;

fn registry_device(state: &AppState, device_id: i64) -> Option<&DeviceInfo> {
    state
        .fixtures
        .registry
        .iter()
        .find(|device| device.id == device_id)
}

pub(crate) async fn latest_reading(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Response {
    let Some(device) = registry_device(&state, device_id) else {
        return not_found("device not found");
    };
    Json(LatestReadingResponse {
        success: true,
        device_id: device.id,
        device_name: device.name.clone(),
        device_type: device.type_id,
        room_id: device.room_id,
        home_id: device.home_id,
        last_active_time: device.last_active_time,
        online_status: device.online_status,
        active_status: device.active_status,
        sensor_data: state.telemetry.reading(device),
        data_count: 1,
    })
    .into_response()
}

pub(crate) async fn realtime_reading(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Response {
    let Some(device) = registry_device(&state, device_id) else {
        return not_found("device not found");
    };
    Json(RealtimeReadingResponse {
        success: true,
        timestamp: Utc::now(),
        device_id: device.id,
        device_name: device.name.clone(),
        online_status: device.online_status,
        active_status: device.active_status,
        last_active_time: device.last_active_time,
        sensor_data: state.telemetry.reading(device),
        has_data: true,
    })
    .into_response()
}

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<u32>,
}

pub(crate) async fn reading_history(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(device) = registry_device(&state, device_id) else {
        return not_found("device not found");
    };
    let limit = query.limit.unwrap_or(10);
    Json(ReadingHistoryResponse {
        success: true,
        device_id: device.id,
        device_name: device.name.clone(),
        history_data: state.telemetry.history(device, limit),
        data_count: limit,
    })
    .into_response()
}

pub(crate) async fn home_readings(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let devices: Vec<DeviceInfo> = state
        .fixtures
        .registry
        .iter()
        .filter(|device| device.home_id == home_id)
        .cloned()
        .collect();
    Json(HomeReadingsResponse {
        success: true,
        home_id,
        device_count: u32::try_from(devices.len()).unwrap_or(u32::MAX),
        devices,
    })
    .into_response()
}

// ── Dashboard ──

pub(crate) async fn dashboard_overview(State(state): State<AppState>) -> Response {
    Json(state.telemetry.dashboard()).into_response()
}

#[derive(Deserialize)]
pub(crate) struct TrendQuery {
    hours: Option<u32>,
}

pub(crate) async fn temperature_trend(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Response {
    Json(state.telemetry.temperature_trend(query.hours.unwrap_or(24))).into_response()
}

pub(crate) async fn energy_distribution(State(state): State<AppState>) -> Response {
    Json(state.telemetry.energy_distribution()).into_response()
}

pub(crate) async fn security_status(State(state): State<AppState>) -> Response {
    Json(state.telemetry.security()).into_response()
}
