// ── Security family: sensors and alarm records ──
//
// Listings are bare; alarm resolution is enveloped, matching the real
// backend's odd split.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use doma_api::model::{AlarmRecord, AlarmStatus, SensorKind};
use doma_api::types::Ack;
use serde::Deserialize;

use super::{accepted, not_found, rejected};
use crate::state::AppState;

pub(crate) async fn list_sensors(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    Json(state.fixtures.sensors.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlarmFilter {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    alarm_type: Option<SensorKind>,
    status: Option<AlarmStatus>,
}

impl AlarmFilter {
    fn matches(&self, alarm: &AlarmRecord) -> bool {
        self.start_time.is_none_or(|start| alarm.alarm_time >= start)
            && self.end_time.is_none_or(|end| alarm.alarm_time <= end)
            && self.alarm_type.is_none_or(|kind| alarm.alarm_type == kind)
            && self.status.is_none_or(|status| alarm.status == status)
    }
}

pub(crate) async fn list_alarms(
    State(state): State<AppState>,
    Path(home_id): Path<i64>,
    Query(filter): Query<AlarmFilter>,
) -> Response {
    if !state.fixtures.homes.lock().await.contains_key(&home_id) {
        return not_found("home not found");
    }
    let alarms: Vec<AlarmRecord> = state
        .fixtures
        .alarms
        .lock()
        .await
        .values()
        .filter(|alarm| filter.matches(alarm))
        .cloned()
        .collect();
    Json(alarms).into_response()
}

pub(crate) async fn confirm_alarm(
    State(state): State<AppState>,
    Path((_home_id, alarm_id)): Path<(i64, i64)>,
) -> Response {
    resolve(&state, alarm_id, AlarmStatus::Confirmed, "Alarm confirmed").await
}

pub(crate) async fn ignore_alarm(
    State(state): State<AppState>,
    Path((_home_id, alarm_id)): Path<(i64, i64)>,
) -> Response {
    resolve(&state, alarm_id, AlarmStatus::Ignored, "Alarm ignored").await
}

/// Pending is the only state that accepts a verdict; a second resolution
/// is refused and the stored record keeps its first verdict.
async fn resolve(state: &AppState, alarm_id: i64, verdict: AlarmStatus, ack: &str) -> Response {
    let mut alarms = state.fixtures.alarms.lock().await;
    let Some(alarm) = alarms.get_mut(&alarm_id) else {
        return rejected("alarm not found");
    };
    if alarm.status.is_resolved() {
        return rejected("alarm already resolved");
    }
    alarm.status = verdict;
    accepted(Ack::new(ack))
}
