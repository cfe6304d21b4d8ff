// ── Telemetry & dashboard domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampled data point from a device. History is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub device_id: i64,
    pub data_time: DateTime<Utc>,
    /// Ingest topic the reading arrived on, when known.
    pub topic: Option<String>,
    pub data_value: f64,
}

/// Registry record of a physical device (numeric-id registry, as opposed
/// to the console's string-id control model). Shared by the telemetry
/// and guest endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub home_id: i64,
    pub room_id: i64,
    pub type_id: i64,
    pub online_status: i32,
    pub active_status: i32,
    pub last_active_time: DateTime<Utc>,
}

// ── Dashboard aggregates ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusCounts {
    pub online: u32,
    pub offline: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentData {
    pub temperature: f64,
    pub humidity: u32,
    pub pm25: u32,
    pub co2: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyConsumption {
    pub total: f64,
    pub lighting: f64,
    pub appliances: f64,
    pub hvac: f64,
    pub other: f64,
    pub timestamp: DateTime<Utc>,
}

/// Door/window/motion/alarm counters for the security panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStatus {
    pub doors_locked: u32,
    pub windows_closed: u32,
    pub motion_detected: u32,
    pub alarms_active: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub device_status: DeviceStatusCounts,
    pub environment: EnvironmentData,
    pub energy: EnergyConsumption,
    pub security: SecurityStatus,
}

/// Hourly temperature series; `timestamps` and `values` are parallel and
/// end at the current hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureTrend {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyDistribution {
    pub category: String,
    pub value: f64,
    pub percentage: f64,
}

/// Full dashboard payload (`/api/dashboard/overview`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub overview: DashboardOverview,
    pub temperature_trend: TemperatureTrend,
    pub energy_distribution: Vec<EnergyDistribution>,
    pub humidity_gauge: u32,
}
