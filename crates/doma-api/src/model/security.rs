// ── Security domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a security sensor detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum SensorKind {
    Flame,
    Gas,
}

/// Server-asserted sensor condition.
///
/// Never derived client-side from `value` vs `threshold`; the server is
/// the only authority on what counts as abnormal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SensorStatus {
    Normal,
    Abnormal,
}

/// Flame or gas sensor with its latest sampled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySensor {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub status: SensorStatus,
    pub value: f64,
    pub threshold: f64,
    pub last_update: DateTime<Utc>,
}

/// Review state of an alarm record.
///
/// Transitions are pending → confirmed and pending → ignored only; a
/// resolved record never returns to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlarmStatus {
    Pending,
    Confirmed,
    Ignored,
}

impl AlarmStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One triggered alarm, kept for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub alarm_type: SensorKind,
    pub alarm_time: DateTime<Utc>,
    pub status: AlarmStatus,
    pub description: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn alarm_status_parses_from_query_strings() {
        assert_eq!(
            AlarmStatus::from_str("confirmed").unwrap(),
            AlarmStatus::Confirmed
        );
        assert!(AlarmStatus::from_str("open").is_err());
        assert!(AlarmStatus::Ignored.is_resolved());
        assert!(!AlarmStatus::Pending.is_resolved());
    }

    #[test]
    fn sensor_wire_shape() {
        let sensor = SecuritySensor {
            id: 1,
            name: "Kitchen Flame Sensor".into(),
            kind: SensorKind::Flame,
            status: SensorStatus::Normal,
            value: 0.2,
            threshold: 1.0,
            last_update: Utc::now(),
        };

        let json = serde_json::to_value(&sensor).unwrap();
        assert_eq!(json["type"], "flame");
        assert_eq!(json["status"], "normal");
    }
}
