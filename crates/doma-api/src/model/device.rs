// ── Device domain types ──

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device category. Decides which of the optional attributes apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum DeviceType {
    Light,
    Ac,
    Curtain,
    Sensor,
    Switch,
}

impl DeviceType {
    pub fn has_brightness(&self) -> bool {
        matches!(self, Self::Light)
    }

    pub fn has_climate(&self) -> bool {
        matches!(self, Self::Ac)
    }

    pub fn has_position(&self) -> bool {
        matches!(self, Self::Curtain)
    }
}

/// Air-conditioner operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum AcMode {
    Cool,
    Heat,
    Fan,
    Auto,
}

/// A controllable device as exchanged with the backend.
///
/// The optional attributes are only meaningful for the matching
/// [`DeviceType`]; absence means "not applicable for this device type",
/// not "unknown". `last_update` is refreshed by the server on every
/// accepted mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub room: String,
    /// On/off.
    pub status: bool,

    // Type-specific attributes
    /// 0-100, lights only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// 16-30 °C, air conditioners only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AcMode>,
    /// 1-5, air conditioners only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<u8>,
    /// 0-100 (fully closed to fully open), curtains only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,

    pub last_update: DateTime<Utc>,
}

impl Device {
    /// Fold a partial update into this device, leaving untouched fields
    /// as they are. Does not refresh `last_update`; that is the server's
    /// move when it accepts the mutation.
    pub fn apply(&mut self, patch: &DevicePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(room) = &patch.room {
            self.room = room.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(brightness) = patch.brightness {
            self.brightness = Some(brightness);
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(mode) = patch.mode {
            self.mode = Some(mode);
        }
        if let Some(fan_speed) = patch.fan_speed {
            self.fan_speed = Some(fan_speed);
        }
        if let Some(position) = patch.position {
            self.position = Some(position);
        }
    }

    /// `apply` on a copy.
    pub fn merged(&self, patch: &DevicePatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}

/// Partial device update: every field optional, only present fields are
/// sent and only present fields are folded in. Also the value type of an
/// [`ActionMap`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AcMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

impl DevicePatch {
    /// Patch that only flips the power state.
    pub fn power(on: bool) -> Self {
        Self {
            status: Some(on),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Target attribute values per device id, in declaration order.
///
/// Execution applies each entry to its device; devices absent from the
/// map are untouched.
pub type ActionMap = IndexMap<String, DevicePatch>;

/// Named set of devices with a prepared action per member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceGroup {
    pub id: String,
    pub name: String,
    /// Member devices, in display order.
    pub device_ids: Vec<String>,
    pub actions: ActionMap,
}

/// Room as listed by the console.
///
/// `device_count` is denormalized server-side; it is not recomputed from
/// the device list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub device_count: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn light() -> Device {
        Device {
            id: "light-1".into(),
            name: "Ceiling Light".into(),
            device_type: DeviceType::Light,
            room: "Living Room".into(),
            status: true,
            brightness: Some(80),
            temperature: None,
            mode: None,
            fan_speed: None,
            position: None,
            last_update: Utc::now(),
        }
    }

    #[test]
    fn apply_folds_only_present_fields() {
        let mut device = light();
        device.apply(&DevicePatch {
            status: Some(false),
            brightness: Some(20),
            ..DevicePatch::default()
        });

        assert!(!device.status);
        assert_eq!(device.brightness, Some(20));
        assert_eq!(device.name, "Ceiling Light");
        assert_eq!(device.room, "Living Room");
    }

    #[test]
    fn absent_attributes_stay_absent_on_the_wire() {
        let device = light();
        let json = serde_json::to_value(&device).unwrap();

        assert_eq!(json["type"], "light");
        assert_eq!(json["brightness"], 80);
        assert!(json.get("temperature").is_none());
        assert!(json.get("fanSpeed").is_none());
        assert!(json.get("position").is_none());
    }

    #[test]
    fn patch_serializes_sparsely() {
        let patch = DevicePatch::power(false);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"status":false}"#);
    }

    #[test]
    fn action_map_preserves_declaration_order() {
        let mut actions = ActionMap::new();
        actions.insert("light-2".into(), DevicePatch::power(true));
        actions.insert("light-1".into(), DevicePatch::power(true));
        actions.insert("ac-1".into(), DevicePatch::power(false));

        let ids: Vec<&str> = actions.keys().map(String::as_str).collect();
        assert_eq!(ids, ["light-2", "light-1", "ac-1"]);
    }
}
