// ── Scene domain types ──

use serde::{Deserialize, Serialize};

use super::device::ActionMap;

/// Automation preset: one click applies `actions` to every listed device.
///
/// `is_active` is a transient "running" cue, not durable state: it is set
/// true when execution starts and reset false after a fixed delay, with
/// no guarantee of consistency with actual device states if execution is
/// interrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub actions: ActionMap,
    pub is_active: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::model::DevicePatch;

    use super::*;

    #[test]
    fn wire_shape_uses_camel_case() {
        let mut actions = ActionMap::new();
        actions.insert("light-1".into(), DevicePatch::power(false));
        let scene = Scene {
            id: "scene-leave".into(),
            name: "Leaving Home".into(),
            description: None,
            actions,
            is_active: false,
        };

        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["isActive"], false);
        assert_eq!(json["actions"]["light-1"]["status"], false);
        assert!(json.get("description").is_none());
    }
}
