//! Domain model shared by the client, the stores, and the mock backend.
//!
//! These are the JSON shapes exchanged with the console backend; field
//! names use camelCase on the wire via `#[serde(rename_all = "camelCase")]`.
//! The console family (devices, groups, scenes, rooms) uses string ids;
//! the home-scoped families use numeric ids.

mod device;
mod guest;
mod home;
mod scene;
mod security;
mod telemetry;

pub use device::{AcMode, ActionMap, Device, DeviceGroup, DevicePatch, DeviceType, Room};
pub use guest::{JoinRequest, JoinStatus};
pub use home::{
    DeviceSummary, Home, HomeRole, HomeRoom, HomeSummary, Member, MemberRole, Permission,
    SessionRole,
};
pub use scene::Scene;
pub use security::{AlarmRecord, AlarmStatus, SecuritySensor, SensorKind, SensorStatus};
pub use telemetry::{
    DashboardData, DashboardOverview, DeviceInfo, DeviceStatusCounts, EnergyConsumption,
    EnergyDistribution, EnvironmentData, SecurityStatus, SensorReading, TemperatureTrend,
};
