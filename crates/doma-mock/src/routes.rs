// ── Route table ──

use axum::Router;
use axum::routing::{delete, get, patch, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, console, guest, home, security, telemetry};
use crate::state::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        // Console family (enveloped)
        .route("/devices", get(console::list_devices))
        .route("/devices/batch-update", post(console::batch_update_devices))
        .route("/devices/:id", get(console::get_device).patch(console::update_device))
        .route("/device-groups", get(console::list_groups).post(console::create_group))
        .route("/device-groups/:id", patch(console::update_group).delete(console::delete_group))
        .route("/device-groups/:id/execute", post(console::execute_group))
        .route("/scenes", get(console::list_scenes).post(console::create_scene))
        .route("/scenes/:id", patch(console::update_scene).delete(console::delete_scene))
        .route("/scenes/:id/execute", post(console::execute_scene))
        .route("/rooms", get(console::list_rooms))
        .route("/websocket-url", get(console::websocket_url))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/search-user-by-phone", get(auth::search_user))
        // Homes
        .route("/home/get", get(home::list_homes))
        .route("/home/view/:home_id", get(home::home_detail))
        .route("/home/myHome", get(home::my_home))
        .route("/home/search", get(home::search_homes))
        .route("/home/create", post(home::create_home))
        .route("/home/delete/:home_id", delete(home::delete_home))
        .route("/home/:home_id/updateName", post(home::rename_home))
        .route("/home/:home_id/updateAddress", post(home::update_home_address))
        .route("/home/:home_id/room/create", post(home::create_room))
        .route("/home/:home_id/room/list", get(home::list_rooms))
        .route("/home/:home_id/room/delete", delete(home::delete_room))
        .route("/home/:home_id/room/device", post(home::room_devices))
        .route("/home/member/add", post(home::add_member))
        .route("/permission/:home_id/add", post(home::grant_permission))
        .route("/permission/cancel", delete(home::revoke_permission))
        // Security
        .route("/home/:home_id/security/sensors", get(security::list_sensors))
        .route("/home/:home_id/security/alarms", get(security::list_alarms))
        .route("/home/:home_id/security/alarms/:alarm_id/confirm", post(security::confirm_alarm))
        .route("/home/:home_id/security/alarms/:alarm_id/ignore", post(security::ignore_alarm))
        // Join requests
        .route("/home/:home_id/request/put", post(home::submit_join_request))
        .route("/home/:home_id/request/receive", get(home::list_join_requests))
        .route("/home/:home_id/request/receive/handle", post(home::handle_join_request))
        // Guest access
        .route("/guest/:user_id/home/:home_id/accessible-devices", get(guest::accessible_devices))
        .route(
            "/guest/:user_id/home/:home_id/device/:device_id/operation/:operation_id/check",
            get(guest::check_permission),
        )
        .route("/guest/permission-info", get(guest::permission_info))
        // Telemetry
        .route("/api/sensor/device/:device_id/latest", get(telemetry::latest_reading))
        .route("/api/sensor/device/:device_id/realtime", get(telemetry::realtime_reading))
        .route("/api/sensor/device/:device_id/history", get(telemetry::reading_history))
        .route("/api/sensor/home/:home_id/all", get(telemetry::home_readings))
        .route("/api/dashboard/overview", get(telemetry::dashboard_overview))
        .route("/api/dashboard/temperature-trend", get(telemetry::temperature_trend))
        .route("/api/dashboard/energy-distribution", get(telemetry::energy_distribution))
        .route("/api/dashboard/security-status", get(telemetry::security_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
