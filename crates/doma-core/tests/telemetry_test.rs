#![allow(clippy::unwrap_used)]
// Integration tests for the telemetry store against an in-process mock
// backend. The mock synthesizes readings from a seeded generator, so
// assertions check ranges and shapes rather than exact values.

use std::time::Duration;

use pretty_assertions::assert_eq;

use doma_core::{ConsoleClient, SessionHandle, TelemetryStore};
use doma_mock::MockServer;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, TelemetryStore) {
    let server = MockServer::start().await.unwrap();
    let client = ConsoleClient::new(&server.base_url(), SessionHandle::new()).unwrap();
    (server, TelemetryStore::new(client))
}

// ── One-shot reads ──────────────────────────────────────────────────

#[tokio::test]
async fn test_latest_and_realtime_readings() {
    let (_server, store) = setup().await;

    let latest = store.latest_reading(1).await.unwrap();
    assert!(latest.success);
    assert_eq!(latest.device_id, 1);
    assert_eq!(latest.device_name, "Living Room Light");
    assert_eq!(latest.data_count, 1);
    assert_eq!(latest.sensor_data.device_id, 1);
    assert!((0.0..=100.0).contains(&latest.sensor_data.data_value));

    let realtime = store.realtime_reading(1).await.unwrap();
    assert!(realtime.has_data);
    assert_eq!(realtime.device_id, 1);

    let err = store.latest_reading(99).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reading_history_honors_the_limit() {
    let (_server, store) = setup().await;

    let history = store.reading_history(3, Some(5)).await.unwrap();
    assert_eq!(history.device_id, 3);
    assert_eq!(history.data_count, 5);
    assert_eq!(history.history_data.len(), 5);
    // Newest first.
    assert!(history.history_data[0].data_time > history.history_data[4].data_time);

    let defaulted = store.reading_history(3, None).await.unwrap();
    assert_eq!(defaulted.history_data.len(), 10);
}

#[tokio::test]
async fn test_home_readings_cover_the_registry() {
    let (_server, store) = setup().await;

    let readings = store.home_readings(1).await.unwrap();
    assert_eq!(readings.home_id, 1);
    assert_eq!(readings.device_count, 6);
    assert_eq!(readings.devices.len(), 6);

    let err = store.home_readings(99).await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Dashboard aggregates ────────────────────────────────────────────

#[tokio::test]
async fn test_dashboard_aggregates_stay_in_range() {
    let (_server, store) = setup().await;

    let dashboard = store.dashboard_overview().await.unwrap();
    assert!((40..=80).contains(&dashboard.humidity_gauge));

    let environment = &dashboard.overview.environment;
    assert!((18.0..=28.0).contains(&environment.temperature));
    assert!((40..=80).contains(&environment.humidity));
    assert!((400..=1000).contains(&environment.co2));

    let counts = dashboard.overview.device_status;
    assert_eq!(counts.total, 30);
    assert!((15..=25).contains(&counts.online));

    assert_eq!(dashboard.temperature_trend.values.len(), 24);
    assert_eq!(dashboard.energy_distribution.len(), 4);
}

#[tokio::test]
async fn test_temperature_trend_is_hourly_and_ends_now() {
    let (_server, store) = setup().await;

    let trend = store.temperature_trend(Some(6)).await.unwrap();
    assert_eq!(trend.timestamps.len(), 6);
    assert_eq!(trend.values.len(), 6);
    assert!(trend.timestamps.windows(2).all(|w| w[0] < w[1]));

    let last = *trend.timestamps.last().unwrap();
    assert!((chrono::Utc::now() - last).num_seconds().abs() < 300);

    let defaulted = store.temperature_trend(None).await.unwrap();
    assert_eq!(defaulted.values.len(), 24);
}

#[tokio::test]
async fn test_energy_distribution_shares_cover_the_total() {
    let (_server, store) = setup().await;

    let distribution = store.energy_distribution().await.unwrap();
    let categories: Vec<&str> = distribution.iter().map(|d| d.category.as_str()).collect();
    assert_eq!(categories, ["Lighting", "Appliances", "HVAC", "Other"]);

    let sum: f64 = distribution.iter().map(|d| d.percentage).sum();
    assert!((99.0..=101.0).contains(&sum), "percentages sum to {sum}");
    assert!(distribution.iter().all(|d| d.value > 0.0));
}

#[tokio::test]
async fn test_security_status_counters() {
    let (_server, store) = setup().await;

    let status = store.security_status().await.unwrap();
    assert!((3..=5).contains(&status.doors_locked));
    assert!((8..=12).contains(&status.windows_closed));
    assert!(status.motion_detected <= 2);
    assert!(status.alarms_active <= 1);
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_polling_delivers_readings_until_stopped() {
    let (_server, store) = setup().await;

    let mut handle = store.start_polling(1, Duration::from_millis(50));
    assert_eq!(store.active_polls(), 1);

    // The first fetch fires immediately.
    assert!(handle.changed().await);
    let first = handle.latest().unwrap();
    assert_eq!(first.device_id, 1);
    assert!(first.has_data);

    assert!(handle.changed().await);
    let second = handle.latest().unwrap();
    assert!(second.timestamp > first.timestamp);

    store.stop_polling(1);
    assert_eq!(store.active_polls(), 0);
    assert!(handle.is_stopped());

    // Any reading in flight drains, then the stream reports closed.
    while handle.changed().await {}
    assert!(handle.latest().is_some());
}

#[tokio::test]
async fn test_restarting_a_poll_replaces_the_previous_loop() {
    let (_server, store) = setup().await;

    let first = store.start_polling(1, Duration::from_millis(50));
    let mut second = store.start_polling(1, Duration::from_millis(50));

    assert!(first.is_stopped());
    assert_eq!(store.active_polls(), 1);
    assert!(second.changed().await);
    assert_eq!(second.latest().unwrap().device_id, 1);

    store.stop_all();
    assert_eq!(store.active_polls(), 0);
    assert!(second.is_stopped());
}

#[tokio::test]
async fn test_polls_for_different_devices_stop_independently() {
    let (_server, store) = setup().await;

    let light = store.start_polling(1, Duration::from_millis(50));
    let mut socket = store.start_polling(2, Duration::from_millis(50));
    assert_eq!(store.active_polls(), 2);

    store.stop_polling(1);
    assert_eq!(store.active_polls(), 1);
    assert!(light.is_stopped());
    assert!(!socket.is_stopped());

    // The surviving loop keeps delivering.
    assert!(socket.changed().await);
    assert_eq!(socket.latest().unwrap().device_id, 2);

    store.stop_all();
    assert_eq!(store.active_polls(), 0);
    assert!(socket.is_stopped());
}
