#![allow(clippy::unwrap_used)]
// Integration tests for `ConsoleClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doma_api::model::{AlarmStatus, DevicePatch, DeviceType, MemberRole, SessionRole};
use doma_api::types::AlarmQuery;
use doma_api::{ConsoleClient, Error, SessionHandle};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ConsoleClient) {
    let server = MockServer::start().await;
    let client = ConsoleClient::from_reqwest(
        reqwest::Client::new(),
        &server.uri(),
        SessionHandle::new(),
    )
    .unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_unwraps_the_envelope() {
    let (server, client) = setup().await;

    let body = json!({
        "success": true,
        "data": [
            {
                "id": "light-1",
                "name": "Living Room Light",
                "type": "light",
                "room": "Living Room",
                "status": true,
                "brightness": 80,
                "lastUpdate": "2025-05-01T08:00:00Z"
            },
            {
                "id": "ac-1",
                "name": "Living Room AC",
                "type": "ac",
                "room": "Living Room",
                "status": true,
                "temperature": 26,
                "mode": "cool",
                "fanSpeed": 3,
                "lastUpdate": "2025-05-01T08:00:00Z"
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_type, DeviceType::Light);
    assert_eq!(devices[0].brightness, Some(80));
    assert_eq!(devices[0].temperature, None);
    assert_eq!(devices[1].device_type, DeviceType::Ac);
    assert_eq!(devices[1].fan_speed, Some(3));
}

#[tokio::test]
async fn test_update_device_sends_a_sparse_patch() {
    let (server, client) = setup().await;

    let echoed = json!({
        "success": true,
        "data": {
            "id": "light-1",
            "name": "Living Room Light",
            "type": "light",
            "room": "Living Room",
            "status": false,
            "brightness": 80,
            "lastUpdate": "2025-05-01T08:05:00Z"
        }
    });

    // Unset patch fields must not appear on the wire at all.
    Mock::given(method("PATCH"))
        .and(path("/devices/light-1"))
        .and(body_json(json!({ "status": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&echoed))
        .mount(&server)
        .await;

    let device = client
        .update_device("light-1", &DevicePatch::power(false))
        .await
        .unwrap();

    assert!(!device.status);
    assert_eq!(device.brightness, Some(80));
}

#[tokio::test]
async fn test_execute_scene_returns_touched_devices() {
    let (server, client) = setup().await;

    let body = json!({
        "success": true,
        "data": [
            {
                "id": "light-1",
                "name": "Living Room Light",
                "type": "light",
                "room": "Living Room",
                "status": true,
                "brightness": 20,
                "lastUpdate": "2025-05-01T09:00:00Z"
            },
            {
                "id": "curtain-1",
                "name": "Living Room Curtain",
                "type": "curtain",
                "room": "Living Room",
                "status": true,
                "position": 0,
                "lastUpdate": "2025-05-01T09:00:00Z"
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/scenes/scene-movie/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let touched = client.execute_scene("scene-movie").await.unwrap();

    assert_eq!(touched.len(), 2);
    assert_eq!(touched[1].position, Some(0));
}

#[tokio::test]
async fn test_login_stores_the_token_for_later_requests() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "phone": "13800138000",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-owner",
            "username": "Home Owner",
            "role": "host",
            "message": "Login successful"
        })))
        .mount(&server)
        .await;

    // Only authenticated requests match; a missing bearer header 404s.
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(header("authorization", "Bearer tok-owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": []
        })))
        .mount(&server)
        .await;

    assert!(!client.session().is_authenticated());

    let outcome = client
        .login("13800138000", &SecretString::from("password123"))
        .await
        .unwrap();

    assert!(client.session().is_authenticated());
    assert_eq!(outcome.username.as_deref(), Some("Home Owner"));
    assert_eq!(outcome.role, Some(SessionRole::Host));

    let rooms = client.list_rooms().await.unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn test_login_without_token_is_refused_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Invalid phone number or password"
        })))
        .mount(&server)
        .await;

    let result = client
        .login("13800138000", &SecretString::from("wrong"))
        .await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert_eq!(message, "Invalid phone number or password");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_my_home_decodes_numeric_roles() {
    let (server, client) = setup().await;

    let body = json!({
        "home": [
            { "homeId": 1, "homeName": "Sunny Apartment", "role": 0, "roleName": "Owner" },
            { "homeId": 2, "homeName": "Lake House", "role": 2, "roleName": "Guest" }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/home/myHome"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let roles = client.my_home().await.unwrap();

    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0].role, MemberRole::Owner);
    assert!(roles[0].role.is_owner());
    assert_eq!(roles[1].role, MemberRole::Guest);
}

#[tokio::test]
async fn test_alarm_filters_become_query_params() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "id": 3,
            "deviceId": 1,
            "deviceName": "Kitchen Flame Sensor",
            "alarmType": "flame",
            "alarmTime": "2025-05-01T06:00:00Z",
            "status": "pending",
            "description": "Flame value exceeded threshold"
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/home/1/security/alarms"))
        .and(query_param("status", "pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let query = AlarmQuery {
        status: Some(AlarmStatus::Pending),
        ..AlarmQuery::default()
    };
    let alarms = client.list_alarms(1, &query).await.unwrap();

    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].status, AlarmStatus::Pending);
    assert!(!alarms[0].status.is_resolved());
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_envelope_is_a_domain_error() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/devices/ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Device not found"
        })))
        .mount(&server)
        .await;

    let result = client
        .update_device("ghost", &DevicePatch::power(true))
        .await;

    match result {
        Err(Error::Rejected { ref message }) => assert_eq!(message, "Device not found"),
        other => panic!("expected Rejected error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_404_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/home/view/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Home not found"
        })))
        .mount(&server)
        .await;

    let result = client.home_detail(99).await;

    match result {
        Err(Error::Api { status, ref message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Home not found");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_error_401_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_devices().await;

    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
    assert!(result.unwrap_err().is_auth_expired());
}

#[tokio::test]
async fn test_decode_failure_includes_a_body_preview() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let result = client.list_devices().await;

    match result {
        Err(Error::Deserialization { ref message, .. }) => {
            assert!(message.contains("body preview"), "message: {message}");
            assert!(message.contains("gateway"), "message: {message}");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_user_search_miss_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/auth/search-user-by-phone"))
        .and(query_param("phone", "13900000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "User not found"
        })))
        .mount(&server)
        .await;

    let result = client.search_user_by_phone("13900000000").await;

    match result {
        Err(Error::Rejected { ref message }) => assert_eq!(message, "User not found"),
        other => panic!("expected Rejected error, got: {other:?}"),
    }
}
