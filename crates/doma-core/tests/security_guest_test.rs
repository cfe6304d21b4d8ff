#![allow(clippy::unwrap_used)]
// Integration tests for the security and guest stores against an
// in-process mock backend.

use pretty_assertions::assert_eq;

use doma_core::model::{AlarmStatus, JoinStatus};
use doma_core::types::{AlarmQuery, JoinDecision};
use doma_core::{ConsoleClient, GuestStore, MutationState, SecurityStore, SessionHandle};
use doma_mock::MockServer;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ConsoleClient) {
    let server = MockServer::start().await.unwrap();
    let client = ConsoleClient::new(&server.base_url(), SessionHandle::new()).unwrap();
    (server, client)
}

// ── Security ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_sensors_and_alarms() {
    let (_server, client) = setup().await;
    let store = SecurityStore::new(client);

    store.fetch_sensors(1).await.unwrap();
    store.fetch_alarms(1, &AlarmQuery::default()).await.unwrap();

    assert_eq!(store.sensors().len(), 3);
    assert!(store.abnormal_sensors().is_empty());
    assert_eq!(store.alarms().len(), 3);
    assert!(store.sensors_freshness().is_fresh());
    assert!(store.alarms_freshness().is_fresh());

    // Only the pending record counts as an open alarm.
    assert!(store.has_alarm());
    let pending = store.pending_alarms();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, 3);
}

#[tokio::test]
async fn test_alarm_fetch_honors_the_status_filter() {
    let (_server, client) = setup().await;
    let store = SecurityStore::new(client);

    let query = AlarmQuery {
        status: Some(AlarmStatus::Pending),
        ..AlarmQuery::default()
    };
    store.fetch_alarms(1, &query).await.unwrap();
    assert_eq!(store.alarms().len(), 1);
    assert_eq!(store.alarms()[0].id, 3);

    let query = AlarmQuery {
        status: Some(AlarmStatus::Confirmed),
        ..AlarmQuery::default()
    };
    store.fetch_alarms(1, &query).await.unwrap();
    assert_eq!(store.alarms().len(), 1);
    assert_eq!(store.alarms()[0].id, 1);
}

#[tokio::test]
async fn test_confirm_a_pending_alarm() {
    let (_server, client) = setup().await;
    let store = SecurityStore::new(client);
    store.fetch_alarms(1, &AlarmQuery::default()).await.unwrap();

    let ticket = store.confirm_alarm(1, 3).unwrap();

    // Draft verdict visible immediately.
    assert_eq!(store.alarm(3).unwrap().status, AlarmStatus::Confirmed);
    assert_eq!(ticket.outcome().await, MutationState::Applied);

    assert_eq!(store.alarm(3).unwrap().status, AlarmStatus::Confirmed);
    assert!(!store.has_alarm());
    assert_eq!(store.pending_mutations(), 0);
}

#[tokio::test]
async fn test_a_second_resolution_keeps_the_first_verdict() {
    let (_server, client) = setup().await;
    let store = SecurityStore::new(client);
    store.fetch_alarms(1, &AlarmQuery::default()).await.unwrap();

    let ticket = store.confirm_alarm(1, 3).unwrap();
    assert_eq!(ticket.outcome().await, MutationState::Applied);

    // The backend refuses to flip a resolved record.
    let ticket = store.ignore_alarm(1, 3).unwrap();
    match ticket.outcome().await {
        MutationState::Reverted { reason } => assert!(reason.contains("already resolved")),
        other => panic!("expected Reverted, got: {other:?}"),
    }
    assert_eq!(store.alarm(3).unwrap().status, AlarmStatus::Confirmed);

    // Same story for a record that was resolved before we ever fetched.
    let ticket = store.ignore_alarm(1, 1).unwrap();
    assert!(matches!(
        ticket.outcome().await,
        MutationState::Reverted { .. }
    ));
    assert_eq!(store.alarm(1).unwrap().status, AlarmStatus::Confirmed);
}

#[tokio::test]
async fn test_resolving_an_unknown_alarm_is_refused_locally() {
    let (_server, client) = setup().await;
    let store = SecurityStore::new(client);
    store.fetch_alarms(1, &AlarmQuery::default()).await.unwrap();

    let err = store.confirm_alarm(1, 99).unwrap_err();
    assert!(err.is_not_found());
}

// ── Guest access ────────────────────────────────────────────────────

#[tokio::test]
async fn test_accessible_devices_are_the_guest_visible_types() {
    let (_server, client) = setup().await;
    let store = GuestStore::new(client);

    store.fetch_accessible(3, 1).await.unwrap();
    let accessible = store.accessible().unwrap();

    assert_eq!(accessible.user_role, "GUEST");
    assert_eq!(accessible.accessible_device_types, vec![5, 6]);
    assert_eq!(accessible.devices.len(), 2);
    assert!(accessible
        .devices
        .iter()
        .all(|d| accessible.accessible_device_types.contains(&d.type_id)));
    assert!(store.access_freshness().is_fresh());
}

#[tokio::test]
async fn test_permission_probe_distinguishes_allowed_operations() {
    let (_server, client) = setup().await;
    let store = GuestStore::new(client);

    // Viewing a window sensor is allowed.
    let probe = store.check_permission(3, 1, 5, 1).await.unwrap();
    assert!(probe.has_permission);

    // Operation 3 is not in the guest's allowance.
    let probe = store.check_permission(3, 1, 5, 3).await.unwrap();
    assert!(!probe.has_permission);

    // Neither is a device type outside the accessible set.
    let probe = store.check_permission(3, 1, 1, 1).await.unwrap();
    assert!(!probe.has_permission);

    let info = store.permission_info().await.unwrap();
    assert_eq!(info.role, "GUEST");
    assert_eq!(info.allowed_operations, vec![1, 2]);
    assert_eq!(info.restrictions.len(), 4);
}

// ── Join requests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_then_list_join_requests() {
    let (_server, client) = setup().await;
    let store = GuestStore::new(client);

    store.fetch_join_requests(1).await.unwrap();
    assert_eq!(store.requests().len(), 1);

    let ticket = store.submit_join_request(1).unwrap();
    assert_eq!(ticket.outcome().await, MutationState::Applied);

    store.fetch_join_requests(1).await.unwrap();
    let requests = store.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .any(|r| r.username == "Guest User" && r.status == JoinStatus::Pending && r.id != 1));
}

#[tokio::test]
async fn test_a_decided_join_request_stays_decided() {
    let (_server, client) = setup().await;
    let store = GuestStore::new(client);
    store.fetch_join_requests(1).await.unwrap();

    let ticket = store
        .handle_join_request(
            1,
            JoinDecision {
                request_id: 1,
                user_id: 3,
                status: JoinStatus::Approved,
            },
        )
        .unwrap();
    assert_eq!(ticket.outcome().await, MutationState::Applied);

    // The queue was refetched before the ticket settled.
    let handled = store.requests().iter().find(|r| r.id == 1).unwrap().clone();
    assert_eq!(handled.status, JoinStatus::Approved);

    // Flipping the decision afterwards is refused.
    let ticket = store
        .handle_join_request(
            1,
            JoinDecision {
                request_id: 1,
                user_id: 3,
                status: JoinStatus::Rejected,
            },
        )
        .unwrap();
    match ticket.outcome().await {
        MutationState::Reverted { reason } => assert!(reason.contains("already handled")),
        other => panic!("expected Reverted, got: {other:?}"),
    }
    let handled = store.requests().iter().find(|r| r.id == 1).unwrap().clone();
    assert_eq!(handled.status, JoinStatus::Approved);
}
