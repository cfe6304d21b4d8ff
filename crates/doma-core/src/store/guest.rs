// ── Guest access store ──
//
// What a guest may see and do in a home: the accessible-device view,
// permission probes, and the join-request flow on both sides (guest
// submitting, owner handling).

use std::sync::Arc;

use doma_api::ConsoleClient;
use doma_api::model::JoinRequest;
use doma_api::types::{
    AccessibleDevicesResponse, GuestPermissionInfoResponse, JoinDecision, PermissionCheckResponse,
};
use tokio::sync::watch;
use tracing::warn;

use super::collection::Collection;
use super::freshness::{Freshness, FreshnessCell};
use super::journal::{Journal, MutationTicket};
use crate::error::CoreError;

/// Reactive store for the guest-facing slice of a home.
#[derive(Clone)]
pub struct GuestStore {
    inner: Arc<GuestStoreInner>,
}

struct GuestStoreInner {
    client: ConsoleClient,
    /// Accessible-device view of the most recent fetch.
    access: watch::Sender<Option<Arc<AccessibleDevicesResponse>>>,
    access_freshness: FreshnessCell,
    requests: Collection<i64, JoinRequest>,
    requests_freshness: FreshnessCell,
    journal: Journal,
}

impl GuestStore {
    pub fn new(client: ConsoleClient) -> Self {
        let (access, _) = watch::channel(None);
        Self {
            inner: Arc::new(GuestStoreInner {
                client,
                access,
                access_freshness: FreshnessCell::new(),
                requests: Collection::new(),
                requests_freshness: FreshnessCell::new(),
                journal: Journal::new(),
            }),
        }
    }

    // ━━ Fetches ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Refresh the devices `user_id` may reach in `home_id`.
    pub async fn fetch_accessible(&self, user_id: i64, home_id: i64) -> Result<(), CoreError> {
        match self
            .inner
            .client
            .guest_accessible_devices(user_id, home_id)
            .await
        {
            Ok(access) => {
                self.inner.access.send_replace(Some(Arc::new(access)));
                self.inner.access_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.access_freshness.mark_stale(&err);
                warn!(user = user_id, home = home_id, error = %err, "accessible-device refresh failed");
                Err(err)
            }
        }
    }

    pub async fn fetch_join_requests(&self, home_id: i64) -> Result<(), CoreError> {
        match self.inner.client.list_join_requests(home_id).await {
            Ok(requests) => {
                self.inner.requests.replace_all(requests, |r| r.id);
                self.inner.requests_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.requests_freshness.mark_stale(&err);
                warn!(home = home_id, error = %err, "join-request refresh failed");
                Err(err)
            }
        }
    }

    // ━━ Reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn accessible(&self) -> Option<Arc<AccessibleDevicesResponse>> {
        self.inner.access.borrow().clone()
    }

    pub fn subscribe_accessible(
        &self,
    ) -> watch::Receiver<Option<Arc<AccessibleDevicesResponse>>> {
        self.inner.access.subscribe()
    }

    pub fn access_freshness(&self) -> Freshness {
        self.inner.access_freshness.get()
    }

    pub fn requests(&self) -> Arc<Vec<Arc<JoinRequest>>> {
        self.inner.requests.snapshot()
    }

    pub fn requests_freshness(&self) -> Freshness {
        self.inner.requests_freshness.get()
    }

    // ━━ Permission probes ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Ask whether one user may run one operation on one device.
    pub async fn check_permission(
        &self,
        user_id: i64,
        home_id: i64,
        device_id: i64,
        operation_id: i64,
    ) -> Result<PermissionCheckResponse, CoreError> {
        Ok(self
            .inner
            .client
            .check_guest_permission(user_id, home_id, device_id, operation_id)
            .await?)
    }

    /// The static description of the guest role.
    pub async fn permission_info(&self) -> Result<GuestPermissionInfoResponse, CoreError> {
        Ok(self.inner.client.guest_permission_info().await?)
    }

    // ━━ Join requests ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Ask to join `home_id` as the current user.
    pub fn submit_join_request(&self, home_id: i64) -> Result<MutationTicket, CoreError> {
        let ticket = self
            .inner
            .journal
            .begin(format!("join request for home {home_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.submit_join_request(home_id).await {
                Ok(_) => store.inner.journal.applied(mutation),
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(home = home_id, error = %err, "join request submission failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Approve or reject a pending request, then refetch the queue.
    pub fn handle_join_request(
        &self,
        home_id: i64,
        decision: JoinDecision,
    ) -> Result<MutationTicket, CoreError> {
        let ticket = self
            .inner
            .journal
            .begin(format!("join request {}", decision.request_id));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.handle_join_request(home_id, &decision).await {
                Ok(_) => {
                    let _ = store.fetch_join_requests(home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(
                        request = decision.request_id,
                        error = %err,
                        "join request handling failed"
                    );
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    pub fn pending_mutations(&self) -> usize {
        self.inner.journal.pending_count()
    }
}
