// ── Home & membership store ──
//
// Home listing, the open home's detail aggregate, the caller's per-home
// roles, home rooms, membership, and permission grants. Rename and
// re-address are acknowledged without an echoed body, so their drafts
// are promoted rather than replaced on success.

use std::sync::Arc;

use doma_api::ConsoleClient;
use doma_api::model::{DeviceInfo, Home, HomeRole, HomeRoom, HomeSummary};
use doma_api::types::{
    HomeCreate, HomeDetailResponse, MemberAdd, PermissionGrant, UserSearchResponse,
};
use tokio::sync::watch;
use tracing::warn;

use super::collection::Collection;
use super::freshness::{Freshness, FreshnessCell};
use super::journal::{Journal, MutationTicket};
use super::subscription::Subscription;
use crate::error::CoreError;

/// Reactive store for homes, rooms, members, and permissions.
#[derive(Clone)]
pub struct HomeStore {
    inner: Arc<HomeStoreInner>,
}

struct HomeStoreInner {
    client: ConsoleClient,
    homes: Collection<i64, Home>,
    /// The caller's role in each home, keyed by home id.
    roles: Collection<i64, HomeRole>,
    /// Rooms of the most recently listed home.
    rooms: Collection<i64, HomeRoom>,
    /// Detail aggregate of the open home.
    detail: watch::Sender<Option<Arc<HomeDetailResponse>>>,
    homes_freshness: FreshnessCell,
    roles_freshness: FreshnessCell,
    rooms_freshness: FreshnessCell,
    detail_freshness: FreshnessCell,
    journal: Journal,
}

impl HomeStore {
    pub fn new(client: ConsoleClient) -> Self {
        let (detail, _) = watch::channel(None);
        Self {
            inner: Arc::new(HomeStoreInner {
                client,
                homes: Collection::new(),
                roles: Collection::new(),
                rooms: Collection::new(),
                detail,
                homes_freshness: FreshnessCell::new(),
                roles_freshness: FreshnessCell::new(),
                rooms_freshness: FreshnessCell::new(),
                detail_freshness: FreshnessCell::new(),
                journal: Journal::new(),
            }),
        }
    }

    // ━━ Fetches ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn fetch_homes(&self) -> Result<(), CoreError> {
        match self.inner.client.list_homes().await {
            Ok(homes) => {
                self.inner.homes.replace_all(homes, |h| h.id);
                self.inner.homes_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.homes_freshness.mark_stale(&err);
                warn!(error = %err, "home refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    pub async fn fetch_roles(&self) -> Result<(), CoreError> {
        match self.inner.client.my_home().await {
            Ok(roles) => {
                self.inner.roles.replace_all(roles, |r| r.home_id);
                self.inner.roles_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.roles_freshness.mark_stale(&err);
                warn!(error = %err, "role refresh failed; serving the previous snapshot");
                Err(err)
            }
        }
    }

    /// Load the detail aggregate for `home_id` and make it the open
    /// home.
    pub async fn open_home(&self, home_id: i64) -> Result<(), CoreError> {
        match self.inner.client.home_detail(home_id).await {
            Ok(detail) => {
                self.inner.detail.send_replace(Some(Arc::new(detail)));
                self.inner.detail_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.detail_freshness.mark_stale(&err);
                warn!(home = home_id, error = %err, "home detail refresh failed");
                Err(err)
            }
        }
    }

    pub async fn fetch_rooms(&self, home_id: i64) -> Result<(), CoreError> {
        match self.inner.client.list_home_rooms(home_id).await {
            Ok(rooms) => {
                self.inner.rooms.replace_all(rooms, |r| r.id);
                self.inner.rooms_freshness.mark_fresh();
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.rooms_freshness.mark_stale(&err);
                warn!(home = home_id, error = %err, "home room refresh failed");
                Err(err)
            }
        }
    }

    // ━━ Reads ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn homes(&self) -> Arc<Vec<Arc<Home>>> {
        self.inner.homes.snapshot()
    }

    pub fn home(&self, home_id: i64) -> Option<Arc<Home>> {
        self.inner.homes.get(&home_id)
    }

    pub fn roles(&self) -> Arc<Vec<Arc<HomeRole>>> {
        self.inner.roles.snapshot()
    }

    pub fn rooms(&self) -> Arc<Vec<Arc<HomeRoom>>> {
        self.inner.rooms.snapshot()
    }

    /// Detail aggregate of the open home, if one is open.
    pub fn detail(&self) -> Option<Arc<HomeDetailResponse>> {
        self.inner.detail.borrow().clone()
    }

    pub fn subscribe_homes(&self) -> Subscription<Home> {
        Subscription::new(self.inner.homes.subscribe())
    }

    pub fn subscribe_detail(&self) -> watch::Receiver<Option<Arc<HomeDetailResponse>>> {
        self.inner.detail.subscribe()
    }

    pub fn homes_freshness(&self) -> Freshness {
        self.inner.homes_freshness.get()
    }

    pub fn rooms_freshness(&self) -> Freshness {
        self.inner.rooms_freshness.get()
    }

    pub fn detail_freshness(&self) -> Freshness {
        self.inner.detail_freshness.get()
    }

    // ━━ Home mutations ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a home, then refetch the listing.
    pub fn create_home(&self, home: HomeCreate) -> Result<MutationTicket, CoreError> {
        if home.name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "home name must not be empty".into(),
            });
        }

        let ticket = self.inner.journal.begin(format!("home {}", home.name));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.create_home(&home).await {
                Ok(_) => {
                    let _ = store.fetch_homes().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(home = %home.name, error = %err, "home creation failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Delete a home, then refetch the listing.
    pub fn delete_home(&self, home_id: i64) -> Result<MutationTicket, CoreError> {
        let ticket = self.inner.journal.begin(format!("home {home_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.delete_home(home_id).await {
                Ok(_) => {
                    let _ = store.fetch_homes().await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(home = home_id, error = %err, "home deletion failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Rename a home optimistically. The backend acknowledges without
    /// echoing the home, so the draft is promoted on success.
    pub fn rename_home(&self, home_id: i64, name: &str) -> Result<MutationTicket, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "home name must not be empty".into(),
            });
        }
        let Some(current) = self.inner.homes.get(&home_id) else {
            return Err(CoreError::NotFound {
                entity: "home",
                id: home_id.to_string(),
            });
        };

        let mut renamed = (*current).clone();
        renamed.name = name.to_owned();
        self.inner.homes.stage(&home_id, renamed);

        let ticket = self.inner.journal.begin(format!("home {home_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let name = name.to_owned();
        tokio::spawn(async move {
            match store.inner.client.rename_home(home_id, &name).await {
                Ok(_) => {
                    store.inner.homes.promote(&home_id);
                    store.refresh_detail_if_open(home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.homes.revert(&home_id);
                    warn!(home = home_id, error = %err, "home rename failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Re-address a home optimistically; acknowledged without an echo,
    /// like [`rename_home`](Self::rename_home).
    pub fn update_address(&self, home_id: i64, address: &str) -> Result<MutationTicket, CoreError> {
        let Some(current) = self.inner.homes.get(&home_id) else {
            return Err(CoreError::NotFound {
                entity: "home",
                id: home_id.to_string(),
            });
        };

        let mut readdressed = (*current).clone();
        readdressed.address = address.to_owned();
        self.inner.homes.stage(&home_id, readdressed);

        let ticket = self.inner.journal.begin(format!("home {home_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let address = address.to_owned();
        tokio::spawn(async move {
            match store.inner.client.update_home_address(home_id, &address).await {
                Ok(_) => {
                    store.inner.homes.promote(&home_id);
                    store.refresh_detail_if_open(home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    store.inner.homes.revert(&home_id);
                    warn!(home = home_id, error = %err, "home re-address failed; draft rolled back");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    // ━━ Members & permissions ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Add a member; the open home's detail is refetched so the member
    /// list reflects it before the ticket settles.
    pub fn add_member(&self, member: MemberAdd) -> Result<MutationTicket, CoreError> {
        let ticket = self
            .inner
            .journal
            .begin(format!("member {} in home {}", member.user_id, member.home_id));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.add_member(&member).await {
                Ok(_) => {
                    store.refresh_detail_if_open(member.home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(
                        user = member.user_id,
                        home = member.home_id,
                        error = %err,
                        "member addition failed"
                    );
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Grant one user one operation on one device, with an expiry.
    pub fn grant_permission(
        &self,
        home_id: i64,
        grant: PermissionGrant,
    ) -> Result<MutationTicket, CoreError> {
        let ticket = self
            .inner
            .journal
            .begin(format!("permission {} in home {home_id}", grant.id));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.grant_permission(home_id, &grant).await {
                Ok(_) => store.inner.journal.applied(mutation),
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(permission = grant.id, error = %err, "permission grant failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    pub fn revoke_permission(&self, permission_id: i64) -> Result<MutationTicket, CoreError> {
        let ticket = self
            .inner
            .journal
            .begin(format!("permission {permission_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.revoke_permission(permission_id).await {
                Ok(_) => store.inner.journal.applied(mutation),
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(permission = permission_id, error = %err, "permission revocation failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    // ━━ Rooms ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create a room in `home_id`, then refetch that home's rooms.
    pub fn create_room(&self, home_id: i64, name: &str) -> Result<MutationTicket, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "room name must not be empty".into(),
            });
        }

        let ticket = self
            .inner
            .journal
            .begin(format!("room {name} in home {home_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        let name = name.to_owned();
        tokio::spawn(async move {
            match store.inner.client.create_home_room(home_id, &name).await {
                Ok(_) => {
                    let _ = store.fetch_rooms(home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(home = home_id, room = %name, error = %err, "room creation failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Delete a room, then refetch that home's rooms.
    pub fn delete_room(&self, home_id: i64, room_id: i64) -> Result<MutationTicket, CoreError> {
        let ticket = self.inner.journal.begin(format!("room {room_id}"));
        let mutation = ticket.id();

        let store = self.clone();
        tokio::spawn(async move {
            match store.inner.client.delete_home_room(home_id, room_id).await {
                Ok(_) => {
                    let _ = store.fetch_rooms(home_id).await;
                    store.inner.journal.applied(mutation);
                }
                Err(e) => {
                    let err = CoreError::from(e);
                    warn!(home = home_id, room = room_id, error = %err, "room deletion failed");
                    store.inner.journal.reverted(mutation, err.to_string());
                }
            }
        });

        Ok(ticket)
    }

    /// Devices registered in one room of a home.
    pub async fn room_devices(
        &self,
        home_id: i64,
        room_id: i64,
    ) -> Result<Vec<DeviceInfo>, CoreError> {
        Ok(self.inner.client.room_devices(home_id, room_id).await?)
    }

    // ━━ Search ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn search_homes(&self, keyword: &str) -> Result<Vec<HomeSummary>, CoreError> {
        Ok(self.inner.client.search_homes(keyword).await?)
    }

    /// Resolve a phone number to a user for member addition.
    pub async fn search_user(&self, phone: &str) -> Result<UserSearchResponse, CoreError> {
        Ok(self.inner.client.search_user_by_phone(phone).await?)
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Refetch the detail aggregate when `home_id` is the open home.
    async fn refresh_detail_if_open(&self, home_id: i64) {
        let open = self
            .inner
            .detail
            .borrow()
            .as_ref()
            .is_some_and(|detail| detail.home.id == home_id);
        if open {
            let _ = self.open_home(home_id).await;
        }
    }
}
