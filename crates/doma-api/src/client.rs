// Hand-crafted async HTTP client for the Doma console API.
//
// Two response regimes: the console family (devices, groups, scenes,
// rooms, websocket-url) wraps bodies in {success, data, message}, the
// home/guest/security/telemetry families return their shapes bare.
// Auth: Bearer token from the shared SessionHandle, set by login().

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::model::{
    AlarmRecord, DashboardData, Device, DeviceGroup, DeviceInfo, DevicePatch, EnergyDistribution,
    Home, HomeRole, HomeRoom, HomeSummary, JoinRequest, Room, Scene, SecuritySensor,
    SecurityStatus, TemperatureTrend,
};
use crate::session::SessionHandle;
use crate::types::{
    AccessibleDevicesResponse, Ack, AlarmQuery, BatchUpdate, Envelope, GroupCreate, GroupPatch,
    GuestPermissionInfoResponse, HomeCreate, HomeDetailResponse, HomeReadingsResponse,
    HomeRoomsResponse, HomeSearchResponse, HomesResponse, JoinDecision, JoinRequestsResponse,
    LatestReadingResponse, LoginOutcome, LoginResponse, MemberAdd, MyHomeResponse,
    PermissionCheckResponse, PermissionGrant, ReadingHistoryResponse, RealtimeReadingResponse,
    RoomDevicesResponse, SceneCreate, ScenePatch, UserSearchResponse, WebsocketUrlResponse,
};

// ── Error response shape from the console API ────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Doma console API.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// session handle, so a login through one clone authenticates all.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl ConsoleClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client with a default `reqwest` stack against `base_url`.
    pub fn new(base_url: &str, session: SessionHandle) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("doma/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::from_reqwest(http, base_url, session)
    }

    /// Wrap an existing `reqwest::Client` (caller controls TLS, proxies,
    /// timeouts).
    pub fn from_reqwest(
        http: reqwest::Client,
        base_url: &str,
        session: SessionHandle,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Session cell shared with stores and the config layer.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Ensure a trailing slash so `Url::join` treats the last path
    /// segment as a directory.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        if raw.ends_with('/') {
            Ok(Url::parse(raw)?)
        } else {
            Ok(Url::parse(&format!("{raw}/"))?)
        }
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"devices/light-1"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/`, so joining relative paths works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }

    /// Attach the bearer token when the shared session holds one.
    fn authed(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let Some(token) = self.session.token() else {
            return Ok(request);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("session token is not a valid header value: {e}"),
            })?;
        value.set_sensitive(true);
        Ok(request.header(AUTHORIZATION, value))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url}");

        let resp = self.authed(self.http.get(url))?.send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url} params={params:?}");

        let resp = self.authed(self.http.get(url))?.query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");

        let resp = self.authed(self.http.post(url))?.json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");

        let resp = self.authed(self.http.post(url))?.send().await?;
        self.handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("PATCH {url}");

        let resp = self.authed(self.http.patch(url))?.json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete_with_response<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("DELETE {url}");

        let resp = self.authed(self.http.delete(url))?.send().await?;
        self.handle_response(resp).await
    }

    async fn delete_with_body<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("DELETE {url}");

        let resp = self
            .authed(self.http.delete(url))?
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ── Envelope unwrapping (console family) ─────────────────────────

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.get::<Envelope<T>>(path).await?.into_data()
    }

    async fn post_data<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.post::<Envelope<T>, B>(path, body).await?.into_data()
    }

    async fn post_data_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.post_empty::<Envelope<T>>(path).await?.into_data()
    }

    async fn patch_data<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.patch::<Envelope<T>, B>(path, body).await?.into_data()
    }

    async fn delete_enveloped(&self, path: &str) -> Result<(), Error> {
        self.delete_with_response::<Envelope<serde_json::Value>>(path)
            .await?
            .into_ack()
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                // Char-based cut; a byte index could split a UTF-8 sequence.
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::SessionExpired;
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Auth ─────────────────────────────────────────────────────────

    /// Log in with phone + password. A response carrying a token is a
    /// success (the token is stored in the session handle); a response
    /// without one is refused credentials, whatever the HTTP status.
    pub async fn login(&self, phone: &str, password: &SecretString) -> Result<LoginOutcome, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            phone: &'a str,
            password: &'a str,
        }

        let resp: LoginResponse = self
            .post(
                "auth/login",
                &Body {
                    phone,
                    password: password.expose_secret(),
                },
            )
            .await?;

        match resp.token {
            Some(token) => {
                self.session.set_token(SecretString::from(token));
                Ok(LoginOutcome {
                    username: resp.username,
                    role: resp.role,
                    message: resp.message,
                })
            }
            None => Err(Error::Authentication {
                message: resp
                    .message
                    .unwrap_or_else(|| "login refused without a reason".to_owned()),
            }),
        }
    }

    pub async fn register(
        &self,
        username: &str,
        phone: &str,
        password: &SecretString,
    ) -> Result<Ack, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            username: &'a str,
            phone: &'a str,
            password: &'a str,
        }

        self.post(
            "auth/register",
            &Body {
                username,
                phone,
                password: password.expose_secret(),
            },
        )
        .await
    }

    /// Resolve a phone number to a user; a `status: "error"` body
    /// becomes [`Error::Rejected`].
    pub async fn search_user_by_phone(&self, phone: &str) -> Result<UserSearchResponse, Error> {
        let resp: UserSearchResponse = self
            .get_with_params("auth/search-user-by-phone", &[("phone", phone.to_owned())])
            .await?;

        if resp.status == "error" {
            return Err(Error::Rejected {
                message: resp
                    .message
                    .unwrap_or_else(|| "user not found".to_owned()),
            });
        }
        Ok(resp)
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        self.get_data("devices").await
    }

    pub async fn get_device(&self, id: &str) -> Result<Device, Error> {
        self.get_data(&format!("devices/{id}")).await
    }

    /// Partial update; the response echoes the full device with a
    /// server-refreshed `lastUpdate`.
    pub async fn update_device(&self, id: &str, patch: &DevicePatch) -> Result<Device, Error> {
        self.patch_data(&format!("devices/{id}"), patch).await
    }

    /// Apply several partial updates in one round trip. Unknown ids are
    /// skipped; only matched devices come back.
    pub async fn batch_update_devices(
        &self,
        updates: &[BatchUpdate],
    ) -> Result<Vec<Device>, Error> {
        self.post_data("devices/batch-update", &updates).await
    }

    // ── Device groups ────────────────────────────────────────────────

    pub async fn list_groups(&self) -> Result<Vec<DeviceGroup>, Error> {
        self.get_data("device-groups").await
    }

    pub async fn create_group(&self, group: &GroupCreate) -> Result<DeviceGroup, Error> {
        self.post_data("device-groups", group).await
    }

    pub async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<DeviceGroup, Error> {
        self.patch_data(&format!("device-groups/{id}"), patch).await
    }

    pub async fn delete_group(&self, id: &str) -> Result<(), Error> {
        self.delete_enveloped(&format!("device-groups/{id}")).await
    }

    /// Apply the group's action map; returns every device it touched.
    pub async fn execute_group(&self, id: &str) -> Result<Vec<Device>, Error> {
        self.post_data_empty(&format!("device-groups/{id}/execute"))
            .await
    }

    // ── Scenes ───────────────────────────────────────────────────────

    pub async fn list_scenes(&self) -> Result<Vec<Scene>, Error> {
        self.get_data("scenes").await
    }

    pub async fn create_scene(&self, scene: &SceneCreate) -> Result<Scene, Error> {
        self.post_data("scenes", scene).await
    }

    pub async fn update_scene(&self, id: &str, patch: &ScenePatch) -> Result<Scene, Error> {
        self.patch_data(&format!("scenes/{id}"), patch).await
    }

    pub async fn delete_scene(&self, id: &str) -> Result<(), Error> {
        self.delete_enveloped(&format!("scenes/{id}")).await
    }

    /// Apply the scene's action map; returns every device it touched.
    /// The server flips the scene active and resets it on its own timer.
    pub async fn execute_scene(&self, id: &str) -> Result<Vec<Device>, Error> {
        self.post_data_empty(&format!("scenes/{id}/execute")).await
    }

    // ── Rooms & discovery ────────────────────────────────────────────

    pub async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        self.get_data("rooms").await
    }

    /// Discover the push-channel endpoint advertised by the server.
    pub async fn websocket_url(&self) -> Result<String, Error> {
        let resp: WebsocketUrlResponse = self.get_data("websocket-url").await?;
        Ok(resp.url)
    }

    // ── Homes ────────────────────────────────────────────────────────

    pub async fn list_homes(&self) -> Result<Vec<Home>, Error> {
        let resp: HomesResponse = self.get("home/get").await?;
        Ok(resp.homes)
    }

    /// Home aggregate: rooms, members, and device digests in one call.
    pub async fn home_detail(&self, home_id: i64) -> Result<HomeDetailResponse, Error> {
        self.get(&format!("home/view/{home_id}")).await
    }

    /// The caller's role in every home they belong to.
    pub async fn my_home(&self) -> Result<Vec<HomeRole>, Error> {
        let resp: MyHomeResponse = self.get("home/myHome").await?;
        Ok(resp.home)
    }

    pub async fn search_homes(&self, keyword: &str) -> Result<Vec<HomeSummary>, Error> {
        let resp: HomeSearchResponse = self
            .get_with_params("home/search", &[("keyword", keyword.to_owned())])
            .await?;
        Ok(resp.homes)
    }

    pub async fn create_home(&self, home: &HomeCreate) -> Result<Ack, Error> {
        self.post("home/create", home).await
    }

    pub async fn delete_home(&self, home_id: i64) -> Result<Ack, Error> {
        self.delete_with_response(&format!("home/delete/{home_id}"))
            .await
    }

    pub async fn rename_home(&self, home_id: i64, name: &str) -> Result<Ack, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }

        self.post(&format!("home/{home_id}/updateName"), &Body { name })
            .await
    }

    pub async fn update_home_address(&self, home_id: i64, address: &str) -> Result<Ack, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            address: &'a str,
        }

        self.post(&format!("home/{home_id}/updateAddress"), &Body { address })
            .await
    }

    // ── Home rooms ───────────────────────────────────────────────────

    pub async fn create_home_room(&self, home_id: i64, name: &str) -> Result<Ack, Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            home_id: i64,
            name: &'a str,
        }

        self.post(
            &format!("home/{home_id}/room/create"),
            &Body { home_id, name },
        )
        .await
    }

    pub async fn list_home_rooms(&self, home_id: i64) -> Result<Vec<HomeRoom>, Error> {
        let resp: HomeRoomsResponse = self.get(&format!("home/{home_id}/room/list")).await?;
        Ok(resp.rooms)
    }

    pub async fn delete_home_room(&self, home_id: i64, room_id: i64) -> Result<Ack, Error> {
        #[derive(Serialize)]
        struct Body {
            id: i64,
        }

        self.delete_with_body(&format!("home/{home_id}/room/delete"), &Body { id: room_id })
            .await
    }

    /// Devices registered in one room of a home.
    pub async fn room_devices(&self, home_id: i64, room_id: i64) -> Result<Vec<DeviceInfo>, Error> {
        #[derive(Serialize)]
        struct Body {
            id: i64,
        }

        let resp: RoomDevicesResponse = self
            .post(&format!("home/{home_id}/room/device"), &Body { id: room_id })
            .await?;
        Ok(resp.devices)
    }

    // ── Members & permissions ────────────────────────────────────────

    pub async fn add_member(&self, member: &MemberAdd) -> Result<Ack, Error> {
        self.post("home/member/add", member).await
    }

    pub async fn grant_permission(
        &self,
        home_id: i64,
        grant: &PermissionGrant,
    ) -> Result<Ack, Error> {
        self.post(&format!("permission/{home_id}/add"), grant).await
    }

    pub async fn revoke_permission(&self, permission_id: i64) -> Result<Ack, Error> {
        #[derive(Serialize)]
        struct Body {
            id: i64,
        }

        self.delete_with_body("permission/cancel", &Body { id: permission_id })
            .await
    }

    // ── Security ─────────────────────────────────────────────────────

    pub async fn list_security_sensors(&self, home_id: i64) -> Result<Vec<SecuritySensor>, Error> {
        self.get(&format!("home/{home_id}/security/sensors")).await
    }

    pub async fn list_alarms(
        &self,
        home_id: i64,
        query: &AlarmQuery,
    ) -> Result<Vec<AlarmRecord>, Error> {
        let path = format!("home/{home_id}/security/alarms");
        let params = query.to_params();
        if params.is_empty() {
            self.get(&path).await
        } else {
            self.get_with_params(&path, &params).await
        }
    }

    /// Mark a pending alarm confirmed. Re-resolving an already resolved
    /// alarm is rejected by the server.
    pub async fn confirm_alarm(&self, home_id: i64, alarm_id: i64) -> Result<Ack, Error> {
        self.post_data_empty(&format!("home/{home_id}/security/alarms/{alarm_id}/confirm"))
            .await
    }

    /// Mark a pending alarm ignored. Same transition rules as confirm.
    pub async fn ignore_alarm(&self, home_id: i64, alarm_id: i64) -> Result<Ack, Error> {
        self.post_data_empty(&format!("home/{home_id}/security/alarms/{alarm_id}/ignore"))
            .await
    }

    // ── Guests ───────────────────────────────────────────────────────

    pub async fn guest_accessible_devices(
        &self,
        user_id: i64,
        home_id: i64,
    ) -> Result<AccessibleDevicesResponse, Error> {
        self.get(&format!("guest/{user_id}/home/{home_id}/accessible-devices"))
            .await
    }

    pub async fn check_guest_permission(
        &self,
        user_id: i64,
        home_id: i64,
        device_id: i64,
        operation_id: i64,
    ) -> Result<PermissionCheckResponse, Error> {
        self.get(&format!(
            "guest/{user_id}/home/{home_id}/device/{device_id}/operation/{operation_id}/check"
        ))
        .await
    }

    pub async fn guest_permission_info(&self) -> Result<GuestPermissionInfoResponse, Error> {
        self.get("guest/permission-info").await
    }

    // ── Join requests ────────────────────────────────────────────────

    pub async fn submit_join_request(&self, home_id: i64) -> Result<Ack, Error> {
        self.post_empty(&format!("home/{home_id}/request/put"))
            .await
    }

    pub async fn list_join_requests(&self, home_id: i64) -> Result<Vec<JoinRequest>, Error> {
        let resp: JoinRequestsResponse = self
            .get(&format!("home/{home_id}/request/receive"))
            .await?;
        Ok(resp.requests)
    }

    pub async fn handle_join_request(
        &self,
        home_id: i64,
        decision: &JoinDecision,
    ) -> Result<Ack, Error> {
        self.post(&format!("home/{home_id}/request/receive/handle"), decision)
            .await
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub async fn latest_reading(&self, device_id: i64) -> Result<LatestReadingResponse, Error> {
        self.get(&format!("api/sensor/device/{device_id}/latest"))
            .await
    }

    pub async fn realtime_reading(&self, device_id: i64) -> Result<RealtimeReadingResponse, Error> {
        self.get(&format!("api/sensor/device/{device_id}/realtime"))
            .await
    }

    /// Reading history, newest first; the server defaults to 10 entries
    /// when `limit` is unset.
    pub async fn reading_history(
        &self,
        device_id: i64,
        limit: Option<u32>,
    ) -> Result<ReadingHistoryResponse, Error> {
        let path = format!("api/sensor/device/{device_id}/history");
        match limit {
            Some(limit) => {
                self.get_with_params(&path, &[("limit", limit.to_string())])
                    .await
            }
            None => self.get(&path).await,
        }
    }

    pub async fn home_readings(&self, home_id: i64) -> Result<HomeReadingsResponse, Error> {
        self.get(&format!("api/sensor/home/{home_id}/all")).await
    }

    // ── Dashboard ────────────────────────────────────────────────────

    pub async fn dashboard_overview(&self) -> Result<DashboardData, Error> {
        self.get("api/dashboard/overview").await
    }

    /// Hourly temperature trend ending now; the server defaults to 24
    /// points when `hours` is unset.
    pub async fn temperature_trend(&self, hours: Option<u32>) -> Result<TemperatureTrend, Error> {
        match hours {
            Some(hours) => {
                self.get_with_params(
                    "api/dashboard/temperature-trend",
                    &[("hours", hours.to_string())],
                )
                .await
            }
            None => self.get("api/dashboard/temperature-trend").await,
        }
    }

    pub async fn energy_distribution(&self) -> Result<Vec<EnergyDistribution>, Error> {
        self.get("api/dashboard/energy-distribution").await
    }

    pub async fn security_status(&self) -> Result<SecurityStatus, Error> {
        self.get("api/dashboard/security-status").await
    }
}
