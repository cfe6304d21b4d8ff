// ── Auth family ──

use axum::Json;
use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use doma_api::model::SessionRole;
use doma_api::types::{Ack, LoginResponse, UserSearchResponse};
use serde::Deserialize;

struct Account {
    phone: &'static str,
    username: &'static str,
    role: SessionRole,
    user_id: i64,
}

/// The three fixture accounts, one per role. All share [`PASSWORD`].
const ACCOUNTS: [Account; 3] = [
    Account {
        phone: "13800138000",
        username: "Home Owner",
        role: SessionRole::Host,
        user_id: 1,
    },
    Account {
        phone: "13800138001",
        username: "Family Member",
        role: SessionRole::Member,
        user_id: 2,
    },
    Account {
        phone: "13800138002",
        username: "Guest User",
        role: SessionRole::Guest,
        user_id: 3,
    },
];

const PASSWORD: &str = "password123";

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    phone: String,
    password: String,
}

/// A refused login is still a 200; the missing `token` is the signal.
pub(crate) async fn login(Json(body): Json<LoginBody>) -> Response {
    match ACCOUNTS.iter().find(|account| account.phone == body.phone) {
        Some(account) if body.password == PASSWORD => Json(LoginResponse {
            token: Some(format!("mock-token-{}", account.role)),
            username: Some(account.username.to_owned()),
            role: Some(account.role),
            message: Some("Login successful".to_owned()),
        })
        .into_response(),
        _ => Json(LoginResponse {
            token: None,
            username: None,
            role: None,
            message: Some("wrong phone number or password".to_owned()),
        })
        .into_response(),
    }
}

#[derive(Deserialize)]
pub(crate) struct RegisterBody {
    username: String,
}

/// Registration always succeeds; no account table is updated.
pub(crate) async fn register(Json(body): Json<RegisterBody>) -> Response {
    Json(Ack::new(format!("Registered {}", body.username))).into_response()
}

#[derive(Deserialize)]
pub(crate) struct PhoneQuery {
    phone: String,
}

/// A miss is a 200 with `status: "error"`, not an HTTP failure.
pub(crate) async fn search_user(Query(query): Query<PhoneQuery>) -> Response {
    match ACCOUNTS.iter().find(|account| account.phone == query.phone) {
        Some(account) => Json(UserSearchResponse {
            status: "success".to_owned(),
            name: Some(account.username.to_owned()),
            user_id: Some(account.user_id),
            message: None,
        })
        .into_response(),
        None => Json(UserSearchResponse {
            status: "error".to_owned(),
            name: None,
            user_id: None,
            message: Some("user not found".to_owned()),
        })
        .into_response(),
    }
}
