// ── Home & membership domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// A home, the scoping unit for rooms, members, devices, and security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub create_time: DateTime<Utc>,
}

/// Search-result digest of a home (no creation time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSummary {
    pub id: i64,
    pub name: String,
    pub address: String,
}

/// Room inside a home; `isDeleted` is absent in the home-detail
/// aggregate and defaults to false there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeRoom {
    pub id: i64,
    pub name: String,
    pub home_id: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Error)]
#[error("invalid role code {0} (expected 0, 1, or 2)")]
pub struct InvalidRole(u8);

/// Member role inside a home, serialized as its numeric code.
///
/// The wire format is `0` owner / `1` member / `2` guest; permission
/// checks elsewhere assume exactly this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MemberRole {
    Owner,
    Member,
    Guest,
}

impl MemberRole {
    /// Human-readable name the backend pairs with the code.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Member => "Member",
            Self::Guest => "Guest",
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl From<MemberRole> for u8 {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Owner => 0,
            MemberRole::Member => 1,
            MemberRole::Guest => 2,
        }
    }
}

impl TryFrom<u8> for MemberRole {
    type Error = InvalidRole;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Owner),
            1 => Ok(Self::Member),
            2 => Ok(Self::Guest),
            other => Err(InvalidRole(other)),
        }
    }
}

/// Member of a home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: i64,
    pub username: String,
    pub role: MemberRole,
    /// Display name supplied by the server alongside the role code.
    pub role_name: String,
}

/// The caller's role in one home (`/home/myHome`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeRole {
    pub home_id: i64,
    pub home_name: String,
    pub role: MemberRole,
    pub role_name: String,
}

/// Device digest inside a home-detail aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: i64,
    pub name: String,
    pub type_name: String,
    pub online_status: i32,
    pub active_status: i32,
}

/// Owner-granted capability: one user, one device, one operation, with
/// an expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i64,
    pub user_id: i64,
    pub home_id: i64,
    pub device_id: i64,
    pub operation_id: i64,
    pub has_permission: bool,
    pub end_time: DateTime<Utc>,
}

/// Role of the logged-in session, as returned by the login endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionRole {
    Host,
    Member,
    Guest,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn member_role_round_trips_as_code() {
        let member = Member {
            user_id: 2,
            username: "sam".into(),
            role: MemberRole::Member,
            role_name: MemberRole::Member.label().into(),
        };

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["role"], 1);

        let back: Member = serde_json::from_value(json).unwrap();
        assert_eq!(back.role, MemberRole::Member);
    }

    #[test]
    fn unknown_role_code_is_rejected() {
        let err = serde_json::from_value::<Member>(serde_json::json!({
            "userId": 1,
            "username": "x",
            "role": 7,
            "roleName": "?"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn session_role_uses_lowercase_strings() {
        assert_eq!(
            serde_json::to_string(&SessionRole::Host).unwrap(),
            "\"host\""
        );
        assert_eq!(SessionRole::Guest.to_string(), "guest");
    }
}
