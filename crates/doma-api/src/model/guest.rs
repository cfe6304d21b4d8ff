// ── Guest & join-request domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid join-request status code {0} (expected 0, 1, or 2)")]
pub struct InvalidJoinStatus(u8);

/// Decision state of a join request, serialized as its numeric code.
///
/// The wire format is `0` pending / `1` approved / `2` rejected; once
/// decided a request does not go back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JoinStatus {
    Pending,
    Approved,
    Rejected,
}

impl JoinStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<JoinStatus> for u8 {
    fn from(status: JoinStatus) -> Self {
        match status {
            JoinStatus::Pending => 0,
            JoinStatus::Approved => 1,
            JoinStatus::Rejected => 2,
        }
    }
}

impl TryFrom<u8> for JoinStatus {
    type Error = InvalidJoinStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Rejected),
            other => Err(InvalidJoinStatus(other)),
        }
    }
}

/// A user's request to join a home, reviewed by the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub status: JoinStatus,
    pub status_name: String,
    pub record_time: DateTime<Utc>,
}
