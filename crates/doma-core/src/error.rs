// ── Core error types ──
//
// User-facing errors from doma-core. Consumers never see raw HTTP
// statuses or JSON parse failures directly -- the `From<doma_api::Error>`
// impl translates transport-layer errors into domain-appropriate
// variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the backend: {reason}")]
    Connection { reason: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Session expired -- sign in again")]
    SessionExpired,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Rejected by the backend: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Api {
                    status: Some(404),
                    ..
                }
        )
    }

    /// The backend itself refused the operation, as opposed to the
    /// request never completing or never being sent.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Validation { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<doma_api::Error> for CoreError {
    fn from(err: doma_api::Error) -> Self {
        match err {
            doma_api::Error::Authentication { message } => CoreError::Authentication { message },
            doma_api::Error::SessionExpired => CoreError::SessionExpired,
            doma_api::Error::Transport(e) => CoreError::Connection {
                reason: e.to_string(),
            },
            doma_api::Error::InvalidUrl(e) => CoreError::Connection {
                reason: format!("invalid URL: {e}"),
            },
            doma_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            doma_api::Error::Rejected { message } => CoreError::Rejected { message },
            doma_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Malformed response: {message}"),
                status: None,
            },
        }
    }
}
