// ── Session store ──
//
// Login, logout, and registration. The bearer token lives in the
// client's shared session handle; this store keeps the human-facing
// identity next to it and validates credentials before they go out.

use std::sync::Arc;

use doma_api::ConsoleClient;
use doma_api::model::SessionRole;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::info;

use crate::error::CoreError;

/// Who is signed in, as far as the console knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: SessionRole,
}

/// Reactive store for the signed-in identity.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    client: ConsoleClient,
    identity: watch::Sender<Option<Identity>>,
}

impl SessionStore {
    pub fn new(client: ConsoleClient) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionStoreInner { client, identity }),
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Sign in with a mobile number. The phone is validated locally
    /// before the request goes out; the password is the backend's call.
    pub async fn login(
        &self,
        phone: &str,
        password: &SecretString,
    ) -> Result<Identity, CoreError> {
        validate_phone(phone)?;

        let outcome = self.inner.client.login(phone, password).await?;

        // Some deployments omit the username and role from the login
        // body; fall back to the phone and the least-privileged role.
        let identity = Identity {
            username: outcome.username.unwrap_or_else(|| phone.to_owned()),
            role: outcome.role.unwrap_or(SessionRole::Guest),
        };
        info!(username = %identity.username, role = %identity.role, "session established");
        self.inner.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Drop the token and the identity.
    pub fn logout(&self) {
        self.inner.client.session().clear();
        self.inner.identity.send_replace(None);
        info!("session cleared");
    }

    /// Create an account. Registration does not sign the user in.
    pub async fn register(
        &self,
        username: &str,
        phone: &str,
        password: &SecretString,
    ) -> Result<(), CoreError> {
        if username.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "username must not be empty".into(),
            });
        }
        validate_phone(phone)?;
        validate_password(password)?;

        self.inner.client.register(username, phone, password).await?;
        Ok(())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.borrow().clone()
    }

    pub fn subscribe_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity.subscribe()
    }

    /// True while the shared session holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.inner.client.session().is_authenticated()
    }

    pub fn role(&self) -> Option<SessionRole> {
        self.inner.identity.borrow().as_ref().map(|id| id.role)
    }
}

/// Mainland mobile number shape: 11 digits, `1` then `3`-`9`.
fn validate_phone(phone: &str) -> Result<(), CoreError> {
    let bytes = phone.as_bytes();
    let valid = bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'1'
        && matches!(bytes[1], b'3'..=b'9');
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation {
            message: format!("{phone:?} is not a valid mobile number"),
        })
    }
}

/// 8 to 18 characters drawing on at least two of digits, letters, and
/// symbols.
fn validate_password(password: &SecretString) -> Result<(), CoreError> {
    use secrecy::ExposeSecret;

    let raw = password.expose_secret();
    let length = raw.chars().count();
    if !(8..=18).contains(&length) {
        return Err(CoreError::Validation {
            message: "password must be 8 to 18 characters".into(),
        });
    }

    let has_digit = raw.chars().any(|c| c.is_ascii_digit());
    let has_letter = raw.chars().any(|c| c.is_ascii_alphabetic());
    let has_symbol = raw.chars().any(|c| !c.is_ascii_alphanumeric());
    let classes = usize::from(has_digit) + usize::from(has_letter) + usize::from(has_symbol);
    if classes < 2 {
        return Err(CoreError::Validation {
            message: "password needs at least two of digits, letters, and symbols".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation_accepts_the_mobile_shape() {
        assert!(validate_phone("13800138000").is_ok());
        assert!(validate_phone("19912345678").is_ok());
    }

    #[test]
    fn phone_validation_rejects_everything_else() {
        for phone in [
            "1380013800",   // ten digits
            "138001380001", // twelve digits
            "23800138000",  // leading 2
            "12800138000",  // second digit 2
            "1380013800a",  // letter
            "",
        ] {
            let err = validate_phone(phone).unwrap_err();
            assert!(err.to_string().contains("not a valid mobile number"));
        }
    }

    #[test]
    fn password_validation_needs_length_and_two_classes() {
        let ok = |s: &str| validate_password(&SecretString::from(s.to_owned()));

        assert!(ok("password123").is_ok());
        assert!(ok("pass@word").is_ok());
        assert!(ok("12345678").is_err()); // one class
        assert!(ok("abcdefgh").is_err()); // one class
        assert!(ok("a1b2c3").is_err()); // too short
        assert!(ok("a1b2c3d4e5f6g7h8i9j").is_err()); // nineteen chars
    }
}
