//! Shared session-token cell.
//!
//! The token set by a successful login is read by every subsequent request
//! to build the `Authorization: Bearer` header. The cell is lock-free and
//! cloneable; all clones observe the same token.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;

/// Handle to the current session token.
///
/// Cloning is cheap and shares the underlying cell: the session store
/// writes it on login/logout, the client reads it per request, and the
/// config layer persists it across restarts.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    token: Arc<ArcSwapOption<SecretString>>,
}

impl SessionHandle {
    /// Fresh handle with no token (unauthenticated).
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle pre-loaded with a cached token (e.g. from the config file).
    pub fn with_token(token: SecretString) -> Self {
        let handle = Self::new();
        handle.set_token(token);
        handle
    }

    /// Install a new token, replacing any previous one.
    pub fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    /// Drop the token (logout).
    pub fn clear(&self) {
        self.token.store(None);
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<Arc<SecretString>> {
        self.token.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn clones_share_the_token() {
        let a = SessionHandle::new();
        let b = a.clone();
        assert!(!b.is_authenticated());

        a.set_token(SecretString::from("tok-1"));
        assert!(b.is_authenticated());
        assert_eq!(b.token().unwrap().expose_secret(), "tok-1");

        b.clear();
        assert!(!a.is_authenticated());
    }
}
