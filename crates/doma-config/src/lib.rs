//! Configuration for the Doma console.
//!
//! One TOML file under the platform config dir, layered with
//! `DOMA_`-prefixed environment variables. The `[session]` block doubles
//! as the token cache: a successful login writes the token back so the
//! next start can resume without prompting. The password is the one
//! field that never round-trips -- it can arrive from the file or the
//! environment, but [`save_config`] always leaves it out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use doma_api::model::SessionRole;
use doma_api::SessionHandle;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration for the console.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Home opened on startup.
    #[serde(default = "default_home_id")]
    pub home_id: i64,

    /// Realtime polling cadence in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Sign-in material and the cached session.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            home_id: default_home_id(),
            poll_interval_secs: default_poll_interval(),
            session: SessionConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_home_id() -> i64 {
    1
}
fn default_poll_interval() -> u64 {
    5
}

/// The `[session]` table: sign-in material plus the cached token.
///
/// `phone` and `password` feed unattended sign-in; `token`, `username`,
/// and `role` are written back after a successful login so a restart
/// can resume the session.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Mobile number to sign in with.
    pub phone: Option<String>,

    /// Password for unattended sign-in. Read from the file or the
    /// `DOMA_SESSION__PASSWORD` variable (the environment wins), and
    /// never written back out.
    #[serde(skip_serializing)]
    pub password: Option<SecretString>,

    /// Cached session token from the last login.
    pub token: Option<String>,

    /// Username the cached token belongs to.
    pub username: Option<String>,

    /// Role the cached token carries.
    pub role: Option<SessionRole>,
}

impl Config {
    /// Polling cadence as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Phone and password for unattended sign-in, when both are set.
    pub fn login_credentials(&self) -> Option<(String, SecretString)> {
        let phone = self.session.phone.clone()?;
        let password = self.session.password.clone()?;
        Some((phone, password))
    }

    /// Session handle for [`doma_api::ConsoleClient`], preloaded with
    /// the cached token when one is present.
    pub fn session_handle(&self) -> SessionHandle {
        match &self.session.token {
            Some(token) => SessionHandle::with_token(SecretString::from(token.clone())),
            None => SessionHandle::new(),
        }
    }

    /// Record a fresh login so the next start can resume it.
    pub fn cache_session(&mut self, token: &str, username: &str, role: SessionRole) {
        self.session.token = Some(token.to_owned());
        self.session.username = Some(username.to_owned());
        self.session.role = Some(role);
    }

    /// Drop the cached token and identity. The phone stays; it is
    /// configuration, not cache.
    pub fn clear_cached_session(&mut self) {
        self.session.token = None;
        self.session.username = None;
        self.session.role = None;
    }

    /// Check the fields a typo would most likely corrupt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url: url::Url = self
            .base_url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "base_url",
                reason: format!("invalid URL: {}", self.base_url),
            })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "base_url",
                reason: format!("unsupported scheme: {}", url.scheme()),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("tech", "hyperbliss", "doma").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("doma");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path plus the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from an explicit path plus the environment.
///
/// Layering, later wins: serialized defaults, then the TOML file (which
/// may be absent), then `DOMA_`-prefixed environment variables. Nested
/// keys use a double underscore: `DOMA_SESSION__PHONE` sets
/// `session.phone`, while `DOMA_BASE_URL` stays a single key.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DOMA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults when loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize the config to pretty TOML at the canonical path.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}

/// Serialize the config to pretty TOML at an explicit path. The
/// password is skipped during serialization, so a loaded-then-saved
/// config never echoes it into the file.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    // Every test that loads through figment runs inside a Jail: the
    // environment layer reads real process variables, and the Jail's
    // global lock keeps those tests from tripping over each other.

    #[test]
    fn missing_file_yields_the_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = load_config_from(Path::new("absent.toml")).unwrap();

            assert_eq!(config.base_url, "http://localhost:3000");
            assert_eq!(config.home_id, 1);
            assert_eq!(config.poll_interval(), Duration::from_secs(5));
            assert!(config.session.phone.is_none());
            assert!(config.login_credentials().is_none());
            assert!(!config.session_handle().is_authenticated());
            Ok(())
        });
    }

    #[test]
    fn file_values_override_the_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "doma.toml",
                r#"
                    base_url = "http://console.lan:8080"
                    home_id = 2

                    [session]
                    phone = "13800138000"
                    token = "cached-token"
                "#,
            )?;

            let config = load_config_from(Path::new("doma.toml")).unwrap();
            assert_eq!(config.base_url, "http://console.lan:8080");
            assert_eq!(config.home_id, 2);
            assert_eq!(config.session.phone.as_deref(), Some("13800138000"));

            // Phone alone is not enough for unattended sign-in.
            assert!(config.login_credentials().is_none());
            // The cached token is, for resuming.
            assert!(config.session_handle().is_authenticated());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "doma.toml",
                r#"
                    base_url = "http://console.lan:8080"

                    [session]
                    phone = "13800138000"
                "#,
            )?;
            jail.set_env("DOMA_BASE_URL", "http://override.lan:9090");
            jail.set_env("DOMA_SESSION__PASSWORD", "password123");

            let config = load_config_from(Path::new("doma.toml")).unwrap();
            assert_eq!(config.base_url, "http://override.lan:9090");

            let (phone, password) = config.login_credentials().unwrap();
            assert_eq!(phone, "13800138000");
            assert_eq!(password.expose_secret(), "password123");
            Ok(())
        });
    }

    #[test]
    fn save_never_writes_the_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.session.phone = Some("13800138000".into());
        config.session.password = Some(SecretString::from("hunter2abc"));
        config.cache_session("mock-token-Host", "Home Owner", SessionRole::Host);
        save_config_to(&config, &path).unwrap();

        let rendered = std::fs::read_to_string(&path).unwrap();
        assert!(rendered.contains("mock-token-Host"));
        assert!(rendered.contains("Home Owner"));
        assert!(!rendered.contains("hunter2abc"));
        assert!(!rendered.contains("password"));
    }

    #[test]
    fn reload_resumes_the_cached_session() {
        figment::Jail::expect_with(|_jail| {
            let mut config = Config::default();
            config.cache_session("mock-token-Host", "Home Owner", SessionRole::Host);
            save_config_to(&config, Path::new("config.toml")).unwrap();

            let reloaded = load_config_from(Path::new("config.toml")).unwrap();
            assert!(reloaded.session.password.is_none());
            assert_eq!(reloaded.session.username.as_deref(), Some("Home Owner"));
            assert_eq!(reloaded.session.role, Some(SessionRole::Host));
            assert!(reloaded.session_handle().is_authenticated());
            Ok(())
        });
    }

    #[test]
    fn clearing_the_cache_keeps_the_phone() {
        let mut config = Config::default();
        config.session.phone = Some("13800138000".into());
        config.cache_session("token", "Home Owner", SessionRole::Host);

        config.clear_cached_session();
        assert!(config.session.token.is_none());
        assert!(config.session.username.is_none());
        assert!(config.session.role.is_none());
        assert_eq!(config.session.phone.as_deref(), Some("13800138000"));
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut config = Config::default();
        config.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field: "base_url", .. })
        ));

        let mut config = Config::default();
        config.base_url = "ftp://console.lan".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field: "poll_interval_secs", .. })
        ));

        assert!(Config::default().validate().is_ok());
    }
}
