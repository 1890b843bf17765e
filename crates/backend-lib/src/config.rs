// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Sources, lowest to highest precedence: built-in defaults, `config.toml`
//! in the working directory, an explicit file passed on the command line,
//! and `LOGIN_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `LOGIN_RATE_LIMIT__MAX_ATTEMPTS=3`).
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{collections::BTreeSet, fmt, net::SocketAddr, path::Path, time::Duration};

use crate::auth::{
    password::{MAX_PASSWORD_COST, MIN_PASSWORD_COST},
    AccessRequirement, RoutePolicy, RouteRule, DEFAULT_PASSWORD_COST, DEFAULT_SESSION_TTL,
};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LOGIN_";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Paths with fixed page handlers
const PAGE_PATHS: &[&str] = &["/", "/index", "/result"];

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
    /// Key login throttling on `x-real-ip` instead of the peer address.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_proxy_headers: bool,
    /// scrypt cost factor (log2 N)
    pub password_cost: u8,
    /// Login form and redirect targets
    pub login: LoginSettings,
    /// Login throttling
    pub rate_limit: RateLimitSettings,
    /// Ordered route access rules; the first match wins. Empty means the
    /// built-in rules for the configured login and logout paths.
    pub routes: Vec<RouteRule>,
    /// Accounts created at startup
    pub seed_users: Vec<SeedUser>,
}

/// Login form field names and redirect targets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub username_field: String,
    pub password_field: String,
    pub login_path: String,
    pub success_path: String,
    /// Defaults to `{login_path}?error`
    pub failure_path: Option<String>,
    pub logout_path: String,
    pub logout_success_path: String,
}

/// Login throttling settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Consecutive failures before a client is locked out
    pub max_attempts: u32,
    /// Lockout duration in seconds
    pub lockout_secs: u64,
}

/// An account registered at startup
#[derive(Clone, Deserialize)]
pub struct SeedUser {
    pub identifier: String,
    pub secret: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            log_level: "info".to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
            cookie_name: "SESSION".to_string(),
            cookie_secure: false,
            trust_proxy_headers: false,
            password_cost: DEFAULT_PASSWORD_COST,
            login: LoginSettings::default(),
            rate_limit: RateLimitSettings::default(),
            routes: Vec::new(),
            seed_users: vec![SeedUser {
                identifier: "sample".to_string(),
                secret: "1234".to_string(),
                roles: BTreeSet::from(["ADMIN".to_string()]),
            }],
        }
    }
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            login_path: "/login".to_string(),
            success_path: "/result".to_string(),
            failure_path: None,
            logout_path: "/logout".to_string(),
            logout_success_path: "/".to_string(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: crate::auth::rate_limit::DEFAULT_MAX_ATTEMPTS,
            lockout_secs: crate::auth::rate_limit::DEFAULT_LOCKOUT_DURATION.as_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `config.toml`, an optional explicit file and the
    /// environment, then validate them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        if let Some(path) = path {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        if !(MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&self.password_cost) {
            bail!(
                "password_cost must be within {MIN_PASSWORD_COST}..={MAX_PASSWORD_COST}, got {}",
                self.password_cost
            );
        }
        if self.cookie_name.trim().is_empty() {
            bail!("cookie_name must not be empty");
        }
        if self.rate_limit.max_attempts == 0 {
            bail!("rate_limit.max_attempts must be greater than zero");
        }
        self.login.validate()?;

        for rule in &self.routes {
            if let AccessRequirement::RoleRequired(role) = &rule.requirement {
                if role.trim().is_empty() {
                    bail!("route {} requires a non-empty role", rule.pattern.as_str());
                }
            }
        }
        let policy = self.route_policy()?;
        for path in [&self.login.login_path, &self.login.logout_path] {
            if policy.requirement_for(path) != Some(&AccessRequirement::Public) {
                bail!("route rules must make {path} public");
            }
        }
        for user in &self.seed_users {
            if user.identifier.trim().is_empty() {
                bail!("seed user identifier must not be empty");
            }
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.rate_limit.lockout_secs)
    }

    /// The configured rules, or the built-in ones when none are configured
    pub fn route_policy(&self) -> Result<RoutePolicy> {
        if self.routes.is_empty() {
            RoutePolicy::demo(&self.login.login_path, &self.login.logout_path)
                .map_err(anyhow::Error::msg)
        } else {
            Ok(RoutePolicy::new(self.routes.clone()))
        }
    }
}

impl LoginSettings {
    pub fn failure_path(&self) -> String {
        self.failure_path
            .clone()
            .unwrap_or_else(|| format!("{}?error", self.login_path))
    }

    fn validate(&self) -> Result<()> {
        if self.username_field.trim().is_empty() || self.password_field.trim().is_empty() {
            bail!("login form field names must not be empty");
        }
        if self.username_field == self.password_field {
            bail!("login username and password fields must differ");
        }
        let failure_path = self.failure_path();
        for (name, path) in [
            ("login_path", &self.login_path),
            ("success_path", &self.success_path),
            ("failure_path", &failure_path),
            ("logout_path", &self.logout_path),
            ("logout_success_path", &self.logout_success_path),
        ] {
            if !path.starts_with('/') {
                bail!("login.{name} must start with '/': {path}");
            }
        }
        for (name, path) in [("login_path", &self.login_path), ("logout_path", &self.logout_path)] {
            if path.contains(['?', '*', '{']) {
                bail!("login.{name} must be a plain path: {path}");
            }
        }
        if self.login_path == self.logout_path {
            bail!("login and logout paths must differ");
        }
        for path in [&self.login_path, &self.logout_path] {
            if PAGE_PATHS.contains(&path.as_str()) {
                bail!("{path} is already served by a page route");
            }
        }
        Ok(())
    }
}
