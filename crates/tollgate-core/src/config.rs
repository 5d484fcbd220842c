use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::error::AuthError;

/// Minimum HMAC secret length, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "tollgate-dev-secret-change-me-before-deploying";

/// Argon2id cost parameters. One value for the whole process; every
/// credential is hashed and judged against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PasswordCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Configuration for the token and session core.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Database connection URL (e.g. sqlite://tollgate.db, postgres://...)
    pub database_url: String,

    /// Upper bound on pooled connections. In-memory SQLite needs 1.
    pub max_connections: u32,

    /// HMAC secret used to sign access tokens
    pub jwt_secret: String,

    /// Access token lifetime (default: 1 hour)
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime (default: 24 hours). Must exceed the access token lifetime.
    pub refresh_token_ttl_secs: u64,

    /// Trailing window for counting failed logins per email / IP (default: 15 minutes)
    pub failure_window_secs: u64,

    /// Failures inside the window before further attempts are rejected (default: 5)
    pub max_failed_attempts: u32,

    /// Consecutive failures before the account itself is locked (default: 10)
    pub account_lock_threshold: u32,

    /// How long an account lock lasts (default: 30 minutes)
    pub account_lock_duration_secs: u64,

    /// Deadline for credential lookups and verification (default: 5 seconds)
    pub verification_timeout_ms: u64,

    /// Reject access tokens whose session has been deactivated
    pub require_active_session: bool,

    /// Revoke the whole session when a superseded refresh token is replayed
    pub revoke_session_on_replay: bool,

    /// Login attempts older than this are purged (default: 30 days)
    pub attempt_retention_secs: u64,

    /// Password hashing cost
    pub password_cost: PasswordCost,

    /// Environment: development, production, test
    pub environment: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tollgate.db?mode=rwc".to_string(),
            max_connections: 10,
            jwt_secret: DEV_SECRET.to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 86_400,
            failure_window_secs: 900,
            max_failed_attempts: 5,
            account_lock_threshold: 10,
            account_lock_duration_secs: 1800,
            verification_timeout_ms: 5000,
            require_active_session: true,
            revoke_session_on_replay: true,
            attempt_retention_secs: 30 * 86_400,
            password_cost: PasswordCost::default(),
            environment: "development".to_string(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, AuthError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Unset keys keep their
    /// defaults; set keys that fail to parse are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cost = defaults.password_cost;

        let config = Self {
            database_url: lookup("TOLLGATE_DATABASE_URL")
                .or_else(|| lookup("DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            max_connections: parse_or(&lookup, "TOLLGATE_MAX_CONNECTIONS", defaults.max_connections)?,
            jwt_secret: lookup("TOLLGATE_JWT_SECRET")
                .or_else(|| lookup("JWT_SECRET"))
                .unwrap_or(defaults.jwt_secret),
            access_token_ttl_secs: parse_or(
                &lookup,
                "TOLLGATE_ACCESS_TOKEN_TTL_SECS",
                defaults.access_token_ttl_secs,
            )?,
            refresh_token_ttl_secs: parse_or(
                &lookup,
                "TOLLGATE_REFRESH_TOKEN_TTL_SECS",
                defaults.refresh_token_ttl_secs,
            )?,
            failure_window_secs: parse_or(
                &lookup,
                "TOLLGATE_FAILURE_WINDOW_SECS",
                defaults.failure_window_secs,
            )?,
            max_failed_attempts: parse_or(
                &lookup,
                "TOLLGATE_MAX_FAILED_ATTEMPTS",
                defaults.max_failed_attempts,
            )?,
            account_lock_threshold: parse_or(
                &lookup,
                "TOLLGATE_ACCOUNT_LOCK_THRESHOLD",
                defaults.account_lock_threshold,
            )?,
            account_lock_duration_secs: parse_or(
                &lookup,
                "TOLLGATE_ACCOUNT_LOCK_DURATION_SECS",
                defaults.account_lock_duration_secs,
            )?,
            verification_timeout_ms: parse_or(
                &lookup,
                "TOLLGATE_VERIFICATION_TIMEOUT_MS",
                defaults.verification_timeout_ms,
            )?,
            require_active_session: parse_flag_or(
                &lookup,
                "TOLLGATE_REQUIRE_ACTIVE_SESSION",
                defaults.require_active_session,
            ),
            revoke_session_on_replay: parse_flag_or(
                &lookup,
                "TOLLGATE_REVOKE_SESSION_ON_REPLAY",
                defaults.revoke_session_on_replay,
            ),
            attempt_retention_secs: parse_or(
                &lookup,
                "TOLLGATE_ATTEMPT_RETENTION_SECS",
                defaults.attempt_retention_secs,
            )?,
            password_cost: PasswordCost {
                memory_kib: parse_or(&lookup, "TOLLGATE_PASSWORD_MEMORY_KIB", cost.memory_kib)?,
                iterations: parse_or(&lookup, "TOLLGATE_PASSWORD_ITERATIONS", cost.iterations)?,
                parallelism: parse_or(&lookup, "TOLLGATE_PASSWORD_PARALLELISM", cost.parallelism)?,
            },
            environment: lookup("TOLLGATE_ENVIRONMENT")
                .or_else(|| lookup("ENVIRONMENT"))
                .unwrap_or(defaults.environment),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot run safely with.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "jwt_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.is_production() && self.jwt_secret == DEV_SECRET {
            return Err(AuthError::Config(
                "jwt_secret must be set explicitly in production".to_string(),
            ));
        }
        if self.access_token_ttl_secs == 0 {
            return Err(AuthError::Config(
                "access_token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.refresh_token_ttl_secs <= self.access_token_ttl_secs {
            return Err(AuthError::Config(
                "refresh_token_ttl_secs must be longer than access_token_ttl_secs".to_string(),
            ));
        }
        if self.max_failed_attempts == 0 || self.account_lock_threshold == 0 {
            return Err(AuthError::Config(
                "lockout thresholds must be positive".to_string(),
            ));
        }
        if self.failure_window_secs == 0 {
            return Err(AuthError::Config(
                "failure_window_secs must be positive".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(AuthError::Config(
                "max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_secs as i64)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl_secs as i64)
    }

    pub fn failure_window(&self) -> Duration {
        Duration::seconds(self.failure_window_secs as i64)
    }

    pub fn account_lock_duration(&self) -> Duration {
        Duration::seconds(self.account_lock_duration_secs as i64)
    }

    pub fn attempt_retention(&self) -> Duration {
        Duration::seconds(self.attempt_retention_secs as i64)
    }

    pub fn verification_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.verification_timeout_ms)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AuthError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{} has an invalid value: {:?}", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        None => default,
    }
}
