//! The verb surface callers use: login, refresh, logout and session
//! management. Each verb composes the components in `auth`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::auth::blacklist::{BlacklistStore, NewBlacklistEntry};
use crate::auth::credentials::{CredentialRecord, CredentialStore, DbCredentialStore};
use crate::auth::jwt::{Claims, TokenIssuer};
use crate::auth::ledger::{LoginAttemptLedger, NewLoginAttempt};
use crate::auth::lockout::{LockoutDecision, LockoutPolicy, LockoutSettings};
use crate::auth::password::CredentialVerifier;
use crate::auth::refresh::RefreshTokenStore;
use crate::auth::session::{generate_session_id, NewSession, SessionRegistry};
use crate::auth::token::hash_token;
use crate::auth::verifier::TokenVerifier;
use crate::clock::{SharedClock, SystemClock};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::login_attempt::{AttemptType, IdentifierType};

// ── Request / Response types ──

/// Credentials plus the device context they arrived with.
#[derive(Clone, Default)]
pub struct LoginRequest {
    /// Email address
    pub identifier: String,
    pub secret: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Free-form device label; defaults to the user agent
    pub device_info: Option<String>,
    /// Deadline for lookup and verification; falls back to config
    pub deadline: Option<Duration>,
}

impl LoginRequest {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_device_info(mut self, device_info: impl Into<String>) -> Self {
        self.device_info = Some(device_info.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .field("user_agent", &self.user_agent)
            .field("device_info", &self.device_info)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
    pub user_id: i32,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub last_activity_at: NaiveDateTime,
    pub is_current: bool,
}

/// Rows removed by one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub blacklist_entries: u64,
    pub refresh_tokens: u64,
    pub sessions: u64,
    pub login_attempts: u64,
}

/// Outcome of the lookup + verification phase of login.
enum Authentication {
    Verified(CredentialRecord),
    Rejected {
        user_id: Option<i32>,
        reason: &'static str,
        counts_as_failure: bool,
    },
    Locked {
        user_id: i32,
        retry_after_secs: u64,
    },
}

// ── Service ──

/// Token and session security core.
///
/// Holds no mutable in-process state; every instance is a set of handles
/// onto the same database, so any number can run side by side.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: DatabaseConnection,
    clock: SharedClock,
    credentials: Arc<dyn CredentialStore>,
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    tokens: TokenVerifier,
    refresh_tokens: RefreshTokenStore,
    blacklist: BlacklistStore,
    sessions: SessionRegistry,
    ledger: LoginAttemptLedger,
    lockout: LockoutPolicy,
}

impl AuthService {
    /// Build a service over the `users` table with the system clock.
    pub fn new(config: AuthConfig, db: DatabaseConnection) -> Result<Self, AuthError> {
        let credentials = Arc::new(DbCredentialStore::new(db.clone()));
        Self::with_parts(config, db, credentials, Arc::new(SystemClock))
    }

    /// Build a service with an external identity store and clock.
    ///
    /// Fails with `SignerUnavailable` or `Config` when the configuration
    /// cannot produce working tokens; startup should abort on either.
    pub fn with_parts(
        config: AuthConfig,
        db: DatabaseConnection,
        credentials: Arc<dyn CredentialStore>,
        clock: SharedClock,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let verifier = CredentialVerifier::new(config.password_cost)?;
        let issuer = TokenIssuer::new(&config.jwt_secret, config.access_token_ttl(), clock.clone())?;
        let refresh_tokens =
            RefreshTokenStore::new(db.clone(), clock.clone(), config.refresh_token_ttl());
        let blacklist = BlacklistStore::new(db.clone(), clock.clone());
        let sessions = SessionRegistry::new(db.clone(), clock.clone());
        let ledger = LoginAttemptLedger::new(db.clone(), clock.clone());
        let lockout = LockoutPolicy::new(
            db.clone(),
            ledger.clone(),
            clock.clone(),
            LockoutSettings::from(&config),
        );
        let tokens = TokenVerifier::new(
            &config.jwt_secret,
            blacklist.clone(),
            refresh_tokens.clone(),
            sessions.clone(),
            clock.clone(),
            config.require_active_session,
        )?;

        Ok(Self {
            config,
            db,
            clock,
            credentials,
            verifier,
            issuer,
            tokens,
            refresh_tokens,
            blacklist,
            sessions,
            ledger,
            lockout,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn credential_verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    pub fn blacklist(&self) -> &BlacklistStore {
        &self.blacklist
    }

    pub fn ledger(&self) -> &LoginAttemptLedger {
        &self.ledger
    }

    pub fn lockout(&self) -> &LockoutPolicy {
        &self.lockout
    }

    fn expires_in(&self) -> u64 {
        self.issuer.access_ttl().num_seconds().max(0) as u64
    }

    // ── Login ──

    /// Authenticate and open a new session.
    ///
    /// Unknown account, inactive account and wrong password all fail with
    /// the same `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let identifier = request.identifier.trim().to_lowercase();
        if identifier.is_empty() || request.secret.is_empty() {
            return Err(AuthError::MissingInput(
                "identifier and secret are required".to_string(),
            ));
        }

        // Throttled requests stay out of the ledger so the window can drain.
        if let LockoutDecision::Locked { retry_after_secs } = self
            .lockout
            .check_allowed(&identifier, IdentifierType::Email)
            .await?
        {
            return Err(AuthError::RateLimited { retry_after_secs });
        }

        if let Some(ip) = request.ip_address.as_deref() {
            if let LockoutDecision::Locked { retry_after_secs } =
                self.lockout.check_allowed(ip, IdentifierType::Ip).await?
            {
                return Err(AuthError::RateLimited { retry_after_secs });
            }
        }

        let deadline = request
            .deadline
            .unwrap_or_else(|| self.config.verification_timeout());
        let outcome =
            match tokio::time::timeout(deadline, self.authenticate(&identifier, &request.secret))
                .await
            {
                Ok(outcome) => outcome?,
                Err(_) => {
                    tracing::warn!(?deadline, "credential verification timed out");
                    self.record_login(&request, &identifier, None, false, Some("timeout"))
                        .await;
                    return Err(AuthError::InvalidCredentials);
                }
            };

        let record = match outcome {
            Authentication::Verified(record) => record,
            Authentication::Locked {
                user_id,
                retry_after_secs,
            } => {
                self.record_login(&request, &identifier, Some(user_id), false, Some("account_locked"))
                    .await;
                return Err(AuthError::AccountLocked { retry_after_secs });
            }
            Authentication::Rejected {
                user_id,
                reason,
                counts_as_failure,
            } => {
                if let (Some(user_id), true) = (user_id, counts_as_failure) {
                    self.lockout.record_failure(user_id).await?;
                }
                self.record_login(&request, &identifier, user_id, false, Some(reason))
                    .await;
                tracing::info!(?user_id, reason, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session_id = generate_session_id();
        let access = self.issuer.issue_access_token(
            &record.user_id.to_string(),
            &record.email,
            &record.role,
            &session_id,
        )?;
        let refresh = self.refresh_tokens.issue(record.user_id, &session_id).await?;

        self.sessions
            .create(NewSession {
                session_id: session_id.clone(),
                user_id: record.user_id,
                device_info: request.device_info.clone().or_else(|| request.user_agent.clone()),
                ip_address: request.ip_address.clone(),
                user_agent: request.user_agent.clone(),
                expires_at: refresh.record.expires_at,
            })
            .await?;

        self.lockout.record_success(record.user_id).await?;
        self.record_login(&request, &identifier, Some(record.user_id), true, None)
            .await;

        if self.verifier.needs_rehash(&record.password_hash) {
            tracing::info!(user_id = record.user_id, "stored password hash uses outdated cost");
        }
        tracing::info!(user_id = record.user_id, %session_id, "login succeeded");

        Ok(LoginResponse {
            access_token: access.token,
            refresh_token: refresh.raw_token,
            session_id,
            user_id: record.user_id,
            expires_in: self.expires_in(),
        })
    }

    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Authentication, AuthError> {
        let Some(record) = self.credentials.find_by_identifier(identifier).await? else {
            self.verifier
                .verify_off_thread(secret.to_string(), None)
                .await?;
            return Ok(Authentication::Rejected {
                user_id: None,
                reason: "unknown_account",
                counts_as_failure: false,
            });
        };

        if let LockoutDecision::Locked { retry_after_secs } =
            self.lockout.check_account_lock(record.user_id).await?
        {
            return Ok(Authentication::Locked {
                user_id: record.user_id,
                retry_after_secs,
            });
        }

        let valid = self
            .verifier
            .verify_off_thread(secret.to_string(), Some(record.password_hash.clone()))
            .await?;

        if !valid {
            return Ok(Authentication::Rejected {
                user_id: Some(record.user_id),
                reason: "invalid_password",
                counts_as_failure: true,
            });
        }
        if !record.is_active {
            return Ok(Authentication::Rejected {
                user_id: Some(record.user_id),
                reason: "inactive_account",
                counts_as_failure: false,
            });
        }

        Ok(Authentication::Verified(record))
    }

    async fn record_login(
        &self,
        request: &LoginRequest,
        identifier: &str,
        user_id: Option<i32>,
        success: bool,
        error_message: Option<&str>,
    ) {
        self.ledger
            .record_or_warn(NewLoginAttempt {
                identifier: identifier.to_string(),
                identifier_type: IdentifierType::Email,
                attempt_type: AttemptType::Login,
                success,
                user_id,
                ip_address: request.ip_address.clone(),
                user_agent: request.user_agent.clone(),
                error_message: error_message.map(str::to_string),
            })
            .await;
    }

    async fn record_token_attempt(
        &self,
        attempt_type: AttemptType,
        user_id: i32,
        success: bool,
        error_message: Option<&str>,
    ) {
        self.ledger
            .record_or_warn(NewLoginAttempt {
                identifier: user_id.to_string(),
                identifier_type: IdentifierType::UserId,
                attempt_type,
                success,
                user_id: Some(user_id),
                ip_address: None,
                user_agent: None,
                error_message: error_message.map(str::to_string),
            })
            .await;
    }

    // ── Refresh ──

    /// Rotate a refresh token and mint a new access token for the same
    /// session. Fails closed: no token is issued on any error.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::MissingInput("refresh token is required".to_string()));
        }

        let claims = match self
            .within_deadline(self.tokens.verify_refresh(refresh_token))
            .await
        {
            Ok(claims) => claims,
            Err(e) => {
                self.on_refresh_failure(refresh_token, &e).await;
                return Err(e);
            }
        };

        if !self.sessions.is_active(&claims.session_id).await? {
            self.refresh_tokens
                .revoke(claims.user_id, Some(&claims.session_id))
                .await?;
            self.record_token_attempt(AttemptType::Refresh, claims.user_id, false, Some("session_inactive"))
                .await;
            return Err(AuthError::RefreshRevoked);
        }

        let rotated = match self.refresh_tokens.rotate(refresh_token).await {
            Ok(rotated) => rotated,
            Err(e) => {
                self.on_refresh_failure(refresh_token, &e).await;
                return Err(e);
            }
        };

        let account = self
            .credentials
            .find_by_id(claims.user_id)
            .await?
            .filter(|account| account.is_active);
        let Some(account) = account else {
            self.revoke_session(claims.user_id, &claims.session_id).await?;
            self.record_token_attempt(AttemptType::Refresh, claims.user_id, false, Some("account_unavailable"))
                .await;
            return Err(AuthError::RefreshRevoked);
        };

        self.sessions
            .extend(&claims.session_id, rotated.record.expires_at)
            .await?;

        let access = self.issuer.issue_access_token(
            &account.user_id.to_string(),
            &account.email,
            &account.role,
            &claims.session_id,
        )?;

        self.record_token_attempt(AttemptType::Refresh, account.user_id, true, None)
            .await;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: rotated.raw_token,
            expires_in: self.expires_in(),
        })
    }

    async fn on_refresh_failure(&self, refresh_token: &str, error: &AuthError) {
        let record = match self.refresh_tokens.find_by_hash(&hash_token(refresh_token)).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("unknown refresh token presented");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh token lookup failed");
                return;
            }
        };

        self.record_token_attempt(
            AttemptType::Refresh,
            record.user_id,
            false,
            Some(error.error_code()),
        )
        .await;

        if matches!(error, AuthError::RefreshAlreadyRotated) {
            tracing::warn!(
                user_id = record.user_id,
                session_id = %record.session_id,
                "refresh token replay detected"
            );
            if self.config.revoke_session_on_replay {
                if let Err(e) = self.revoke_session(record.user_id, &record.session_id).await {
                    tracing::warn!(error = %e, "failed to revoke session after replay");
                }
            }
        }
    }

    // ── Logout ──

    /// End the session the access token belongs to. An expired token can
    /// still be logged out; logging out twice is not an error, and a repeat
    /// call finishes a revocation that an earlier failed call left undone.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        if access_token.trim().is_empty() {
            return Err(AuthError::MissingInput("access token is required".to_string()));
        }

        let claims = self.tokens.decode_access(access_token)?;
        let user_id = claims.user_id()?;

        self.blacklist
            .add(NewBlacklistEntry {
                jti: claims.jti.clone(),
                token_hash: hash_token(access_token),
                user_id,
                reason: "logout".to_string(),
                expires_at: claims.expires_at()?,
            })
            .await?;
        self.revoke_session(user_id, &claims.session_id).await?;

        self.record_token_attempt(AttemptType::Logout, user_id, true, None)
            .await;
        tracing::info!(user_id, session_id = %claims.session_id, "logout");
        Ok(())
    }

    /// End every session the user has.
    ///
    /// Access tokens already issued to other sessions stop verifying only
    /// when `require_active_session` is on; otherwise they run out their TTL.
    pub async fn logout_all(&self, user_id: i32) -> Result<(), AuthError> {
        let revoked = self.refresh_tokens.revoke(user_id, None).await?;
        let sessions = self.sessions.deactivate_all(user_id).await?;

        self.record_token_attempt(AttemptType::Logout, user_id, true, Some("logout_all"))
            .await;
        tracing::info!(user_id, revoked, sessions, "logout from all sessions");
        Ok(())
    }

    /// End every session except `keep_session_id`.
    pub async fn logout_others(&self, user_id: i32, keep_session_id: &str) -> Result<(), AuthError> {
        let revoked = self
            .refresh_tokens
            .revoke_all_except(user_id, keep_session_id)
            .await?;
        let sessions = self
            .sessions
            .deactivate_all_except(user_id, keep_session_id)
            .await?;

        tracing::info!(user_id, revoked, sessions, "logout from other sessions");
        Ok(())
    }

    async fn revoke_session(&self, user_id: i32, session_id: &str) -> Result<(), AuthError> {
        self.refresh_tokens.revoke(user_id, Some(session_id)).await?;
        self.sessions.deactivate(session_id).await?;
        Ok(())
    }

    // ── Sessions ──

    pub async fn list_sessions(
        &self,
        user_id: i32,
        current_session_id: Option<&str>,
    ) -> Result<Vec<SessionSummary>, AuthError> {
        let sessions = self.sessions.list_active(user_id).await?;
        Ok(sessions
            .into_iter()
            .map(|s| SessionSummary {
                is_current: current_session_id == Some(s.session_id.as_str()),
                session_id: s.session_id,
                device_info: s.device_info,
                ip_address: s.ip_address,
                last_activity_at: s.last_activity_at,
            })
            .collect())
    }

    /// End one of the user's own sessions.
    pub async fn terminate_session(&self, user_id: i32, session_id: &str) -> Result<(), AuthError> {
        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.user_id != user_id {
            tracing::warn!(user_id, owner = session.user_id, "attempt to terminate another user's session");
            return Err(AuthError::SessionForbidden);
        }

        self.revoke_session(user_id, session_id).await?;
        tracing::info!(user_id, %session_id, "session terminated");
        Ok(())
    }

    /// Mark a session as used now.
    pub async fn record_activity(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.touch(session_id).await?;
        Ok(())
    }

    // ── Verification ──

    /// Verify an access token presented on a request.
    pub async fn verify_access(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.within_deadline(self.tokens.verify_access(access_token))
            .await
    }

    async fn within_deadline<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.config.verification_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("token verification timed out");
                Err(AuthError::Unverifiable)
            }
        }
    }

    // ── Maintenance ──

    /// Ping the database.
    pub async fn health(&self) -> Result<(), AuthError> {
        self.db.ping().await?;
        Ok(())
    }

    /// Delete expired blacklist entries, refresh tokens and sessions, and
    /// login attempts past the retention window.
    pub async fn purge_expired(&self) -> Result<PurgeReport, AuthError> {
        let cutoff = self.clock.now().naive_utc() - self.config.attempt_retention();

        Ok(PurgeReport {
            blacklist_entries: self.blacklist.purge_expired().await?,
            refresh_tokens: self.refresh_tokens.purge_expired().await?,
            sessions: self.sessions.purge_expired().await?,
            login_attempts: self.ledger.purge_before(cutoff).await?,
        })
    }

    /// Run `purge_expired` on a fixed interval until the handle is aborted.
    pub fn spawn_purge_task(&self, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match service.purge_expired().await {
                    Ok(report) => tracing::debug!(?report, "purged expired auth records"),
                    Err(e) => tracing::warn!(error = %e, "purge of expired auth records failed"),
                }
            }
        })
    }
}
