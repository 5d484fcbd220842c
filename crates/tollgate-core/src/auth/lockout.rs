use chrono::{Duration, NaiveDateTime};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::auth::ledger::LoginAttemptLedger;
use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::login_attempt::IdentifierType;
use crate::models::security_settings;

/// Thresholds for both lockout mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutSettings {
    /// Trailing window for the per-identifier throttle
    pub window: Duration,
    /// Failures inside `window` that trigger the throttle
    pub max_failures: u32,
    /// Consecutive failures that lock the account itself
    pub account_lock_threshold: u32,
    pub account_lock_duration: Duration,
}

impl From<&AuthConfig> for LockoutSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            window: config.failure_window(),
            max_failures: config.max_failed_attempts,
            account_lock_threshold: config.account_lock_threshold,
            account_lock_duration: config.account_lock_duration(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutDecision {
    Allowed,
    Locked { retry_after_secs: u64 },
}

impl LockoutDecision {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockoutDecision::Locked { .. })
    }
}

/// Two independent gates in front of credential verification:
///
/// - a rolling-window throttle per email or IP, fed by the attempt ledger;
/// - a persistent per-account lock, fed by the consecutive failure count.
#[derive(Clone)]
pub struct LockoutPolicy {
    db: DatabaseConnection,
    ledger: LoginAttemptLedger,
    clock: SharedClock,
    settings: LockoutSettings,
}

impl LockoutPolicy {
    pub fn new(
        db: DatabaseConnection,
        ledger: LoginAttemptLedger,
        clock: SharedClock,
        settings: LockoutSettings,
    ) -> Self {
        Self {
            db,
            ledger,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &LockoutSettings {
        &self.settings
    }

    /// Rolling-window throttle for an email or IP address.
    pub async fn check_allowed(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
    ) -> Result<LockoutDecision, AuthError> {
        let now = self.clock.now().naive_utc();
        let since = now - self.settings.window;
        let stats = self
            .ledger
            .failures_since(identifier, identifier_type, since)
            .await?;

        if stats.count < u64::from(self.settings.max_failures) {
            return Ok(LockoutDecision::Allowed);
        }

        // Allowed again once the count drops below the threshold, i.e. when
        // the (count - max_failures + 1)-th oldest failure leaves the window.
        let excess = stats.count - u64::from(self.settings.max_failures);
        let pivot = self
            .ledger
            .failure_at(identifier, identifier_type, since, excess)
            .await?
            .unwrap_or(now);
        let retry_after_secs = (pivot + self.settings.window - now).num_seconds().max(1) as u64;

        tracing::warn!(
            ?identifier_type,
            failures = stats.count,
            retry_after_secs,
            "login throttled"
        );
        Ok(LockoutDecision::Locked { retry_after_secs })
    }

    /// Check if a user account is currently locked.
    pub async fn check_account_lock(&self, user_id: i32) -> Result<LockoutDecision, AuthError> {
        let settings = security_settings::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?;

        let now = self.clock.now().naive_utc();
        match settings.and_then(|s| s.account_locked_until) {
            Some(locked_until) if now < locked_until => {
                let remaining = (locked_until - now).num_seconds().max(1) as u64;
                Ok(LockoutDecision::Locked {
                    retry_after_secs: remaining,
                })
            }
            _ => Ok(LockoutDecision::Allowed),
        }
    }

    /// Record a failed login. Locks the account once the threshold is reached.
    pub async fn record_failure(&self, user_id: i32) -> Result<security_settings::Model, AuthError> {
        let now = self.clock.now().naive_utc();
        self.ensure_settings(user_id, now).await?;

        security_settings::Entity::update_many()
            .col_expr(
                security_settings::Column::FailedLoginCount,
                Expr::col(security_settings::Column::FailedLoginCount).add(1),
            )
            .col_expr(security_settings::Column::UpdatedAt, Expr::value(now))
            .filter(security_settings::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        let current = self.settings_for(user_id).await?.ok_or_else(|| {
            AuthError::Internal(format!("security settings missing for user {}", user_id))
        })?;

        let already_locked = current.account_locked_until.is_some_and(|until| until > now);
        if current.failed_login_count < self.settings.account_lock_threshold as i32 || already_locked
        {
            return Ok(current);
        }

        let locked_until = now + self.settings.account_lock_duration;
        security_settings::Entity::update_many()
            .col_expr(
                security_settings::Column::AccountLockedUntil,
                Expr::value(Some(locked_until)),
            )
            .filter(security_settings::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        tracing::warn!(
            user_id,
            failures = current.failed_login_count,
            %locked_until,
            "account locked"
        );

        Ok(security_settings::Model {
            account_locked_until: Some(locked_until),
            ..current
        })
    }

    /// Reset the failure count and clear any lock on successful login.
    pub async fn record_success(&self, user_id: i32) -> Result<(), AuthError> {
        let now = self.clock.now().naive_utc();
        security_settings::Entity::update_many()
            .col_expr(security_settings::Column::FailedLoginCount, Expr::value(0))
            .col_expr(
                security_settings::Column::AccountLockedUntil,
                Expr::value(Option::<NaiveDateTime>::None),
            )
            .col_expr(security_settings::Column::UpdatedAt, Expr::value(now))
            .filter(security_settings::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn settings_for(
        &self,
        user_id: i32,
    ) -> Result<Option<security_settings::Model>, AuthError> {
        Ok(security_settings::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?)
    }

    async fn ensure_settings(&self, user_id: i32, now: NaiveDateTime) -> Result<(), AuthError> {
        let row = security_settings::ActiveModel {
            user_id: Set(user_id),
            failed_login_count: Set(0),
            account_locked_until: Set(None),
            updated_at: Set(now),
        };

        let inserted = security_settings::Entity::insert(row)
            .on_conflict(
                OnConflict::column(security_settings::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        match inserted {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
