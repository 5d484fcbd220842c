use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};

use crate::clock::SharedClock;
use crate::error::AuthError;
use crate::models::login_attempt::{self, AttemptType, IdentifierType};

/// An attempt about to be written to the ledger.
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub identifier: String,
    pub identifier_type: IdentifierType,
    pub attempt_type: AttemptType,
    pub success: bool,
    pub user_id: Option<i32>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub error_message: Option<String>,
}

/// Failure count for an identifier inside a window, and when the oldest of
/// those failures happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptStats {
    pub count: u64,
    pub oldest: Option<NaiveDateTime>,
}

/// Append-only record of authentication attempts.
#[derive(Clone)]
pub struct LoginAttemptLedger {
    db: DatabaseConnection,
    clock: SharedClock,
}

impl LoginAttemptLedger {
    pub fn new(db: DatabaseConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    /// Append an attempt, timestamped now.
    pub async fn record(&self, attempt: NewLoginAttempt) -> Result<login_attempt::Model, AuthError> {
        let model = login_attempt::ActiveModel {
            identifier: Set(attempt.identifier),
            identifier_type: Set(attempt.identifier_type),
            attempt_type: Set(attempt.attempt_type),
            success: Set(attempt.success),
            user_id: Set(attempt.user_id),
            ip_address: Set(attempt.ip_address),
            user_agent: Set(attempt.user_agent),
            error_message: Set(attempt.error_message),
            attempted_at: Set(self.clock.now().naive_utc()),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    /// Append an attempt; a failed write is logged and otherwise ignored so
    /// that auditing never decides an authentication outcome.
    pub async fn record_or_warn(&self, attempt: NewLoginAttempt) {
        let attempt_type = attempt.attempt_type;
        match self.record(attempt).await {
            Ok(row) => tracing::debug!(attempt_id = row.id, ?attempt_type, "recorded attempt"),
            Err(e) => tracing::warn!(error = %e, ?attempt_type, "failed to record attempt"),
        }
    }

    /// Failed login attempts for `identifier` after `since`.
    ///
    /// IP identifiers are matched against the `ip_address` of every attempt,
    /// so one address guessing across many accounts is counted together.
    pub async fn failures_since(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
        since: NaiveDateTime,
    ) -> Result<AttemptStats, AuthError> {
        let count = Self::failures_query(identifier, identifier_type, since)
            .count(&self.db)
            .await?;
        if count == 0 {
            return Ok(AttemptStats::default());
        }

        let oldest = self.failure_at(identifier, identifier_type, since, 0).await?;
        Ok(AttemptStats { count, oldest })
    }

    /// Timestamp of the failure at `position` (0 = oldest) among those
    /// counted by `failures_since`.
    pub async fn failure_at(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
        since: NaiveDateTime,
        position: u64,
    ) -> Result<Option<NaiveDateTime>, AuthError> {
        Ok(Self::failures_query(identifier, identifier_type, since)
            .order_by_asc(login_attempt::Column::AttemptedAt)
            .order_by_asc(login_attempt::Column::Id)
            .offset(position)
            .one(&self.db)
            .await?
            .map(|attempt| attempt.attempted_at))
    }

    fn failures_query(
        identifier: &str,
        identifier_type: IdentifierType,
        since: NaiveDateTime,
    ) -> Select<login_attempt::Entity> {
        let base = login_attempt::Entity::find()
            .filter(login_attempt::Column::Success.eq(false))
            .filter(login_attempt::Column::AttemptType.eq(AttemptType::Login))
            .filter(login_attempt::Column::AttemptedAt.gt(since));

        match identifier_type {
            IdentifierType::Ip => base.filter(login_attempt::Column::IpAddress.eq(identifier)),
            other => base
                .filter(login_attempt::Column::Identifier.eq(identifier))
                .filter(login_attempt::Column::IdentifierType.eq(other)),
        }
    }

    /// Most recent attempts tied to an account, newest first.
    pub async fn recent_for_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<login_attempt::Model>, AuthError> {
        Ok(login_attempt::Entity::find()
            .filter(login_attempt::Column::UserId.eq(user_id))
            .order_by_desc(login_attempt::Column::AttemptedAt)
            .order_by_desc(login_attempt::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Delete attempts older than `cutoff`.
    pub async fn purge_before(&self, cutoff: NaiveDateTime) -> Result<u64, AuthError> {
        let result = login_attempt::Entity::delete_many()
            .filter(login_attempt::Column::AttemptedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
