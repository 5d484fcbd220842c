use chrono::{Duration, NaiveDateTime};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::auth::token::{generate_secure_token, hash_token};
use crate::clock::SharedClock;
use crate::error::AuthError;
use crate::models::refresh_token;

/// What a valid refresh token stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub token_id: String,
    pub user_id: i32,
    pub session_id: String,
    pub expires_at: NaiveDateTime,
}

impl RefreshClaims {
    /// Accept a stored record only if it is neither revoked nor expired.
    /// A revoked record with a successor was consumed by rotation.
    pub fn from_record(record: &refresh_token::Model, now: NaiveDateTime) -> Result<Self, AuthError> {
        if record.revoked {
            return Err(if record.superseded_by.is_some() {
                AuthError::RefreshAlreadyRotated
            } else {
                AuthError::RefreshRevoked
            });
        }
        if record.expires_at <= now {
            return Err(AuthError::RefreshRevoked);
        }
        Ok(Self {
            token_id: record.id.clone(),
            user_id: record.user_id,
            session_id: record.session_id.clone(),
            expires_at: record.expires_at,
        })
    }
}

/// A refresh token handed out once. `raw_token` goes to the client and is
/// never stored; `record` holds its hash.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub raw_token: String,
    pub record: refresh_token::Model,
}

/// Server-side refresh tokens with atomic rotation.
#[derive(Clone)]
pub struct RefreshTokenStore {
    db: DatabaseConnection,
    clock: SharedClock,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(db: DatabaseConnection, clock: SharedClock, ttl: Duration) -> Self {
        Self { db, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue the first refresh token for a session. Any token still active
    /// for the session is revoked in the same transaction so a session never
    /// has two.
    pub async fn issue(&self, user_id: i32, session_id: &str) -> Result<IssuedRefreshToken, AuthError> {
        let txn = self.db.begin().await?;

        refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::SessionId.eq(session_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&txn)
            .await?;

        let issued = self
            .insert_record(&txn, Uuid::new_v4().to_string(), user_id, session_id)
            .await?;
        txn.commit().await?;

        Ok(issued)
    }

    /// Exchange a raw refresh token for its successor.
    ///
    /// The conditional update is the first statement of the transaction, so
    /// the write lock is held before anything is read and concurrent callers
    /// queue behind it instead of failing on lock upgrade. The presented row
    /// is flipped to `revoked` with `superseded_by` set only if it is still
    /// unrevoked and unexpired; when no row matches, the stored record
    /// decides the error and a loser of a race sees `RefreshAlreadyRotated`.
    pub async fn rotate(&self, raw_token: &str) -> Result<IssuedRefreshToken, AuthError> {
        let now = self.clock.now().naive_utc();
        let token_hash = hash_token(raw_token);
        let successor_id = Uuid::new_v4().to_string();

        let txn = self.db.begin().await?;

        let consumed = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .col_expr(
                refresh_token::Column::SupersededBy,
                Expr::value(Some(successor_id.clone())),
            )
            .filter(refresh_token::Column::TokenHash.eq(token_hash.as_str()))
            .filter(refresh_token::Column::Revoked.eq(false))
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .exec(&txn)
            .await?;

        if consumed.rows_affected == 0 {
            txn.rollback().await?;
            return Err(self.rotation_refused(&token_hash, now).await);
        }

        let current = refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| AuthError::Internal("rotated refresh token vanished".to_string()))?;

        let successor = self
            .insert_record(&txn, successor_id, current.user_id, &current.session_id)
            .await?;
        txn.commit().await?;

        tracing::debug!(
            user_id = current.user_id,
            session_id = %current.session_id,
            "refresh token rotated"
        );
        Ok(successor)
    }

    /// Why a rotation matched no row.
    async fn rotation_refused(&self, token_hash: &str, now: NaiveDateTime) -> AuthError {
        let record = match self.find_by_hash(token_hash).await {
            Ok(Some(record)) => record,
            Ok(None) => return AuthError::RefreshNotFound,
            Err(e) => return e,
        };

        match RefreshClaims::from_record(&record, now) {
            Err(e) => e,
            // Valid on re-read: a concurrent rotation has not settled yet.
            Ok(_) => {
                tracing::warn!(
                    user_id = record.user_id,
                    session_id = %record.session_id,
                    "refresh token consumed by a concurrent rotation"
                );
                AuthError::RefreshAlreadyRotated
            }
        }
    }

    /// Revoke one session's tokens, or every token the user has when
    /// `session_id` is `None`. Revocation is never undone.
    pub async fn revoke(&self, user_id: i32, session_id: Option<&str>) -> Result<u64, AuthError> {
        let mut update = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::Revoked.eq(false));

        if let Some(session_id) = session_id {
            update = update.filter(refresh_token::Column::SessionId.eq(session_id));
        }

        let result = update.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    /// Revoke every token the user has outside `keep_session_id`.
    pub async fn revoke_all_except(&self, user_id: i32, keep_session_id: &str) -> Result<u64, AuthError> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::SessionId.ne(keep_session_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<refresh_token::Model>, AuthError> {
        Ok(refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await?)
    }

    /// Non-revoked, unexpired tokens held by the user.
    pub async fn count_active(&self, user_id: i32) -> Result<u64, AuthError> {
        let now = self.clock.now().naive_utc();
        Ok(refresh_token::Entity::find()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await?)
    }

    /// Delete tokens past their expiry.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now().naive_utc();
        let result = refresh_token::Entity::delete_many()
            .filter(refresh_token::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn insert_record<C>(
        &self,
        conn: &C,
        id: String,
        user_id: i32,
        session_id: &str,
    ) -> Result<IssuedRefreshToken, AuthError>
    where
        C: ConnectionTrait,
    {
        let raw_token = generate_secure_token();
        let now = self.clock.now().naive_utc();

        let model = refresh_token::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            session_id: Set(session_id.to_string()),
            token_hash: Set(hash_token(&raw_token)),
            issued_at: Set(now),
            expires_at: Set(now + self.ttl),
            revoked: Set(false),
            superseded_by: Set(None),
        };

        let record = model.insert(conn).await?;
        Ok(IssuedRefreshToken { raw_token, record })
    }
}
