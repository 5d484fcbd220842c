use chrono::NaiveDateTime;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::auth::token::generate_secure_token;
use crate::clock::SharedClock;
use crate::error::AuthError;
use crate::models::session;

/// Opaque, unguessable session id.
pub fn generate_session_id() -> String {
    generate_secure_token()
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub user_id: i32,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: NaiveDateTime,
}

/// One record per logical login, independent of token material.
///
/// Does not check ownership; callers verify that a session belongs to the
/// user before deactivating it.
#[derive(Clone)]
pub struct SessionRegistry {
    db: DatabaseConnection,
    clock: SharedClock,
}

impl SessionRegistry {
    pub fn new(db: DatabaseConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub async fn create(&self, new: NewSession) -> Result<session::Model, AuthError> {
        let now = self.clock.now().naive_utc();
        let model = session::ActiveModel {
            session_id: Set(new.session_id),
            user_id: Set(new.user_id),
            device_info: Set(new.device_info),
            ip_address: Set(new.ip_address),
            user_agent: Set(new.user_agent),
            last_activity_at: Set(now),
            expires_at: Set(new.expires_at),
            is_active: Set(true),
            created_at: Set(now),
        };

        let created = model.insert(&self.db).await?;
        tracing::info!(user_id = created.user_id, session_id = %created.session_id, "session created");
        Ok(created)
    }

    pub async fn find(&self, session_id: &str) -> Result<Option<session::Model>, AuthError> {
        Ok(session::Entity::find_by_id(session_id.to_string())
            .one(&self.db)
            .await?)
    }

    /// Active and not yet expired.
    pub async fn is_active(&self, session_id: &str) -> Result<bool, AuthError> {
        let now = self.clock.now().naive_utc();
        Ok(self
            .find(session_id)
            .await?
            .is_some_and(|s| s.is_active && s.expires_at > now))
    }

    /// The user's live sessions, most recently used first.
    pub async fn list_active(&self, user_id: i32) -> Result<Vec<session::Model>, AuthError> {
        let now = self.clock.now().naive_utc();
        Ok(session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true))
            .filter(session::Column::ExpiresAt.gt(now))
            .order_by_desc(session::Column::LastActivityAt)
            .all(&self.db)
            .await?)
    }

    /// Bump `last_activity_at` on an active session.
    pub async fn touch(&self, session_id: &str) -> Result<bool, AuthError> {
        let now = self.clock.now().naive_utc();
        let result = session::Entity::update_many()
            .col_expr(session::Column::LastActivityAt, Expr::value(now))
            .filter(session::Column::SessionId.eq(session_id))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Slide an active session's expiry, e.g. to follow a rotated refresh
    /// token. Also counts as activity.
    pub async fn extend(&self, session_id: &str, expires_at: NaiveDateTime) -> Result<bool, AuthError> {
        let now = self.clock.now().naive_utc();
        let result = session::Entity::update_many()
            .col_expr(session::Column::ExpiresAt, Expr::value(expires_at))
            .col_expr(session::Column::LastActivityAt, Expr::value(now))
            .filter(session::Column::SessionId.eq(session_id))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Deactivate one session. Returns false if it was already inactive or
    /// does not exist.
    pub async fn deactivate(&self, session_id: &str) -> Result<bool, AuthError> {
        let result = session::Entity::update_many()
            .col_expr(session::Column::IsActive, Expr::value(false))
            .filter(session::Column::SessionId.eq(session_id))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(%session_id, "session deactivated");
        }
        Ok(result.rows_affected > 0)
    }

    pub async fn deactivate_all(&self, user_id: i32) -> Result<u64, AuthError> {
        let result = session::Entity::update_many()
            .col_expr(session::Column::IsActive, Expr::value(false))
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        tracing::info!(user_id, sessions = result.rows_affected, "all sessions deactivated");
        Ok(result.rows_affected)
    }

    pub async fn deactivate_all_except(
        &self,
        user_id: i32,
        keep_session_id: &str,
    ) -> Result<u64, AuthError> {
        let result = session::Entity::update_many()
            .col_expr(session::Column::IsActive, Expr::value(false))
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::SessionId.ne(keep_session_id))
            .filter(session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        tracing::info!(
            user_id,
            kept = %keep_session_id,
            sessions = result.rows_affected,
            "other sessions deactivated"
        );
        Ok(result.rows_affected)
    }

    /// Delete sessions past their expiry.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now().naive_utc();
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
