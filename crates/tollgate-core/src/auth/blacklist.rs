use chrono::NaiveDateTime;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::clock::SharedClock;
use crate::error::AuthError;
use crate::models::blacklist_entry;

#[derive(Debug, Clone)]
pub struct NewBlacklistEntry {
    pub jti: String,
    pub token_hash: String,
    pub user_id: i32,
    pub reason: String,
    /// The token's own expiry
    pub expires_at: NaiveDateTime,
}

/// Revoked access-token ids, kept until the tokens would have expired.
#[derive(Clone)]
pub struct BlacklistStore {
    db: DatabaseConnection,
    clock: SharedClock,
}

impl BlacklistStore {
    pub fn new(db: DatabaseConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    /// Blacklist a token. Adding a `jti` that is already present is a no-op.
    pub async fn add(&self, entry: NewBlacklistEntry) -> Result<(), AuthError> {
        let jti = entry.jti.clone();
        let row = blacklist_entry::ActiveModel {
            jti: Set(entry.jti),
            token_hash: Set(entry.token_hash),
            user_id: Set(entry.user_id),
            reason: Set(entry.reason),
            expires_at: Set(entry.expires_at),
            created_at: Set(self.clock.now().naive_utc()),
        };

        let inserted = blacklist_entry::Entity::insert(row)
            .on_conflict(
                OnConflict::column(blacklist_entry::Column::Jti)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        match inserted {
            Ok(_) => {
                tracing::debug!(%jti, "token blacklisted");
                Ok(())
            }
            Err(DbErr::RecordNotInserted) => {
                tracing::debug!(%jti, "token already blacklisted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let entry = blacklist_entry::Entity::find_by_id(jti.to_string())
            .one(&self.db)
            .await?;
        Ok(entry.is_some())
    }

    /// Delete entries whose token has expired anyway. Safe to run
    /// concurrently; never touches an entry before its `expires_at`.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now().naive_utc();
        let result = blacklist_entry::Entity::delete_many()
            .filter(blacklist_entry::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
