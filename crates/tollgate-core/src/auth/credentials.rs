use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::error::AuthError;
use crate::models::user;

/// What the core needs to know about an account. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub is_active: bool,
}

impl From<user::Model> for CredentialRecord {
    fn from(user: user::Model) -> Self {
        CredentialRecord {
            user_id: user.id,
            email: user.email,
            role: user.role,
            password_hash: user.password_hash,
            is_active: user.is_active,
        }
    }
}

/// Identity store seam. The embedding service owns user records; the core
/// only looks them up.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by its login identifier (normalized email).
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, AuthError>;

    async fn find_by_id(&self, user_id: i32) -> Result<Option<CredentialRecord>, AuthError>;
}

/// `CredentialStore` over the `users` table.
#[derive(Clone)]
pub struct DbCredentialStore {
    db: DatabaseConnection,
}

impl DbCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, AuthError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(identifier))
            .one(&self.db)
            .await?;
        Ok(found.map(CredentialRecord::from))
    }

    async fn find_by_id(&self, user_id: i32) -> Result<Option<CredentialRecord>, AuthError> {
        let found = user::Entity::find_by_id(user_id).one(&self.db).await?;
        Ok(found.map(CredentialRecord::from))
    }
}
