use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Refresh token entity for rotation. Only the SHA-256 of the raw token
/// is stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who owns this refresh token
    pub user_id: i32,

    /// The session this token keeps alive
    pub session_id: String,

    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub issued_at: NaiveDateTime,

    pub expires_at: NaiveDateTime,

    /// Whether this token has been revoked or rotated away
    #[sea_orm(default_value = false)]
    pub revoked: bool,

    /// Id of the token that replaced this one on rotation
    pub superseded_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
