use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One logical login (device / IP / activity). Outlives the refresh
/// tokens that are rotated under it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,

    /// The user who owns this session
    pub user_id: i32,

    pub device_info: Option<String>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub last_activity_at: NaiveDateTime,

    pub expires_at: NaiveDateTime,

    pub is_active: bool,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
