use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What `identifier` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "ip")]
    Ip,
    #[sea_orm(string_value = "user_id")]
    UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AttemptType {
    #[sea_orm(string_value = "login")]
    Login,
    #[sea_orm(string_value = "refresh")]
    Refresh,
    #[sea_orm(string_value = "logout")]
    Logout,
}

/// One authentication attempt. Rows are appended and never updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Email, IP address or user id, depending on `identifier_type`
    pub identifier: String,

    pub identifier_type: IdentifierType,

    pub attempt_type: AttemptType,

    pub success: bool,

    /// Set when the attempt could be tied to an account
    pub user_id: Option<i32>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    /// Failure reason if unsuccessful
    pub error_message: Option<String>,

    pub attempted_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
