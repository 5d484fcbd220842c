use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── user_security_settings ──
        manager
            .create_table(
                Table::create()
                    .table(UserSecuritySettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSecuritySettings::UserId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSecuritySettings::FailedLoginCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserSecuritySettings::AccountLockedUntil)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UserSecuritySettings::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ── login_attempts ──
        manager
            .create_table(
                Table::create()
                    .table(LoginAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginAttempts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginAttempts::Identifier).string().not_null())
                    .col(
                        ColumnDef::new(LoginAttempts::IdentifierType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginAttempts::AttemptType).string().not_null())
                    .col(ColumnDef::new(LoginAttempts::Success).boolean().not_null())
                    .col(ColumnDef::new(LoginAttempts::UserId).integer().null())
                    .col(ColumnDef::new(LoginAttempts::IpAddress).string().null())
                    .col(ColumnDef::new(LoginAttempts::UserAgent).string().null())
                    .col(ColumnDef::new(LoginAttempts::ErrorMessage).string().null())
                    .col(
                        ColumnDef::new(LoginAttempts::AttemptedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_identifier")
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::Identifier)
                    .col(LoginAttempts::AttemptedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_ip")
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::IpAddress)
                    .col(LoginAttempts::AttemptedAt)
                    .to_owned(),
            )
            .await?;

        // ── refresh_tokens ──
        manager
            .create_table(
                Table::create()
                    .table(RefreshTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RefreshTokens::UserId).integer().not_null())
                    .col(ColumnDef::new(RefreshTokens::SessionId).string().not_null())
                    .col(
                        ColumnDef::new(RefreshTokens::TokenHash)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(RefreshTokens::IssuedAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(RefreshTokens::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokens::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RefreshTokens::SupersededBy).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refresh_tokens_session")
                    .table(RefreshTokens::Table)
                    .col(RefreshTokens::SessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refresh_tokens_user")
                    .table(RefreshTokens::Table)
                    .col(RefreshTokens::UserId)
                    .to_owned(),
            )
            .await?;

        // ── token_blacklist ──
        manager
            .create_table(
                Table::create()
                    .table(TokenBlacklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TokenBlacklist::Jti)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TokenBlacklist::TokenHash).string().not_null())
                    .col(ColumnDef::new(TokenBlacklist::UserId).integer().not_null())
                    .col(ColumnDef::new(TokenBlacklist::Reason).string().not_null())
                    .col(
                        ColumnDef::new(TokenBlacklist::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TokenBlacklist::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ── sessions ──
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::SessionId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).integer().not_null())
                    .col(ColumnDef::new(Sessions::DeviceInfo).string().null())
                    .col(ColumnDef::new(Sessions::IpAddress).string().null())
                    .col(ColumnDef::new(Sessions::UserAgent).string().null())
                    .col(
                        ColumnDef::new(Sessions::LastActivityAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::ExpiresAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Sessions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Sessions::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_user")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TokenBlacklist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RefreshTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoginAttempts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSecuritySettings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserSecuritySettings {
    Table,
    UserId,
    FailedLoginCount,
    AccountLockedUntil,
    UpdatedAt,
}

#[derive(Iden)]
enum LoginAttempts {
    Table,
    Id,
    Identifier,
    IdentifierType,
    AttemptType,
    Success,
    UserId,
    IpAddress,
    UserAgent,
    ErrorMessage,
    AttemptedAt,
}

#[derive(Iden)]
enum RefreshTokens {
    Table,
    Id,
    UserId,
    SessionId,
    TokenHash,
    IssuedAt,
    ExpiresAt,
    Revoked,
    SupersededBy,
}

#[derive(Iden)]
enum TokenBlacklist {
    Table,
    Jti,
    TokenHash,
    UserId,
    Reason,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    SessionId,
    UserId,
    DeviceInfo,
    IpAddress,
    UserAgent,
    LastActivityAt,
    ExpiresAt,
    IsActive,
    CreatedAt,
}
