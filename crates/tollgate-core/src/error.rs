use thiserror::Error;

/// Error taxonomy for the token and session core.
///
/// Messages are caller-facing. `InvalidCredentials` never says which part
/// of the credential was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is locked. Try again in {retry_after_secs} seconds.")]
    AccountLocked { retry_after_secs: u64 },

    #[error("Too many login attempts. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is malformed")]
    TokenMalformed,

    #[error("Token signature is invalid")]
    TokenSignatureInvalid,

    #[error("Token has been revoked")]
    TokenBlacklisted,

    #[error("Session is no longer active")]
    SessionInactive,

    #[error("Refresh token not found")]
    RefreshNotFound,

    #[error("Refresh token has already been used")]
    RefreshAlreadyRotated,

    #[error("Refresh token has been revoked")]
    RefreshRevoked,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session belongs to another user")]
    SessionForbidden,

    #[error("Token signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Credential could not be verified in time")]
    Unverifiable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Suggested HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingInput(_) => 400,
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenMalformed
            | AuthError::TokenSignatureInvalid
            | AuthError::TokenBlacklisted
            | AuthError::SessionInactive
            | AuthError::RefreshNotFound
            | AuthError::RefreshAlreadyRotated
            | AuthError::RefreshRevoked
            | AuthError::Unverifiable => 401,
            AuthError::SessionForbidden => 403,
            AuthError::SessionNotFound => 404,
            AuthError::AccountLocked { .. } => 423,
            AuthError::RateLimited { .. } => 429,
            AuthError::SignerUnavailable(_) => 503,
            AuthError::Config(_) | AuthError::Database(_) | AuthError::Internal(_) => 500,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingInput(_) => "MISSING_INPUT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::RateLimited { .. } => "RATE_LIMITED",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenMalformed => "TOKEN_MALFORMED",
            AuthError::TokenSignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            AuthError::TokenBlacklisted => "TOKEN_BLACKLISTED",
            AuthError::SessionInactive => "SESSION_INACTIVE",
            AuthError::RefreshNotFound => "REFRESH_NOT_FOUND",
            AuthError::RefreshAlreadyRotated => "REFRESH_ALREADY_ROTATED",
            AuthError::RefreshRevoked => "REFRESH_REVOKED",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::SessionForbidden => "SESSION_FORBIDDEN",
            AuthError::SignerUnavailable(_) => "SIGNER_UNAVAILABLE",
            AuthError::Unverifiable => "UNVERIFIABLE",
            AuthError::Config(_) => "CONFIG_ERROR",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Seconds the caller should wait before retrying, for lockout errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AuthError::AccountLocked { retry_after_secs }
            | AuthError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Errors that mean the service cannot authenticate anyone and should
    /// not keep serving.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::SignerUnavailable(_) | AuthError::Config(_))
    }
}
