use tollgate_core::AuthError;

#[test]
fn test_status_codes() {
    let cases = [
        (AuthError::MissingInput("email".into()), 400),
        (AuthError::InvalidCredentials, 401),
        (AuthError::TokenExpired, 401),
        (AuthError::TokenMalformed, 401),
        (AuthError::TokenSignatureInvalid, 401),
        (AuthError::TokenBlacklisted, 401),
        (AuthError::SessionInactive, 401),
        (AuthError::RefreshNotFound, 401),
        (AuthError::RefreshAlreadyRotated, 401),
        (AuthError::RefreshRevoked, 401),
        (AuthError::Unverifiable, 401),
        (AuthError::SessionForbidden, 403),
        (AuthError::SessionNotFound, 404),
        (AuthError::AccountLocked { retry_after_secs: 60 }, 423),
        (AuthError::RateLimited { retry_after_secs: 60 }, 429),
        (AuthError::SignerUnavailable("no key".into()), 503),
        (AuthError::Config("bad".into()), 500),
        (AuthError::Internal("boom".into()), 500),
    ];

    for (err, status) in cases {
        assert_eq!(err.status_code(), status, "{:?}", err);
    }
}

#[test]
fn test_error_codes() {
    assert_eq!(AuthError::InvalidCredentials.error_code(), "INVALID_CREDENTIALS");
    assert_eq!(
        AuthError::RateLimited { retry_after_secs: 1 }.error_code(),
        "RATE_LIMITED"
    );
    assert_eq!(AuthError::RefreshAlreadyRotated.error_code(), "REFRESH_ALREADY_ROTATED");
    assert_eq!(AuthError::SessionInactive.error_code(), "SESSION_INACTIVE");
}

#[test]
fn test_retry_after() {
    assert_eq!(
        AuthError::AccountLocked { retry_after_secs: 90 }.retry_after(),
        Some(90)
    );
    assert_eq!(
        AuthError::RateLimited { retry_after_secs: 5 }.retry_after(),
        Some(5)
    );
    assert_eq!(AuthError::InvalidCredentials.retry_after(), None);
}

#[test]
fn test_fatal_errors() {
    assert!(AuthError::SignerUnavailable("x".into()).is_fatal());
    assert!(AuthError::Config("x".into()).is_fatal());
    assert!(!AuthError::InvalidCredentials.is_fatal());
    assert!(!AuthError::Internal("x".into()).is_fatal());
}

#[test]
fn test_database_error_converts() {
    let err: AuthError = sea_orm::DbErr::Custom("gone".into()).into();
    assert!(matches!(err, AuthError::Database(_)));
    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("gone"));
}

#[test]
fn test_messages_do_not_leak_detail() {
    assert_eq!(
        AuthError::InvalidCredentials.to_string(),
        "Invalid email or password"
    );
    assert_eq!(
        AuthError::RateLimited { retry_after_secs: 42 }.to_string(),
        "Too many login attempts. Try again in 42 seconds."
    );
}
