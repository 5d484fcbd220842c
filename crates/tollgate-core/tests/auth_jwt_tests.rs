use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use tollgate_core::auth::jwt::{decode_claims, signing_keys};
use tollgate_core::auth::TokenIssuer;
use tollgate_core::{AuthError, ManualClock, SharedClock, SystemClock};

const SECRET: &str = "test-secret-key-for-testing-purposes-only";

fn issuer(secret: &str) -> TokenIssuer {
    TokenIssuer::new(secret, Duration::hours(1), Arc::new(SystemClock)).expect("Failed to build issuer")
}

#[test]
fn test_issue_and_decode_token() {
    let (_, decoding) = signing_keys(SECRET).expect("keys");

    let issued = issuer(SECRET)
        .issue_access_token("42", "a@b.com", "user", "session-1")
        .expect("Failed to create token");
    assert!(!issued.token.is_empty());

    let claims = decode_claims(&issued.token, &decoding).expect("Failed to validate token");
    assert_eq!(claims.sub, "42");
    assert_eq!(claims.user_id().unwrap(), 42);
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(claims.role, "user");
    assert_eq!(claims.session_id, "session-1");
    assert_eq!(claims, issued.claims);
}

#[test]
fn test_session_id_claim_name_on_the_wire() {
    let issued = issuer(SECRET)
        .issue_access_token("1", "a@b.com", "user", "abc")
        .unwrap();

    let json = serde_json::to_value(&issued.claims).unwrap();
    assert_eq!(json["sessionId"], "abc");
    assert!(json.get("session_id").is_none());
}

#[test]
fn test_each_token_gets_unique_jti() {
    let issuer = issuer(SECRET);
    let a = issuer.issue_access_token("1", "a@b.com", "user", "s").unwrap();
    let b = issuer.issue_access_token("1", "a@b.com", "user", "s").unwrap();

    assert_ne!(a.claims.jti, b.claims.jti);
    assert_ne!(a.token, b.token);
}

#[test]
fn test_expiry_follows_injected_clock() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let clock: SharedClock = Arc::new(ManualClock::new(start));
    let issuer = TokenIssuer::new(SECRET, Duration::minutes(15), clock).unwrap();

    let issued = issuer.issue_access_token("7", "a@b.com", "admin", "s").unwrap();
    assert_eq!(issued.claims.iat, start.timestamp());
    assert_eq!(issued.claims.exp, start.timestamp() + 15 * 60);
    assert_eq!(
        issued.claims.expires_at().unwrap(),
        (start + Duration::minutes(15)).naive_utc()
    );
}

#[test]
fn test_token_with_wrong_secret_fails() {
    let issued = issuer(SECRET).issue_access_token("1", "a@b.com", "user", "s").unwrap();
    let (_, other) = signing_keys("another-secret-key-that-is-long-enough").unwrap();

    let result = decode_claims(&issued.token, &other);
    assert!(matches!(result, Err(AuthError::TokenSignatureInvalid)));
}

#[test]
fn test_invalid_token_format_fails() {
    let (_, decoding) = signing_keys(SECRET).unwrap();

    let invalid_tokens = vec![
        "not.a.token",
        "random_string",
        "",
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid",
    ];

    for token in invalid_tokens {
        let result = decode_claims(token, &decoding);
        assert!(
            matches!(result, Err(AuthError::TokenMalformed)),
            "Should be malformed: {}",
            token
        );
    }
}

#[test]
fn test_expired_token_still_decodes() {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let clock: SharedClock = Arc::new(ManualClock::new(start));
    let issued = TokenIssuer::new(SECRET, Duration::minutes(1), clock)
        .unwrap()
        .issue_access_token("1", "a@b.com", "user", "s")
        .unwrap();
    let (_, decoding) = signing_keys(SECRET).unwrap();

    let claims = decode_claims(&issued.token, &decoding).expect("expiry is checked by the verifier");
    assert_eq!(claims.sub, "1");
}

#[test]
fn test_non_numeric_subject_is_malformed() {
    let (_, decoding) = signing_keys(SECRET).unwrap();
    let claims = serde_json::json!({
        "sub": "not-a-number",
        "email": "a@b.com",
        "role": "user",
        "sessionId": "s",
        "jti": "j",
        "iat": 0,
        "exp": 4_102_444_800i64,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let decoded = decode_claims(&token, &decoding).unwrap();
    assert!(matches!(decoded.user_id(), Err(AuthError::TokenMalformed)));
}

#[test]
fn test_short_secret_is_rejected() {
    let result = TokenIssuer::new("short", Duration::hours(1), Arc::new(SystemClock));
    let err = result.err().expect("short secret must fail");
    assert!(matches!(err, AuthError::SignerUnavailable(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_zero_ttl_is_rejected() {
    let result = TokenIssuer::new(SECRET, Duration::zero(), Arc::new(SystemClock));
    assert!(matches!(result, Err(AuthError::SignerUnavailable(_))));
}
