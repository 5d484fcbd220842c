use chrono::{DateTime, Duration, NaiveDateTime};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::config::MIN_SECRET_LEN;
use crate::error::AuthError;

/// Access token claims. Field names are what appears on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Unique token id, the blacklist key
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, AuthError> {
        self.sub.parse().map_err(|_| AuthError::TokenMalformed)
    }

    pub fn expires_at(&self) -> Result<NaiveDateTime, AuthError> {
        DateTime::from_timestamp(self.exp, 0)
            .map(|at| at.naive_utc())
            .ok_or(AuthError::TokenMalformed)
    }
}

/// A freshly signed access token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub claims: Claims,
}

/// Build the HS256 key pair from a shared secret.
pub fn signing_keys(secret: &str) -> Result<(EncodingKey, DecodingKey), AuthError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(AuthError::SignerUnavailable(format!(
            "signing secret must be at least {} bytes",
            MIN_SECRET_LEN
        )));
    }
    Ok((
        EncodingKey::from_secret(secret.as_bytes()),
        DecodingKey::from_secret(secret.as_bytes()),
    ))
}

/// Mints signed access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    access_ttl: Duration,
    clock: SharedClock,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, clock: SharedClock) -> Result<Self, AuthError> {
        let (encoding, _) = signing_keys(secret)?;
        if access_ttl <= Duration::zero() {
            return Err(AuthError::SignerUnavailable(
                "access token lifetime must be positive".to_string(),
            ));
        }
        Ok(Self {
            encoding,
            access_ttl,
            clock,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign an access token bound to `session_id`.
    pub fn issue_access_token(
        &self,
        subject: &str,
        email: &str,
        role: &str,
        session_id: &str,
    ) -> Result<IssuedAccessToken, AuthError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            session_id: session_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::SignerUnavailable(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedAccessToken { token, claims })
    }
}

/// Check the signature and decode the claims. Expiry is deliberately not
/// checked here; callers compare `exp` against their own clock.
pub fn decode_claims(token: &str, key: &DecodingKey) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::TokenSignatureInvalid
            }
            _ => AuthError::TokenMalformed,
        })
}
