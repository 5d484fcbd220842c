use jsonwebtoken::DecodingKey;

use crate::auth::blacklist::BlacklistStore;
use crate::auth::jwt::{decode_claims, signing_keys, Claims};
use crate::auth::refresh::{RefreshClaims, RefreshTokenStore};
use crate::auth::session::SessionRegistry;
use crate::auth::token::hash_token;
use crate::clock::SharedClock;
use crate::error::AuthError;

/// Validates presented access and refresh tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    blacklist: BlacklistStore,
    refresh_tokens: RefreshTokenStore,
    sessions: SessionRegistry,
    clock: SharedClock,
    require_active_session: bool,
}

impl TokenVerifier {
    pub fn new(
        secret: &str,
        blacklist: BlacklistStore,
        refresh_tokens: RefreshTokenStore,
        sessions: SessionRegistry,
        clock: SharedClock,
        require_active_session: bool,
    ) -> Result<Self, AuthError> {
        let (_, decoding) = signing_keys(secret)?;
        Ok(Self {
            decoding,
            blacklist,
            refresh_tokens,
            sessions,
            clock,
            require_active_session,
        })
    }

    /// Full access-token check, in order: signature, blacklist, expiry and,
    /// when enabled, the session's active flag. Garbage input is rejected
    /// before any lookup.
    pub async fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode_claims(token, &self.decoding)?;

        if self.blacklist.is_blacklisted(&claims.jti).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        if self.require_active_session && !self.sessions.is_active(&claims.session_id).await? {
            return Err(AuthError::SessionInactive);
        }

        Ok(claims)
    }

    /// Signature-checked decode that tolerates expiry. Used to log out a
    /// token that has already run out.
    pub fn decode_access(&self, token: &str) -> Result<Claims, AuthError> {
        decode_claims(token, &self.decoding)
    }

    /// Look up the stored record for a raw refresh token.
    pub async fn verify_refresh(&self, raw_token: &str) -> Result<RefreshClaims, AuthError> {
        let record = self
            .refresh_tokens
            .find_by_hash(&hash_token(raw_token))
            .await?
            .ok_or(AuthError::RefreshNotFound)?;

        RefreshClaims::from_record(&record, self.clock.now().naive_utc())
    }
}
