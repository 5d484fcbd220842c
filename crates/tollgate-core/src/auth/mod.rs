pub mod blacklist;
pub mod credentials;
pub mod jwt;
pub mod ledger;
pub mod lockout;
pub mod password;
pub mod refresh;
pub mod session;
pub mod token;
pub mod verifier;

pub use blacklist::{BlacklistStore, NewBlacklistEntry};
pub use credentials::{CredentialRecord, CredentialStore, DbCredentialStore};
pub use jwt::{Claims, IssuedAccessToken, TokenIssuer};
pub use ledger::{AttemptStats, LoginAttemptLedger, NewLoginAttempt};
pub use lockout::{LockoutDecision, LockoutPolicy, LockoutSettings};
pub use password::CredentialVerifier;
pub use refresh::{IssuedRefreshToken, RefreshClaims, RefreshTokenStore};
pub use session::{NewSession, SessionRegistry};
pub use token::{generate_secure_token, hash_token};
pub use verifier::TokenVerifier;

pub use crate::models::login_attempt::{AttemptType, IdentifierType};
