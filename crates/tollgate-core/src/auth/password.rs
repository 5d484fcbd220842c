use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordCost;
use crate::error::AuthError;

const TIMING_EQUALIZER: &str = "tollgate-unknown-account";

/// Checks plaintext secrets against stored argon2id hashes.
///
/// The cost parameters are fixed at construction from configuration.
/// Verification itself uses whatever parameters are embedded in the stored
/// hash, so older hashes keep working; `needs_rehash` reports them.
#[derive(Clone)]
pub struct CredentialVerifier {
    params: Params,
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(cost: PasswordCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::Config(format!("Invalid password cost: {}", e)))?;

        let mut verifier = Self {
            params,
            dummy_hash: String::new(),
        };
        verifier.dummy_hash = verifier.hash(TIMING_EQUALIZER)?;
        Ok(verifier)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext secret with the configured cost.
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Verify a plaintext secret against a stored hash. An unparseable hash
    /// never verifies.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };

        self.argon2()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend the same work as a real verification, then fail. Used when the
    /// account does not exist.
    pub fn verify_unknown(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy_hash);
        false
    }

    /// Run verification on the blocking pool so the hash work cannot stall
    /// the async executor. `None` means the account does not exist.
    pub async fn verify_off_thread(
        &self,
        secret: String,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let verifier = self.clone();
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => verifier.verify(&secret, &hash),
            None => verifier.verify_unknown(&secret),
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))
    }

    /// True if the stored hash was produced with an algorithm or cost other
    /// than the configured one.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}
