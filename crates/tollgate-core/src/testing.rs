use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::clock::{Clock, ManualClock};
use crate::config::{AuthConfig, PasswordCost};
use crate::service::{AuthService, LoginRequest, LoginResponse};

/// A test harness for integration testing.
///
/// Wires an `AuthService` to an in-memory SQLite database and a manual
/// clock, so tests can step over windows and lifetimes without sleeping.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login() {
///     let auth = TestAuth::new().await;
///     auth.create_user("a@b.com", "secret123").await;
///     let res = auth.login("a@b.com", "secret123").await;
///     assert!(!res.access_token.is_empty());
/// }
/// ```
pub struct TestAuth {
    pub service: AuthService,
    pub db: DatabaseConnection,
    pub clock: Arc<ManualClock>,
    pub config: AuthConfig,
}

impl TestAuth {
    /// Configuration used by `new()`: in-memory SQLite on a single
    /// connection and a cheap password hash.
    pub fn config() -> AuthConfig {
        AuthConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            jwt_secret: "test-secret-key-for-testing-purposes-only".to_string(),
            password_cost: PasswordCost {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            environment: "test".to_string(),
            ..AuthConfig::default()
        }
    }

    pub async fn new() -> Self {
        Self::with_config(Self::config()).await
    }

    /// Create a harness with a custom config.
    pub async fn with_config(config: AuthConfig) -> Self {
        let db = crate::db::connect_and_migrate(&config)
            .await
            .expect("Failed to set up test database");

        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(ManualClock::new(start));

        let service = AuthService::with_parts(
            config.clone(),
            db.clone(),
            Arc::new(crate::auth::DbCredentialStore::new(db.clone())),
            clock.clone(),
        )
        .expect("Failed to build auth service");

        TestAuth {
            service,
            db,
            clock,
            config,
        }
    }

    /// Insert an active `user` account and return its id.
    pub async fn create_user(&self, email: &str, password: &str) -> i32 {
        self.create_user_with_role(email, password, "user", true)
            .await
    }

    pub async fn create_user_with_role(
        &self,
        email: &str,
        password: &str,
        role: &str,
        is_active: bool,
    ) -> i32 {
        let now = self.clock.now().naive_utc();
        let hash = self
            .service
            .credential_verifier()
            .hash(password)
            .expect("Failed to hash password");

        let user = crate::models::user::ActiveModel {
            email: Set(email.to_lowercase()),
            role: Set(role.to_string()),
            password_hash: Set(hash),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        user.insert(&self.db)
            .await
            .expect("Failed to insert user")
            .id
    }

    /// Log in from 127.0.0.1 and panic on failure.
    pub async fn login(&self, email: &str, password: &str) -> LoginResponse {
        self.service
            .login(LoginRequest::new(email, password).with_ip("127.0.0.1"))
            .await
            .expect("Login failed")
    }

    /// Move the shared clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Current harness time, as stored in the database.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now().naive_utc()
    }
}
