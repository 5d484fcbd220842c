pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod service;
pub mod testing;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{AuthConfig, PasswordCost};
pub use error::AuthError;
pub use service::{
    AuthService, LoginRequest, LoginResponse, PurgeReport, SessionSummary, TokenPair,
};
pub use testing::TestAuth;
