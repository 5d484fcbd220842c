pub mod blacklist_entry;
pub mod login_attempt;
pub mod refresh_token;
pub mod security_settings;
pub mod session;
pub mod user;
