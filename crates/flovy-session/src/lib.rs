//! Inactivity session timeout and auth-state binding.
//!
//! [`SessionManager`] enforces an inactivity timeout: once started, it
//! signs the user out after a configured period without activity. Any
//! qualifying activity event resets the clock. [`AuthBinding`] couples an
//! identity provider's auth-state stream to the manager's lifecycle:
//! session timing runs exactly while a user is signed in, and a sign-out
//! cascades into per-user cleanup hooks.

pub mod auth;
pub mod config;
pub mod manager;

pub use auth::AuthBinding;
pub use config::{ActivityEvent, SessionConfig, SessionConfigUpdate, SessionPreset};
pub use manager::SessionManager;
