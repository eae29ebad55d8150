//! Command implementations.

pub mod accounts;
pub mod auth;
pub mod calendars;
pub mod events;
pub mod notes;
pub mod session;
pub mod suggest;
pub mod waitlist;

use std::path::PathBuf;

use flovy_providers::google::{CalendarService, GoogleConfig, OAuthCredentials};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The per-user data directory, honoring the config override.
pub fn data_dir(config: &ClientConfig) -> PathBuf {
    config
        .google
        .as_ref()
        .and_then(|g| g.data_dir.clone())
        .unwrap_or_else(GoogleConfig::default_data_dir)
}

/// Builds the Google configuration from client settings.
pub fn google_config(config: &ClientConfig) -> ClientResult<GoogleConfig> {
    let client_id = config
        .google_client_id()
        .map_err(ClientError::Config)?
        .ok_or_else(|| {
            ClientError::Config(
                "no Google client_id configured - run 'flovy auth google --client-id <ID> --client-secret <SECRET>'"
                    .to_string(),
            )
        })?;
    let client_secret = config
        .google_client_secret()
        .map_err(ClientError::Config)?
        .ok_or_else(|| ClientError::Config("no Google client_secret configured".to_string()))?;

    let credentials = OAuthCredentials::new(client_id, client_secret);
    Ok(GoogleConfig::new(credentials).with_data_dir(data_dir(config)))
}

/// Builds the calendar service for the configured profile user.
pub fn google_service(config: &ClientConfig) -> ClientResult<CalendarService> {
    let google = google_config(config)?;
    Ok(CalendarService::new(google, config.user_id())?)
}
