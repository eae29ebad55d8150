//! Authentication commands.

use std::path::PathBuf;

use tracing::info;

use flovy_providers::google::{CalendarService, GoogleConfig, OAuthCredentials};

use crate::commands::data_dir;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs the Google authentication flow and links the resulting account.
///
/// Credentials come from CLI flags, a `--credentials-file`, or
/// `config.toml`, in that order. Credentials provided on the CLI are
/// persisted to `config.toml` so later commands find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let (final_client_id, final_client_secret, source) =
        resolve_google_credentials(client_id, client_secret, credentials_file, config)?;

    let credentials = OAuthCredentials::new(&final_client_id, &final_client_secret);
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let google_config = GoogleConfig::new(credentials).with_data_dir(data_dir(config));
    let service = CalendarService::new(google_config, config.user_id())?;

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    let account = service.connect_account().await?;

    save_credentials_to_config(&final_client_id, &final_client_secret, &source);

    info!(account = %account.email, "Google authentication successful");
    println!();
    println!("Connected {} ({}).", account.email, account.id);
    if service.accounts().len() > 1 {
        println!(
            "{} accounts linked; this one is now active.",
            service.accounts().len()
        );
    }

    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// From CLI flags or a `--credentials-file`.
    Cli,
    /// From config.toml (already persisted).
    Config,
}

/// Resolves the OAuth client id/secret from the available sources.
fn resolve_google_credentials(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    config: &ClientConfig,
) -> ClientResult<(String, String, CredentialSource)> {
    if let (Some(id), Some(secret)) = (client_id, client_secret) {
        return Ok((id, secret, CredentialSource::Cli));
    }

    if let Some(path) = credentials_file {
        let creds = OAuthCredentials::from_file(&path).map_err(ClientError::Config)?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    let id = config.google_client_id().map_err(ClientError::Config)?;
    let secret = config.google_client_secret().map_err(ClientError::Config)?;
    match (id, secret) {
        (Some(id), Some(secret)) => Ok((id, secret, CredentialSource::Config)),
        _ => Err(ClientError::Config(
            "no Google credentials found - pass --client-id/--client-secret, \
             --credentials-file, or add a [google] section to config.toml"
                .to_string(),
        )),
    }
}

/// Saves credentials to `config.toml` under `[google]`.
///
/// Only writes when the credentials came from a transient source (CLI
/// flags or a credentials file); values already in config.toml are left
/// alone, including secret references.
fn save_credentials_to_config(client_id: &str, client_secret: &str, source: &CredentialSource) {
    if *source == CredentialSource::Config {
        return;
    }

    let config_path = ClientConfig::default_path();

    let content = if config_path.exists() {
        std::fs::read_to_string(&config_path).unwrap_or_default()
    } else {
        String::new()
    };

    let mut doc = match content.parse::<toml_edit::DocumentMut>() {
        Ok(d) => d,
        Err(e) => {
            info!("could not parse config.toml for writing: {}", e);
            return;
        }
    };

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    if let Some(google) = doc["google"].as_table_mut() {
        google["client_id"] = toml_edit::value(client_id);
        google["client_secret"] = toml_edit::value(client_secret);
    }

    if let Some(parent) = config_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        info!("could not create config directory: {}", e);
        return;
    }

    match std::fs::write(&config_path, doc.to_string()) {
        Ok(()) => info!("saved Google credentials to {:?}", config_path),
        Err(e) => info!("could not write config.toml: {}", e),
    }
}
