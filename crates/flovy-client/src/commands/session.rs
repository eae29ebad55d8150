//! Session timeout commands.

use flovy_session::SessionPreset;
use tracing::info;

use crate::cli::SessionAction;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dispatches a session subcommand.
pub fn run(action: SessionAction, config: &ClientConfig) -> ClientResult<()> {
    match action {
        SessionAction::Status => {
            let session = config.session_config().map_err(ClientError::Config)?;
            let preset = config.session.preset.as_deref().unwrap_or("standard");

            println!("Session timeout configuration (preset: {})", preset);
            if session.timeout_minutes == 0 {
                println!("  timeout:            disabled");
            } else {
                println!("  timeout:            {} minutes", session.timeout_minutes);
                println!(
                    "  warning threshold:  {} minutes",
                    session.warning_threshold_minutes
                );
            }
            println!(
                "  reset on activity:  {}",
                if session.reset_on_activity { "yes" } else { "no" }
            );
            println!(
                "  check interval:     {} seconds",
                session.check_interval_seconds
            );
        }
        SessionAction::Preset { name } => {
            let preset = name.parse::<SessionPreset>().map_err(ClientError::Usage)?;
            persist_preset(preset)?;
            println!(
                "Session preset set to {} ({} minute timeout).",
                preset.name(),
                preset.config().timeout_minutes
            );
        }
    }

    Ok(())
}

/// Writes the preset choice to `config.toml`.
fn persist_preset(preset: SessionPreset) -> ClientResult<()> {
    let config_path = ClientConfig::default_path();

    let content = if config_path.exists() {
        std::fs::read_to_string(&config_path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::Config(format!("could not parse config.toml: {}", e)))?;

    if !doc.contains_key("session") {
        doc["session"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if let Some(session) = doc["session"].as_table_mut() {
        session["preset"] = toml_edit::value(preset.name());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, doc.to_string())?;

    info!(preset = preset.name(), "persisted session preset");
    Ok(())
}
