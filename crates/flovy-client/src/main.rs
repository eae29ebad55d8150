//! flovy CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use flovy_client::cli::{AuthProvider, Cli, Command};
use flovy_client::commands;
use flovy_client::config::ClientConfig;
use flovy_client::error::{ClientError, ClientResult};
use flovy_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: could not initialize tracing: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    match cli.command {
        Command::Auth { provider } => match provider {
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
            } => commands::auth::google(client_id, client_secret, credentials_file, &config).await,
        },
        Command::Accounts { action } => commands::accounts::run(action, &config).await,
        Command::Calendars { action } => commands::calendars::run(action, &config).await,
        Command::Events { days, json } => commands::events::run(days, json, &config).await,
        Command::Suggest { model, name } => commands::suggest::run(model, name, &config).await,
        Command::Waitlist { action } => match action {
            flovy_client::cli::WaitlistAction::Add {
                email,
                name,
                challenge,
                goal,
                urgency,
            } => commands::waitlist::add(email, name, challenge, goal, urgency, &config).await,
            flovy_client::cli::WaitlistAction::List { limit } => {
                commands::waitlist::list(limit, &config).await
            }
        },
        Command::Notes { action } => commands::notes::run(action, &config),
        Command::Session { action } => commands::session::run(action, &config),
    }
}
