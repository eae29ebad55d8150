//! Linked-account management commands.

use crate::cli::AccountsAction;
use crate::commands::google_service;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Dispatches an accounts subcommand.
pub async fn run(action: AccountsAction, config: &ClientConfig) -> ClientResult<()> {
    let service = google_service(config)?;

    match action {
        AccountsAction::List => {
            let accounts = service.accounts();
            if accounts.is_empty() {
                println!("No calendar accounts linked.");
                println!("Run 'flovy auth google' to link one.");
                return Ok(());
            }

            let active = service.store().active_account_id();
            println!("Linked calendar accounts:");
            for account in accounts {
                let marker = if active.as_deref() == Some(account.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("  {} {}  ({})", marker, account.email, account.id);
            }
        }
        AccountsAction::Switch { account_id } => {
            let account = service.switch_account(&account_id).await?;
            println!("Active account is now {}.", account.email);
        }
        AccountsAction::Disconnect { account_id } => {
            service.disconnect_account(&account_id).await?;
            match service.active_account() {
                Some(account) => println!(
                    "Account disconnected; {} is now active.",
                    account.email
                ),
                None => println!("Account disconnected; no accounts remain."),
            }
        }
        AccountsAction::DisconnectAll => {
            service.disconnect_all().await?;
            println!("All calendar accounts disconnected.");
        }
    }

    Ok(())
}
