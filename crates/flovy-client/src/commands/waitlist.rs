//! Waitlist commands.

use flovy_providers::brevo::{BrevoConfig, WaitlistClient, WaitlistEntry};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds the waitlist client from config.
fn client(config: &ClientConfig) -> ClientResult<WaitlistClient> {
    let api_key = config
        .brevo_api_key()
        .map_err(ClientError::Config)?
        .ok_or_else(|| {
            ClientError::Config(
                "no Brevo API key configured - add a [brevo] section to config.toml".to_string(),
            )
        })?;

    let mut brevo_config = BrevoConfig::new(api_key);
    if let Some(list_id) = config.brevo.as_ref().and_then(|b| b.list_id) {
        brevo_config = brevo_config.with_list_id(list_id);
    }

    Ok(WaitlistClient::new(brevo_config)?)
}

/// Adds a contact to the waitlist.
pub async fn add(
    email: String,
    name: Option<String>,
    challenge: Option<String>,
    goal: Option<String>,
    urgency: Option<String>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let entry = WaitlistEntry {
        email,
        name,
        challenge,
        goal,
        urgency,
    };

    client(config)?.subscribe(&entry).await?;

    println!("{} is on the waitlist.", entry.email);
    Ok(())
}

/// Lists waitlist contacts with their survey answers.
pub async fn list(limit: u32, config: &ClientConfig) -> ClientResult<()> {
    let contacts = client(config)?.list_contacts(limit).await?;

    if contacts.is_empty() {
        println!("The waitlist is empty.");
        return Ok(());
    }

    println!("{} contact(s):", contacts.len());
    for contact in &contacts {
        let name = contact.attribute("FIRSTNAME").unwrap_or_default();
        println!("  {}  {}", contact.email, name);
        for key in ["CHALLENGE", "GOAL", "URGENCY"] {
            if let Some(value) = contact.attribute(key) {
                println!("      {}: {}", key.to_lowercase(), value);
            }
        }
    }

    Ok(())
}
