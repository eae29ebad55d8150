//! Brevo waitlist CRM integration.
//!
//! Waitlist signups become Brevo contacts with a few custom attributes
//! (challenge, goal, urgency). The custom attributes are created on
//! demand; attribute bookkeeping failures are logged but never block the
//! signup itself.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

const DEFAULT_BASE_URL: &str = "https://api.brevo.com/v3";

/// Source attribute stamped on every waitlist contact.
const SOURCE_VALUE: &str = "flovy_waitlist";

/// Custom contact attributes the waitlist uses.
const CUSTOM_ATTRIBUTES: [&str; 4] = ["CHALLENGE", "GOAL", "URGENCY", "SOURCE"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// One waitlist signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Contact email (required).
    pub email: String,
    /// First name.
    pub name: Option<String>,
    /// What the user struggles with.
    pub challenge: Option<String>,
    /// What they want to achieve.
    pub goal: Option<String>,
    /// How urgently they want it.
    pub urgency: Option<String>,
}

impl WaitlistEntry {
    /// Creates an entry for the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Validates the entry.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.email.is_empty() {
            return Err(ProviderError::bad_request("email is required"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ProviderError::bad_request(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }
        Ok(())
    }

    /// Builds the Brevo attribute map, omitting empty values.
    fn attributes(&self) -> BTreeMap<&'static str, String> {
        let mut attributes = BTreeMap::new();
        attributes.insert("SOURCE", SOURCE_VALUE.to_string());
        if let Some(ref name) = self.name
            && !name.is_empty()
        {
            attributes.insert("FIRSTNAME", name.clone());
        }
        if let Some(ref challenge) = self.challenge
            && !challenge.is_empty()
        {
            attributes.insert("CHALLENGE", challenge.clone());
        }
        if let Some(ref goal) = self.goal
            && !goal.is_empty()
        {
            attributes.insert("GOAL", goal.clone());
        }
        if let Some(ref urgency) = self.urgency
            && !urgency.is_empty()
        {
            attributes.insert("URGENCY", urgency.clone());
        }
        attributes
    }
}

/// Brevo client configuration.
#[derive(Debug, Clone)]
pub struct BrevoConfig {
    /// API key.
    pub api_key: String,
    /// Optional list to attach contacts to.
    pub list_id: Option<i64>,
    /// Request timeout.
    pub timeout: Duration,
}

impl BrevoConfig {
    /// Creates a configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            list_id: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the list contacts are attached to.
    pub fn with_list_id(mut self, list_id: i64) -> Self {
        self.list_id = Some(list_id);
        self
    }
}

/// Waitlist CRM client.
#[derive(Debug)]
pub struct WaitlistClient {
    config: BrevoConfig,
    base_url: String,
    http_client: reqwest::Client,
}

impl WaitlistClient {
    /// Creates a client from the given configuration.
    pub fn new(config: BrevoConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(
                ProviderError::configuration("Brevo API key not configured").with_provider("brevo"),
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client,
        })
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Adds (or updates) a contact on the waitlist.
    ///
    /// Creates the contact first; if Brevo reports it already exists,
    /// falls back to an update of the same payload.
    pub async fn subscribe(&self, entry: &WaitlistEntry) -> ProviderResult<()> {
        entry.validate()?;

        self.ensure_attributes().await;

        let payload = ContactPayload {
            email: entry.email.clone(),
            attributes: entry.attributes(),
            update_enabled: true,
            list_ids: self.config.list_id.map(|id| vec![id]),
        };

        debug!(email = %entry.email, "creating waitlist contact");
        let response = self
            .http_client
            .post(format!("{}/contacts", self.base_url))
            .header("api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("contact create failed: {}", e))
                    .with_provider("brevo")
            })?;

        let status = response.status();
        if status.is_success() {
            info!(email = %entry.email, "waitlist contact created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();

        // Contact already exists: update instead.
        if status == reqwest::StatusCode::BAD_REQUEST && body.contains("exists") {
            debug!(email = %entry.email, "contact exists, updating");
            return self.update_contact(&entry.email, &payload).await;
        }

        Err(
            ProviderError::server(format!("contact create failed ({}): {}", status, body))
                .with_provider("brevo"),
        )
    }

    /// Lists waitlist contacts.
    ///
    /// Reads from the configured list when one is set, otherwise from
    /// the full contact base.
    pub async fn list_contacts(&self, limit: u32) -> ProviderResult<Vec<WaitlistContact>> {
        let url = match self.config.list_id {
            Some(id) => format!("{}/contacts/lists/{}/contacts", self.base_url, id),
            None => format!("{}/contacts", self.base_url),
        };

        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", limit.to_string())])
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("contact list failed: {}", e)).with_provider("brevo")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "contact list failed ({}): {}",
                status, body
            ))
            .with_provider("brevo"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        let list: ContactListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse contacts: {}", e))
                .with_provider("brevo")
        })?;

        Ok(list.contacts)
    }

    /// Updates an existing contact.
    async fn update_contact(&self, email: &str, payload: &ContactPayload) -> ProviderResult<()> {
        let url = format!("{}/contacts/{}", self.base_url, urlencoding::encode(email));

        let response = self
            .http_client
            .put(&url)
            .header("api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("contact update failed: {}", e))
                    .with_provider("brevo")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "contact update failed ({}): {}",
                status, body
            ))
            .with_provider("brevo"));
        }

        info!(email = %email, "waitlist contact updated");
        Ok(())
    }

    /// Makes sure the custom contact attributes exist.
    ///
    /// Failures here are logged and swallowed; a missing attribute only
    /// degrades the contact record, it must not block the signup.
    async fn ensure_attributes(&self) {
        let existing = match self.list_attribute_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("could not list contact attributes: {}", e);
                return;
            }
        };

        for name in CUSTOM_ATTRIBUTES {
            if existing.iter().any(|n| n == name) {
                continue;
            }

            debug!(attribute = %name, "creating contact attribute");
            let url = format!("{}/contacts/attributes/normal/{}", self.base_url, name);
            let result = self
                .http_client
                .post(&url)
                .header("api-key", &self.config.api_key)
                .json(&AttributePayload { r#type: "text" })
                .send()
                .await;

            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!(attribute = %name, status = %response.status(), "failed to create attribute");
                }
                Err(e) => warn!(attribute = %name, "failed to create attribute: {}", e),
                _ => {}
            }
        }
    }

    /// Lists the existing contact attribute names.
    async fn list_attribute_names(&self) -> ProviderResult<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/contacts/attributes", self.base_url))
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("attribute list failed: {}", e))
                    .with_provider("brevo")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "attribute list failed ({}): {}",
                status, body
            ))
            .with_provider("brevo"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        let list: AttributeListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse attributes: {}", e))
                .with_provider("brevo")
        })?;

        Ok(list.attributes.into_iter().map(|a| a.name).collect())
    }
}

/// A contact as stored in the CRM.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitlistContact {
    /// Contact email.
    pub email: String,
    /// Raw contact attributes (FIRSTNAME, CHALLENGE, GOAL, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl WaitlistContact {
    /// Returns a named attribute as a string, if present.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .get(name)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ContactListResponse {
    #[serde(default)]
    contacts: Vec<WaitlistContact>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactPayload {
    email: String,
    attributes: BTreeMap<&'static str, String>,
    update_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    list_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
struct AttributePayload {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AttributeListResponse {
    #[serde(default)]
    attributes: Vec<AttributeEntry>,
}

#[derive(Debug, Deserialize)]
struct AttributeEntry {
    name: String,
}
