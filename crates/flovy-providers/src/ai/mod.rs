//! AI productivity suggestions.
//!
//! Builds a prompt from the user's goals, recent tasks, and today's
//! calendar, then asks OpenAI or Gemini for a suggestion. When the chosen
//! backend has no API key configured, generation degrades to a canned
//! response flagged `is_mock` so callers can indicate reduced confidence
//! instead of failing the request.

mod gemini;
mod openai;
mod prompt;

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

pub use prompt::{SYSTEM_PROMPT, build_user_prompt};

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionModel {
    /// OpenAI chat completions.
    OpenAi,
    /// Google Gemini (the default).
    #[default]
    Gemini,
}

impl FromStr for SuggestionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown model '{}' (expected openai or gemini)", other)),
        }
    }
}

/// User preferences included in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_work_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideal_energy_levels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_time: Option<String>,
}

/// A calendar slot included in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlot {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
}

/// Everything the generator knows about the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub goals: Vec<String>,
    pub recent_tasks: Vec<String>,
    pub calendar_events: Vec<CalendarSlot>,
    pub preferences: UserPreferences,
}

/// Priority attached to a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

/// A generated suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    /// The suggestion text (markdown).
    pub suggestion: String,
    /// Optional reasoning behind the suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Optional priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<SuggestionPriority>,
    /// True when this is the canned fallback rather than model output.
    #[serde(default)]
    pub is_mock: bool,
}

/// API keys and limits for the suggestion backends.
#[derive(Debug, Clone, Default)]
pub struct AiConfig {
    /// OpenAI API key, if configured.
    pub openai_api_key: Option<String>,
    /// Gemini API key, if configured.
    pub gemini_api_key: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl AiConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
}

/// Suggestion generation client.
#[derive(Debug)]
pub struct SuggestionClient {
    config: AiConfig,
    http_client: reqwest::Client,
}

impl SuggestionClient {
    /// Creates a client from the given configuration.
    pub fn new(config: AiConfig) -> ProviderResult<Self> {
        let timeout = config.timeout.unwrap_or(AiConfig::DEFAULT_TIMEOUT);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Generates a productivity suggestion for the given profile.
    ///
    /// Falls back to a canned suggestion (flagged `is_mock`) when the
    /// chosen backend has no API key configured. Backend failures with a
    /// configured key propagate as errors.
    pub async fn generate(
        &self,
        profile: &UserProfile,
        model: SuggestionModel,
    ) -> ProviderResult<SuggestionResponse> {
        let user_prompt = build_user_prompt(profile);

        match model {
            SuggestionModel::Gemini => match self.config.gemini_api_key.as_deref() {
                Some(key) => {
                    debug!("generating suggestion via Gemini");
                    gemini::generate(&self.http_client, key, SYSTEM_PROMPT, &user_prompt).await
                }
                None => {
                    info!("Gemini API key not configured, returning mock suggestion");
                    Ok(mock_suggestion(profile))
                }
            },
            SuggestionModel::OpenAi => match self.config.openai_api_key.as_deref() {
                Some(key) => {
                    debug!("generating suggestion via OpenAI");
                    openai::generate(&self.http_client, key, SYSTEM_PROMPT, &user_prompt).await
                }
                None => {
                    info!("OpenAI API key not configured, returning mock suggestion");
                    Ok(mock_suggestion(profile))
                }
            },
        }
    }
}

/// The canned fallback used when no API key is configured.
fn mock_suggestion(profile: &UserProfile) -> SuggestionResponse {
    let focus = profile
        .goals
        .first()
        .map(|g| g.as_str())
        .unwrap_or("your most important goal");

    let suggestion = format!(
        "**Good day, {}!** 🌤️\n\n\
        Here's a focus plan for today:\n\n\
        - 🎯 Start with **{}** while your energy is highest\n\
        - 📅 You have {} event(s) on the calendar - leave buffer time around them\n\
        - ✅ Close out one small task from your recent list to build momentum\n\n\
        Block 90 distraction-free minutes this morning and protect them.",
        profile.name,
        focus,
        profile.calendar_events.len(),
    );

    SuggestionResponse {
        suggestion,
        reasoning: Some(
            "Generated without an AI backend; configure an API key for personalized suggestions."
                .to_string(),
        ),
        priority: Some(SuggestionPriority::Medium),
        is_mock: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            name: "Ada".to_string(),
            goals: vec!["Ship the parser".to_string()],
            recent_tasks: vec!["Wrote tests".to_string()],
            calendar_events: vec![CalendarSlot {
                title: "Standup".to_string(),
                start_time: "09:00".to_string(),
                end_time: "09:15".to_string(),
            }],
            preferences: UserPreferences::default(),
        }
    }

    #[test]
    fn model_parsing() {
        assert_eq!("openai".parse::<SuggestionModel>().unwrap(), SuggestionModel::OpenAi);
        assert_eq!("Gemini".parse::<SuggestionModel>().unwrap(), SuggestionModel::Gemini);
        assert!("claude".parse::<SuggestionModel>().is_err());
    }

    #[tokio::test]
    async fn missing_key_degrades_to_mock() {
        let client = SuggestionClient::new(AiConfig::default()).unwrap();

        let response = client
            .generate(&profile(), SuggestionModel::Gemini)
            .await
            .unwrap();

        assert!(response.is_mock);
        assert!(response.suggestion.contains("Ada"));
        assert!(response.suggestion.contains("Ship the parser"));
    }

    #[tokio::test]
    async fn mock_applies_to_both_backends() {
        let client = SuggestionClient::new(AiConfig::default()).unwrap();

        let openai = client
            .generate(&profile(), SuggestionModel::OpenAi)
            .await
            .unwrap();
        assert!(openai.is_mock);
    }

    #[test]
    fn response_wire_shape() {
        let response = SuggestionResponse {
            suggestion: "Focus on deep work".to_string(),
            reasoning: None,
            priority: Some(SuggestionPriority::High),
            is_mock: false,
        };

        insta::assert_json_snapshot!(response, @r###"
        {
          "suggestion": "Focus on deep work",
          "priority": "high",
          "isMock": false
        }
        "###);
    }

    #[test]
    fn is_mock_defaults_false_on_deserialize() {
        let response: SuggestionResponse =
            serde_json::from_str(r#"{ "suggestion": "x" }"#).unwrap();
        assert!(!response.is_mock);
        assert!(response.priority.is_none());
    }
}
