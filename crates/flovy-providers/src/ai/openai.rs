//! OpenAI chat-completions backend.

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

use super::SuggestionResponse;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";
const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.7;

/// Generates a suggestion via the chat-completions endpoint.
pub(super) async fn generate(
    http_client: &reqwest::Client,
    api_key: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> ProviderResult<SuggestionResponse> {
    let request = CompletionRequest {
        model: MODEL,
        messages: vec![
            Message {
                role: "system",
                content: system_prompt.to_string(),
            },
            Message {
                role: "user",
                content: user_prompt.to_string(),
            },
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    };

    let response = http_client
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            ProviderError::network(format!("completion request failed: {}", e))
                .with_provider("openai")
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ProviderError::authentication("OpenAI API key rejected").with_provider("openai"));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::rate_limited("OpenAI rate limit exceeded").with_provider("openai"));
    }
    if !status.is_success() {
        return Err(
            ProviderError::server(format!("OpenAI error ({}): {}", status, body))
                .with_provider("openai"),
        );
    }

    let completion: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse completion: {}", e))
            .with_provider("openai")
    })?;

    let suggestion = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.map(|m| m.content))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ProviderError::invalid_response("no suggestion generated").with_provider("openai")
        })?;

    Ok(SuggestionResponse {
        suggestion,
        reasoning: None,
        priority: None,
        is_mock: false,
    })
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: &'static str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_response() {
        let json = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "  Focus on the parser.  " } }
            ]
        }"#;

        let completion: CompletionResponse = serde_json::from_str(json).unwrap();
        let content = completion.choices[0].message.as_ref().unwrap();
        assert_eq!(content.content.trim(), "Focus on the parser.");
    }

    #[test]
    fn parse_empty_choices() {
        let completion: CompletionResponse = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        assert!(completion.choices.is_empty());
    }

    #[test]
    fn request_serializes_expected_fields() {
        let request = CompletionRequest {
            model: MODEL,
            messages: vec![Message {
                role: "system",
                content: "sys".to_string(),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"gpt-3.5-turbo\""));
        assert!(json.contains("\"max_tokens\":800"));
        assert!(json.contains("\"role\":\"system\""));
    }
}
