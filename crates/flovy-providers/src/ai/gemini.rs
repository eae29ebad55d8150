//! Gemini generateContent backend.

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

use super::SuggestionResponse;

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-001:generateContent";
const MAX_OUTPUT_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.7;

/// Generates a suggestion via the generateContent endpoint.
///
/// Gemini takes a single prompt, so the system prompt is prepended to the
/// user prompt.
pub(super) async fn generate(
    http_client: &reqwest::Client,
    api_key: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> ProviderResult<SuggestionResponse> {
    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: format!("{}\n\n{}", system_prompt, user_prompt),
            }],
        }],
        generation_config: GenerationConfig {
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        },
    };

    let response = http_client
        .post(GENERATE_URL)
        .query(&[("key", api_key)])
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            ProviderError::network(format!("generate request failed: {}", e))
                .with_provider("gemini")
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::authentication("Gemini API key rejected").with_provider("gemini"));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::rate_limited("Gemini rate limit exceeded").with_provider("gemini"));
    }
    if !status.is_success() {
        return Err(
            ProviderError::server(format!("Gemini error ({}): {}", status, body))
                .with_provider("gemini"),
        );
    }

    let generated: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
            .with_provider("gemini")
    })?;

    let suggestion = generated
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ProviderError::invalid_response("no suggestion generated").with_provider("gemini")
        })?;

    Ok(SuggestionResponse {
        suggestion,
        reasoning: None,
        priority: None,
        is_mock: false,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generate_response() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [ { "text": "Start with deep work. " } ],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }
            ]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let text = &response.candidates[0].content.as_ref().unwrap().parts[0].text;
        assert_eq!(text.trim(), "Start with deep work.");
    }

    #[test]
    fn parse_empty_candidates() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.candidates.is_empty());
    }

    #[test]
    fn request_uses_camel_case_config() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"maxOutputTokens\":800"));
    }
}
