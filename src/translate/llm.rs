//! LLM-backed translation gateway.
//!
//! Calls an OpenAI-compatible chat completions endpoint with a fixed
//! translation instruction. The relay performs language detection and text
//! normalization before this call; the model only translates.

use crate::config::GatewayConfig;
use crate::error::{RelayError, Result};
use crate::lang::Language;
use crate::translate::{TranslationGateway, TranslationResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Translation gateway backed by an OpenAI-compatible chat endpoint.
pub struct LlmGateway {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl LlmGateway {
    /// Create a gateway from configuration.
    ///
    /// The API key is read from the environment variable named in
    /// `config.api_key_env`.
    ///
    /// # Errors
    /// Returns `RelayError::ConfigInvalidValue` if the key variable is
    /// unset or empty.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RelayError::ConfigInvalidValue {
                key: "gateway.api_key_env".to_string(),
                message: format!("environment variable {} is not set", config.api_key_env),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Gateway {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn instruction(source: Language, target: Language) -> String {
        format!(
            "You are a translator for live speech captions. Translate the user's {} text \
             into natural {}. Reply with the translation only, no quotes, no commentary.",
            source.name(),
            target.name()
        )
    }
}

#[async_trait::async_trait]
impl TranslationGateway for LlmGateway {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<TranslationResult> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::instruction(source, target),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Gateway {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Gateway {
                message: format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| RelayError::GatewayResponse {
            message: format!("Failed to decode response: {}", e),
        })?;

        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RelayError::GatewayResponse {
                message: "response contained no translation".to_string(),
            })?;

        Ok(TranslationResult {
            source_text: text.to_string(),
            translated_text: content.to_string(),
            source_lang: source,
            target_lang: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_names_both_languages() {
        let prompt = LlmGateway::instruction(Language::Korean, Language::English);
        assert!(prompt.contains("Korean"));
        assert!(prompt.contains("English"));
    }

    #[test]
    fn test_chat_request_serializes_to_openai_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "안녕".to_string(),
            }],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "안녕");
    }

    #[test]
    fn test_chat_response_parses_choices() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hello");
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = GatewayConfig {
            api_key_env: "TONGYEOK_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..GatewayConfig::default()
        };
        let result = LlmGateway::from_config(&config);
        assert!(matches!(
            result,
            Err(RelayError::ConfigInvalidValue { .. })
        ));
    }
}
