// src/services/llm_service.rs
use crate::config::{Config, OPENAI_DEFAULT_BASE};
use crate::errors::SnapcodeError;
use crate::models::{Llm, Settings};
use crate::prompts::{ChatMessage, ContentPart, MessageContent, Role};
use crate::services::image_processor::ImageProcessor;
use crate::services::sse::{SseDecoder, SseFrame};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Streams a completion, feeding deltas to `on_chunk`, and returns the full text.
    async fn stream_completion(
        &self,
        model: Llm,
        messages: &[ChatMessage],
        on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<String, SnapcodeError>;

    fn name(&self) -> &str;
}

pub struct LLMService {
    client: Client,
    openai_key: Option<String>,
    openai_base_url: Option<String>,
    anthropic_key: Option<String>,
    anthropic_base_url: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl LLMService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            openai_key: config.openai_api_key.clone(),
            openai_base_url: config.openai_base_url.clone(),
            anthropic_key: config.anthropic_api_key.clone(),
            anthropic_base_url: config.anthropic_base_url.clone(),
        }
    }

    /// Picks the provider for `model`. Credentials from the user's settings
    /// take precedence over the server's own.
    pub fn provider_for(
        &self,
        model: Llm,
        settings: &Settings,
    ) -> Result<Box<dyn CompletionProvider>, SnapcodeError> {
        if model.is_claude() {
            let api_key = non_empty(&self.anthropic_key).ok_or_else(|| {
                SnapcodeError::MissingApiKey("Anthropic API key not configured".to_string())
            })?;
            return Ok(Box::new(ClaudeProvider {
                client: self.client.clone(),
                api_key: api_key.to_string(),
                base_url: self.anthropic_base_url.clone(),
                image_processor: ImageProcessor::new(),
            }));
        }

        // A client-supplied base URL only ever receives the client's own key.
        let (api_key, base_url) = match non_empty(&settings.openai_api_key) {
            Some(user_key) => (
                user_key,
                non_empty(&settings.openai_base_url).or_else(|| non_empty(&self.openai_base_url)),
            ),
            None => {
                let server_key = non_empty(&self.openai_key).ok_or_else(|| {
                    SnapcodeError::MissingApiKey(
                        "No OpenAI API key in settings or server configuration".to_string(),
                    )
                })?;
                if settings.openai_base_url.is_some() {
                    log::warn!("Ignoring client base URL for a request using the server key");
                }
                (server_key, non_empty(&self.openai_base_url))
            }
        };
        let base_url = base_url.unwrap_or(OPENAI_DEFAULT_BASE);

        Ok(Box::new(OpenAiProvider {
            client: self.client.clone(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }))
    }
}

async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, SnapcodeError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(SnapcodeError::Llm(format!(
        "{} error ({}): {}",
        provider, status, error_text
    )))
}

/// Feeds SSE frames to `on_frame` until it returns `false` or the body ends.
async fn read_sse<F>(response: reqwest::Response, mut on_frame: F) -> Result<(), SnapcodeError>
where
    F: FnMut(SseFrame) -> Result<bool, SnapcodeError> + Send,
{
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| SnapcodeError::Llm(format!("Stream interrupted: {}", e)))?;
        for frame in decoder.push(&chunk) {
            if !on_frame(frame)? {
                return Ok(());
            }
        }
    }
    if let Some(frame) = decoder.flush() {
        on_frame(frame)?;
    }
    Ok(())
}

fn parse_frame(frame: &SseFrame) -> Result<Value, SnapcodeError> {
    serde_json::from_str(&frame.data)
        .map_err(|e| SnapcodeError::Llm(format!("Malformed stream event: {}", e)))
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    fn request_body(model: Llm, messages: &[ChatMessage]) -> Value {
        json!({
            "model": model.as_str(),
            "messages": messages,
            "stream": true,
            "temperature": 0.0,
            "max_tokens": model.max_tokens(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream_completion(
        &self,
        model: Llm,
        messages: &[ChatMessage],
        on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<String, SnapcodeError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        log::info!("Streaming {} completion from {}", model, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&Self::request_body(model, messages))
            .send()
            .await
            .map_err(|e| SnapcodeError::Llm(format!("OpenAI request failed: {}", e)))?;
        let response = check_status(response, self.name()).await?;

        let mut full_response = String::new();
        read_sse(response, |frame| {
            if frame.data == "[DONE]" {
                return Ok(false);
            }
            let event = parse_frame(&frame)?;
            if let Some(message) = event["error"]["message"].as_str() {
                return Err(SnapcodeError::Llm(format!("OpenAI error: {}", message)));
            }
            let content = event["choices"][0]["delta"]["content"]
                .as_str()
                .unwrap_or_default();
            if !content.is_empty() {
                full_response.push_str(content);
                on_chunk(content);
            }
            Ok(true)
        })
        .await?;

        Ok(full_response)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    base_url: String,
    image_processor: ImageProcessor,
}

impl ClaudeProvider {
    /// Splits off the system prompt and rewrites image parts into Claude's
    /// base64 source blocks.
    fn convert_messages(
        &self,
        messages: &[ChatMessage],
    ) -> Result<(String, Vec<Value>), SnapcodeError> {
        let (first, rest) = messages.split_first().ok_or_else(|| {
            SnapcodeError::Validation("Cannot send an empty conversation".to_string())
        })?;
        let system = match (first.role, &first.content) {
            (Role::System, MessageContent::Text(text)) => text.clone(),
            _ => {
                return Err(SnapcodeError::Validation(
                    "First message must be a text system prompt".to_string(),
                ));
            }
        };

        let converted = rest
            .iter()
            .map(|message| self.convert_message(message))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((system, converted))
    }

    fn convert_message(&self, message: &ChatMessage) -> Result<Value, SnapcodeError> {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => {
                return Err(SnapcodeError::Validation(
                    "Only the first message may be a system prompt".to_string(),
                ));
            }
        };

        let content = match &message.content {
            MessageContent::Text(text) => json!(text),
            MessageContent::Parts(parts) => Value::Array(
                parts
                    .iter()
                    .map(|part| self.convert_part(part))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(json!({ "role": role, "content": content }))
    }

    fn convert_part(&self, part: &ContentPart) -> Result<Value, SnapcodeError> {
        match part {
            ContentPart::Text { text } => Ok(json!({ "type": "text", "text": text })),
            ContentPart::ImageUrl { image_url } => {
                let data_url = self.image_processor.parse_data_url(&image_url.url)?;
                let data_url = self.image_processor.resize_for_claude(&data_url)?;
                Ok(json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": data_url.media_type,
                        "data": data_url.data
                    }
                }))
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn stream_completion(
        &self,
        model: Llm,
        messages: &[ChatMessage],
        on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<String, SnapcodeError> {
        let (system, claude_messages) = self.convert_messages(messages)?;
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        log::info!("Streaming {} completion from {}", model, url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "model": model.as_str(),
                "max_tokens": model.max_tokens(),
                "temperature": 0.0,
                "system": system,
                "messages": claude_messages,
                "stream": true
            }))
            .send()
            .await
            .map_err(|e| SnapcodeError::Llm(format!("Anthropic request failed: {}", e)))?;
        let response = check_status(response, self.name()).await?;

        let mut full_response = String::new();
        read_sse(response, |frame| {
            let event = parse_frame(&frame)?;
            match event["type"].as_str() {
                Some("content_block_delta") => {
                    if let Some(text) = event["delta"]["text"].as_str() {
                        full_response.push_str(text);
                        on_chunk(text);
                    }
                    Ok(true)
                }
                Some("error") => Err(SnapcodeError::Llm(format!(
                    "Anthropic error: {}",
                    event["error"]["message"].as_str().unwrap_or("unknown")
                ))),
                Some("message_stop") => Ok(false),
                _ => Ok(true),
            }
        })
        .await?;

        Ok(full_response)
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}
