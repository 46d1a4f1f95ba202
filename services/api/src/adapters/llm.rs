//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the chat completion API.
//! It implements the `CompletionService` port from the `core` crate against any
//! OpenAI-compatible endpoint (Groq by default).

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use bookstore_core::ports::{
    ChatMessage, CompletionRequest, CompletionService, ModelTier, PortError, PortResult, Role,
};
use tracing::{debug, warn};

/// An adapter that implements the `CompletionService` using `async-openai`.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    primary_model: String,
    fast_model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new adapter. The SDK's own retry loop is switched off, so every
    /// call reaches the API exactly once.
    pub fn new(api_base: &str, api_key: &str, primary_model: String, fast_model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retry),
            primary_model,
            fast_model,
        }
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Primary => &self.primary_model,
            ModelTier::Fast => &self.fast_model,
        }
    }
}

fn to_sdk_message(message: ChatMessage) -> PortResult<ChatCompletionRequestMessage> {
    let built = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()
            .map(Into::into),
    };
    built.map_err(|e| PortError::Unexpected(e.to_string()))
}

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        let model = self.model(request.model);
        if let Some(prompt) = request.messages.last() {
            debug!("Prompting {}: {}", model, prompt.content);
        }
        let messages = request
            .messages
            .into_iter()
            .map(to_sdk_message)
            .collect::<PortResult<Vec<_>>>()?;

        #[allow(deprecated)]
        let sdk_request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(sdk_request)
            .await
            .map_err(|e: OpenAIError| {
                let classified = classify(&e);
                warn!("Completion request to {} failed: {}", model, e);
                classified
            })?;

        // Only the first choice is used; a choice without content is an empty answer.
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("{} answered: {}", model, text);
        Ok(text)
    }

    fn model_name(&self, tier: ModelTier) -> String {
        self.model(tier).to_string()
    }
}

//=========================================================================================
// Error Classification
//=========================================================================================

/// Maps an SDK error onto the port's error taxonomy.
fn classify(e: &OpenAIError) -> PortError {
    let message = e.to_string();
    match e {
        OpenAIError::ApiError(api) => classify_api_error(
            api.r#type.as_deref(),
            api.code.as_deref(),
            &api.message,
            message,
        ),
        other => classify_message(&other.to_string(), message),
    }
}

/// Classifies on the structured `type` and `code` an OpenAI-compatible API
/// returns, falling back to the message text when neither is conclusive.
fn classify_api_error(
    kind: Option<&str>,
    code: Option<&str>,
    text: &str,
    message: String,
) -> PortError {
    let tags = || [kind, code].into_iter().flatten();
    if tags().any(|tag| tag.starts_with("rate_limit")) {
        PortError::RateLimited(message)
    } else if tags().any(|tag| AUTH_TAGS.contains(&tag)) {
        PortError::UpstreamAuth(message)
    } else {
        classify_message(text, message)
    }
}

const AUTH_TAGS: [&str; 3] = ["invalid_api_key", "authentication_error", "invalid_authentication"];
const RATE_LIMIT_PHRASES: [&str; 2] = ["rate limit", "too many requests"];
const AUTH_PHRASES: [&str; 3] = ["invalid api key", "incorrect api key", "unauthorized"];

/// Looks for rate-limit and credential phrases in free text. Status digits are
/// ignored: they also appear inside unrelated numbers such as token counts.
fn classify_message(text: &str, message: String) -> PortError {
    let text = text.to_lowercase();
    if RATE_LIMIT_PHRASES.iter().any(|p| text.contains(p)) {
        PortError::RateLimited(message)
    } else if AUTH_PHRASES.iter().any(|p| text.contains(p)) {
        PortError::UpstreamAuth(message)
    } else {
        PortError::Unexpected(message)
    }
}
