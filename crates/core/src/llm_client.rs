use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Defines the supported backend providers for generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// The OpenAI-compatible base URL for this provider.
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// The environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// A single prompt that must be answered with JSON matching `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Name reported to the provider for the response format.
    pub schema_name: String,
    pub schema: Value,
}

impl StructuredRequest {
    /// Builds a request whose schema is derived from `T`.
    pub fn for_type<T: JsonSchema>(
        schema_name: &str,
        system_prompt: String,
        user_prompt: String,
    ) -> Self {
        Self {
            system_prompt,
            user_prompt,
            schema_name: schema_name.to_string(),
            schema: json_schema_of::<T>(),
        }
    }
}

/// Generates the JSON Schema for `T` in the shape providers accept.
pub fn json_schema_of<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null);
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

/// A generic client for prompt-executing services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming call and returns the parsed JSON body.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value>;
}

/// Runs `request` and deserializes the reply into `T`.
pub async fn complete_as<T: DeserializeOwned>(
    client: &dyn LLMClient,
    request: StructuredRequest,
) -> Result<T> {
    let schema_name = request.schema_name.clone();
    let value = client.complete_structured(request).await?;
    serde_json::from_value(value)
        .with_context(|| format!("LLM output did not match the '{}' schema", schema_name))
}

/// Parses a model reply as JSON, tolerating a surrounding Markdown code fence.
pub fn parse_json_reply(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).context("LLM response was not valid JSON")
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: request.schema_name.clone(),
                schema: Some(request.schema),
                strict: None,
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.user_prompt)
                    .build()?
                    .into(),
            ])
            .response_format(response_format)
            .build()?;

        let response: CreateChatCompletionResponse =
            self.client.chat().create(chat_request).await?;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .ok_or_else(|| anyhow!("LLM response had no content for '{}'", request.schema_name))?;

        debug!(schema = %request.schema_name, bytes = content.len(), "Received structured reply");
        parse_json_reply(content)
    }
}
