//! Async LLM client over HTTP
//!
//! Model-agnostic: speaks the Anthropic Messages format when the URL points
//! at anthropic.com and the OpenAI chat-completions format otherwise.
//! Every round trip is bounded by the configured timeout.

use crate::core::config::LlmConfig;
use crate::core::error::{DispatchError, Result};
use crate::llm::{FunctionCall, LanguageModel, ToolDefinition, ANSWER_ONLY_PROMPT};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

pub struct HttpLanguageModel {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    embeddings_url: String,
    embedding_model: String,
    api_format: ApiFormat,
    timeout: Duration,
}

impl HttpLanguageModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DispatchError::Config("LLM_API_KEY not set".into()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            api_format: Self::detect_api_format(&config.api_url),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            embeddings_url: config.embeddings_url.clone(),
            embedding_model: config.embedding_model.clone(),
            timeout: config.timeout(),
        })
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// POST a JSON body and decode the response, within the timeout
    async fn send<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body);

        request = match self.api_format {
            ApiFormat::Anthropic if url == self.api_url => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            _ => request.header("Authorization", format!("Bearer {}", self.api_key)),
        };

        let round_trip = async {
            let response = request
                .send()
                .await
                .map_err(|e| DispatchError::UpstreamProvider(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(DispatchError::UpstreamProvider(format!(
                    "API error ({}): {}",
                    status, error_text
                )));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| DispatchError::UpstreamProvider(e.to_string()))
        };

        tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|_| DispatchError::UpstreamTimeout {
                what: "LLM request".into(),
                after: self.timeout,
            })?
    }

    async fn chat_openai(&self, messages: Vec<Message>) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages,
            tools: None,
            tool_choice: None,
        };
        let completion: OpenAIResponse = self.send(&self.api_url, &request).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DispatchError::UpstreamProvider("Empty response".into()))
    }

    async fn chat_anthropic(&self, system: &str, messages: Vec<Message>) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: system.into(),
            messages,
            tools: None,
        };
        let completion: AnthropicResponse = self.send(&self.api_url, &request).await?;
        completion
            .content
            .into_iter()
            .find_map(|block| match block {
                AnthropicBlock::Text { text } => Some(text),
                _ => None,
            })
            .ok_or_else(|| DispatchError::UpstreamProvider("Empty response".into()))
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        debug!(model = %self.model, "text completion");
        match self.api_format {
            ApiFormat::Anthropic => {
                self.chat_anthropic(system, vec![Message::text("user", user)])
                    .await
            }
            ApiFormat::OpenAI => {
                self.chat_openai(vec![
                    Message::text("system", system),
                    Message::text("user", user),
                ])
                .await
            }
        }
    }

    async fn complete_with_image(&self, prompt: &str, image_data_url: &str) -> Result<String> {
        debug!(model = %self.model, "vision completion");
        match self.api_format {
            ApiFormat::Anthropic => {
                let (media_type, data) = split_data_url(image_data_url)?;
                let parts = vec![
                    ContentPart::Image {
                        source: ImageSource {
                            kind: "base64".into(),
                            media_type: media_type.into(),
                            data: data.into(),
                        },
                    },
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                ];
                self.chat_anthropic(
                    ANSWER_ONLY_PROMPT,
                    vec![Message {
                        role: "user".into(),
                        content: MessageContent::Parts(parts),
                    }],
                )
                .await
            }
            ApiFormat::OpenAI => {
                let parts = vec![
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url.into(),
                        },
                    },
                ];
                self.chat_openai(vec![
                    Message::text("system", ANSWER_ONLY_PROMPT),
                    Message {
                        role: "user".into(),
                        content: MessageContent::Parts(parts),
                    },
                ])
                .await
            }
        }
    }

    async fn select_function(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<FunctionCall>> {
        debug!(model = %self.model, tools = tools.len(), "function selection");
        match self.api_format {
            ApiFormat::Anthropic => {
                let request = AnthropicRequest {
                    model: self.model.clone(),
                    max_tokens: 4096,
                    system: String::new(),
                    messages: vec![Message::text("user", prompt)],
                    tools: Some(
                        tools
                            .iter()
                            .map(|t| AnthropicTool {
                                name: t.name.clone(),
                                description: t.description.clone(),
                                input_schema: t.parameters.clone(),
                            })
                            .collect(),
                    ),
                };
                let completion: AnthropicResponse = self.send(&self.api_url, &request).await?;
                Ok(completion.content.into_iter().find_map(|block| match block {
                    AnthropicBlock::ToolUse { name, input } => Some(FunctionCall {
                        name,
                        arguments: input,
                    }),
                    _ => None,
                }))
            }
            ApiFormat::OpenAI => {
                let request = OpenAIRequest {
                    model: self.model.clone(),
                    messages: vec![Message::text("user", prompt)],
                    tools: Some(
                        tools
                            .iter()
                            .map(|t| OpenAITool {
                                kind: "function".into(),
                                function: t.clone(),
                            })
                            .collect(),
                    ),
                    tool_choice: Some("auto".into()),
                };
                let completion: OpenAIResponse = self.send(&self.api_url, &request).await?;
                let Some(call) = completion
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.tool_calls.and_then(|calls| calls.into_iter().next()))
                else {
                    return Ok(None);
                };
                let arguments = parse_arguments(&call.function.arguments)?;
                Ok(Some(FunctionCall {
                    name: call.function.name,
                    arguments,
                }))
            }
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(model = %self.embedding_model, count = texts.len(), "embeddings");
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };
        let response: EmbeddingResponse = self.send(&self.embeddings_url, &request).await?;
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(DispatchError::UpstreamProvider(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// OpenAI returns arguments as a JSON-encoded string
fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| {
        DispatchError::UpstreamProvider(format!("Malformed function arguments: {} - {}", e, raw))
    })
}

/// `data:image/png;base64,AAAA` -> ("image/png", "AAAA")
fn split_data_url(url: &str) -> Result<(&str, &str)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| DispatchError::OperationFailed("Image is not a data URL".into()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| DispatchError::OperationFailed("Malformed data URL".into()))?;
    let media_type = meta.strip_suffix(";base64").unwrap_or(meta);
    Ok((media_type, data))
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: MessageContent,
}

impl Message {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: String,
    media_type: String,
    data: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    kind: String,
    function: ToolDefinition,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Deserialize)]
struct ToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

// Embeddings (OpenAI-compatible)
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
