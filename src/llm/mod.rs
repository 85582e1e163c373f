//! Language model capabilities consumed by the dispatcher
//!
//! The pipeline only ever talks to [`LanguageModel`]; the HTTP client is one
//! implementation and tests provide scripted ones.

pub mod classifier;
pub mod client;
pub mod translate;

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::HttpLanguageModel;

/// A function the model may select, in JSON-schema form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the arguments
    pub parameters: Value,
}

/// The model's selection: a function name plus its raw arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Plain completion: system instructions plus one user message
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Completion over a prompt and one image given as a `data:` URL
    async fn complete_with_image(&self, prompt: &str, image_data_url: &str) -> Result<String>;

    /// Constrained selection of at most one tool.
    ///
    /// `Ok(None)` means the model answered without selecting anything.
    async fn select_function(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
    ) -> Result<Option<FunctionCall>>;

    /// One embedding vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// System prompt shared by the plain completions
pub const ANSWER_ONLY_PROMPT: &str =
    "You are a helpful assistant. Reply only with the answer the user is looking for, no added texts.";
