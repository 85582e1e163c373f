//! Core type definitions shared across the dispatch pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Extracted argument values keyed by parameter name
pub type Arguments = Map<String, Value>;

/// Identifier attached to every request for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One incoming free-text task
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub id: RequestId,
    pub text: String,
}

impl TaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            text: text.into(),
        }
    }
}

/// Output of the intent classifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    /// Registry name of the selected operation, `None` for no match
    pub operation: Option<String>,
    pub arguments: Arguments,
}

impl ClassificationResult {
    pub fn matched(operation: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            operation: Some(operation.into()),
            arguments,
        }
    }

    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.operation.is_some()
    }
}

/// Uniform success envelope returned by `/run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub message: String,
    pub response: String,
}

impl TaskResponse {
    pub fn completed(response: impl Into<String>) -> Self {
        Self {
            message: "Task completed successfully".into(),
            response: response.into(),
        }
    }
}
