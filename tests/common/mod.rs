//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use task_dispatch::command::Dispatcher;
use task_dispatch::core::config::{DispatchConfig, NoMatchPolicy};
use task_dispatch::core::error::Result;
use task_dispatch::llm::{FunctionCall, LanguageModel, ToolDefinition};
use task_dispatch::operations::OperationRegistry;
use task_dispatch::process::{CommandRunner, ProcessOutput};

/// Model that always makes the same selection and gives the same reply
#[derive(Default)]
pub struct ScriptedModel {
    pub selection: Option<FunctionCall>,
    pub completion: String,
    pub embeddings: Vec<Vec<f32>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn selecting(name: &str, arguments: Value) -> Self {
        Self {
            selection: Some(FunctionCall {
                name: name.to_string(),
                arguments,
            }),
            ..Self::default()
        }
    }

    pub fn replying(completion: &str) -> Self {
        Self {
            completion: completion.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(self.completion.clone())
    }

    async fn complete_with_image(&self, prompt: &str, _image: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.completion.clone())
    }

    async fn select_function(
        &self,
        prompt: &str,
        _tools: &[ToolDefinition],
    ) -> Result<Option<FunctionCall>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.selection.clone())
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.embeddings.clone())
    }
}

/// Records every command; fails those whose line contains `fail_on`
#[derive(Default)]
pub struct RecordingRunner {
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: Option<&Path>,
        _timeout: Duration,
    ) -> Result<ProcessOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        let failed = self
            .fail_on
            .as_deref()
            .is_some_and(|needle| line.contains(needle));
        self.calls.lock().unwrap().push(line);
        Ok(ProcessOutput {
            status: Some(if failed { 1 } else { 0 }),
            stdout: String::new(),
            stderr: if failed {
                "ERROR: No matching distribution found".into()
            } else {
                String::new()
            },
        })
    }
}

pub fn config(root: &Path, policy: NoMatchPolicy) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.sandbox.root = root.to_path_buf();
    config.dispatch.no_match_policy = policy;
    config
}

pub fn dispatcher(
    config: DispatchConfig,
    model: Arc<ScriptedModel>,
    runner: Arc<RecordingRunner>,
) -> Dispatcher {
    Dispatcher::new(
        Arc::new(config),
        Arc::new(OperationRegistry::builtin()),
        model,
        runner,
    )
}

/// Path under `root` as a string argument
pub fn under(root: &Path, name: &str) -> String {
    root.join(name).to_string_lossy().into_owned()
}
