//! Request orchestration
//!
//! Sequences one task through the pipeline:
//! text -> working-language gate -> classifier -> validator -> operation or synthesis

use crate::command::validator::{validate, ValidatedCall};
use crate::core::config::{DispatchConfig, NoMatchPolicy};
use crate::core::error::{DispatchError, Result};
use crate::core::sandbox::Sandbox;
use crate::core::types::{TaskRequest, TaskResponse};
use crate::llm::classifier::classify;
use crate::llm::translate::ensure_working_language;
use crate::llm::LanguageModel;
use crate::operations::{self, OperationContext, OperationRegistry};
use crate::process::CommandRunner;
use crate::synthesis::{synthesize, SynthesisRequest};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Runs tasks against a fixed registry and collaborator set.
///
/// Holds no per-request state; one instance serves every request.
pub struct Dispatcher {
    config: Arc<DispatchConfig>,
    registry: Arc<OperationRegistry>,
    model: Arc<dyn LanguageModel>,
    runner: Arc<dyn CommandRunner>,
    sandbox: Sandbox,
}

impl Dispatcher {
    pub fn new(
        config: Arc<DispatchConfig>,
        registry: Arc<OperationRegistry>,
        model: Arc<dyn LanguageModel>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let sandbox = Sandbox::new(&config.sandbox.root);
        Self {
            config,
            registry,
            model,
            runner,
            sandbox,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run one task to completion or to its first error
    pub async fn run(&self, request: TaskRequest) -> Result<TaskResponse> {
        let span = info_span!("run", request_id = %request.id);
        let id = request.id;
        async move {
            let outcome = self.dispatch(&request.text).await;
            match &outcome {
                Ok(response) => info!(request_id = %id, response = %response, "task completed"),
                Err(err) => warn!(request_id = %id, status = err.status(), error = %err, "task failed"),
            }
            outcome.map(TaskResponse::completed)
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(DispatchError::MissingTaskParameter);
        }

        let task = if self.config.dispatch.translate {
            ensure_working_language(self.model.as_ref(), text).await?
        } else {
            text.to_string()
        };

        let classification = classify(self.model.as_ref(), &self.registry, &task).await?;
        let Some(name) = classification.operation else {
            return self.on_no_match(&task).await;
        };
        let spec = self
            .registry
            .get(&name)
            .ok_or(DispatchError::NoMatchingOperation)?;

        let call = validate(spec, classification.arguments, &self.sandbox)?;
        info!(operation = %call.operation, "arguments validated");

        if call.operation.is_synthesis() {
            self.synthesize_for(&task, &call).await
        } else {
            operations::execute(self.context(), &call).await
        }
    }

    async fn on_no_match(&self, task: &str) -> Result<String> {
        match self.config.dispatch.no_match_policy {
            NoMatchPolicy::Reject => Err(DispatchError::NoMatchingOperation),
            NoMatchPolicy::Synthesize => {
                info!("no operation matched, synthesizing code");
                let request = SynthesisRequest {
                    task,
                    input: None,
                    output: None,
                };
                synthesize(self.context(), &self.sandbox, &request).await
            }
        }
    }

    async fn synthesize_for(&self, task: &str, call: &ValidatedCall) -> Result<String> {
        let request = SynthesisRequest {
            task,
            input: call.optional_path("input"),
            output: call.optional_path("output"),
        };
        synthesize(self.context(), &self.sandbox, &request).await
    }

    fn context(&self) -> OperationContext<'_> {
        OperationContext {
            config: &self.config,
            model: self.model.as_ref(),
            runner: self.runner.as_ref(),
        }
    }
}
