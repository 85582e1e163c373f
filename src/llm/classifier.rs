//! Classify a free-text task into one registry operation
//!
//! The model acts purely as a classifier and slot filler over the closed
//! operation set. Whatever it returns is checked against the registry here;
//! ambiguity, refusals and unknown names all collapse to "no match".

use crate::core::error::{DispatchError, Result};
use crate::core::types::{Arguments, ClassificationResult};
use crate::llm::LanguageModel;
use crate::operations::catalog::OperationRegistry;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Ask the model to select at most one operation for `task`
pub async fn classify(
    model: &dyn LanguageModel,
    registry: &OperationRegistry,
    task: &str,
) -> Result<ClassificationResult> {
    let tools = registry.tool_definitions();
    let prompt = format!("{}\n\nTASK:\n{}", CLASSIFY_PROMPT, task);

    let Some(call) = model.select_function(&prompt, &tools).await? else {
        info!("classifier selected no operation");
        return Ok(ClassificationResult::no_match());
    };

    if registry.get(&call.name).is_none() {
        warn!(name = %call.name, "model selected an operation outside the registry");
        return Ok(ClassificationResult::no_match());
    }

    let arguments = into_arguments(call.arguments)?;
    debug!(operation = %call.name, ?arguments, "classified task");
    Ok(ClassificationResult::matched(call.name, arguments))
}

/// Arguments must be a JSON object; `null` means none were extracted
fn into_arguments(value: Value) -> Result<Arguments> {
    match value {
        Value::Object(map) => Ok(drop_nulls(map)),
        Value::Null => Ok(Arguments::new()),
        other => Err(DispatchError::UpstreamProvider(format!(
            "Function arguments must be a JSON object, got: {}",
            other
        ))),
    }
}

/// Models sometimes emit `"param": null` for values they could not find
fn drop_nulls(mut map: Arguments) -> Arguments {
    map.retain(|_, v| !v.is_null());
    map
}

const CLASSIFY_PROMPT: &str = r#"Select the single function that performs the task below and extract its arguments from the task text.
Only use argument values that appear in the task. Keep file paths exactly as written.
If no function clearly matches, do not call any function."#;
