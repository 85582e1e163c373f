//! Argument validation - turns extracted arguments into a checked call
//!
//! Runs before any side effect. Missing parameters are collected and reported
//! together; type and path checks follow once every required name is present.

use crate::core::error::{DispatchError, Result};
use crate::core::sandbox::Sandbox;
use crate::core::types::Arguments;
use crate::operations::catalog::{OperationId, OperationSpec, ParamType};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// An operation whose arguments passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCall {
    pub operation: OperationId,
    pub arguments: Arguments,
}

impl ValidatedCall {
    pub fn has(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// A text argument
    pub fn text(&self, name: &str) -> Result<&str> {
        self.arguments
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(name))
    }

    pub fn optional_text(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }

    /// A path argument, already confined to the sandbox
    pub fn path(&self, name: &str) -> Result<&Path> {
        self.text(name).map(Path::new)
    }

    pub fn optional_path(&self, name: &str) -> Option<&Path> {
        self.optional_text(name).map(Path::new)
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        self.arguments
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(name))
    }

    pub fn strings(&self, name: &str) -> Result<Vec<String>> {
        let values = self
            .arguments
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(name))?;
        Ok(values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

fn missing(name: &str) -> DispatchError {
    DispatchError::MissingParameters(vec![name.to_string()])
}

/// Validate `arguments` against `spec`.
///
/// Undeclared arguments are dropped. Values are normalised: integers given as
/// numeric strings become numbers, a lone string for an array parameter
/// becomes a one-element array, and paths are replaced with their resolved
/// in-sandbox form.
pub fn validate(spec: &OperationSpec, arguments: Arguments, sandbox: &Sandbox) -> Result<ValidatedCall> {
    let missing: Vec<String> = spec
        .required
        .iter()
        .filter(|name| !arguments.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        warn!(operation = %spec.id, ?missing, "missing required parameters");
        return Err(DispatchError::MissingParameters(missing));
    }

    let mut checked = Arguments::new();
    for (name, value) in arguments {
        let Some(param) = spec.param(&name) else {
            warn!(operation = %spec.id, %name, "dropping undeclared argument");
            continue;
        };
        let value = check_value(&name, param.kind, value, sandbox)?;
        checked.insert(name, value);
    }

    Ok(ValidatedCall {
        operation: spec.id,
        arguments: checked,
    })
}

fn check_value(name: &str, kind: ParamType, value: Value, sandbox: &Sandbox) -> Result<Value> {
    match (kind, value) {
        (ParamType::Text, Value::String(s)) => Ok(Value::String(s)),
        (ParamType::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (ParamType::Integer, Value::Number(n)) if n.is_i64() => Ok(Value::Number(n)),
        (ParamType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| DispatchError::invalid(name, format!("'{}' is not an integer", s))),
        (ParamType::StringArray, Value::Array(items)) => {
            if items.iter().all(Value::is_string) {
                Ok(Value::Array(items))
            } else {
                Err(DispatchError::invalid(name, "expected a list of strings"))
            }
        }
        (ParamType::StringArray, Value::String(s)) => Ok(Value::Array(vec![Value::String(s)])),
        (ParamType::Path, Value::String(s)) => {
            let resolved: PathBuf = sandbox.confine(&s).map_err(|err| {
                warn!(%name, path = %s, "path outside sandbox");
                err
            })?;
            Ok(Value::String(resolved.to_string_lossy().into_owned()))
        }
        (kind, other) => Err(DispatchError::invalid(
            name,
            format!("expected {:?}, got {}", kind, other),
        )),
    }
}
