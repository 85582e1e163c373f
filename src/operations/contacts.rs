//! Contact list sorting

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{read_text, saved_to, write_output};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

pub async fn sort_contacts(call: &ValidatedCall) -> Result<String> {
    let conditions = call.strings("conditions")?;
    if conditions.is_empty() {
        return Err(DispatchError::invalid("conditions", "at least one sort key is required"));
    }
    let input = call.path("input")?;
    let output = call.path("output")?;

    let raw = read_text(input).await?;
    let contacts: Vec<Value> = serde_json::from_str(&raw)
        .map_err(|e| DispatchError::invalid("input", format!("expected a JSON array: {}", e)))?;

    let sorted = sort_by_keys(contacts, &conditions);
    write_output(output, to_pretty_json(&sorted)?).await?;
    Ok(saved_to(output))
}

/// Stable sort by the tuple of `keys`
pub fn sort_by_keys(mut contacts: Vec<Value>, keys: &[String]) -> Vec<Value> {
    contacts.sort_by(|a, b| {
        keys.iter()
            .map(|key| compare_field(a.get(key), b.get(key)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    contacts
}

/// Missing sorts first, then numbers, then strings, then anything else
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Pretty JSON with a 4-space indent
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
