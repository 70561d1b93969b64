//! Argument encoding
//!
//! Walks a [`CommandSpec`] tree alongside the form values:
//! - scalar: value as-is (default when absent or blank)
//! - record: recurse field by field into an object
//! - list: recurse once per tuple into an array of objects

use crate::error::CommandError;
use crate::spec::{CommandSpec, DataType, ParameterNode, ParameterSpec};
use crate::validate::validate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Form values keyed by parameter id
pub type FormValues = Map<String, Value>;

/// Body of an insert, append or replace request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Package identifier
    #[serde(rename = "type")]
    pub package_id: String,
    /// Command identifier
    #[serde(rename = "id")]
    pub command_id: String,
    /// Encoded arguments keyed by parameter id
    pub arguments: Map<String, Value>,
}

impl CommandRequest {
    /// Create a request
    #[must_use]
    pub fn new(
        package_id: impl Into<String>,
        command_id: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            command_id: command_id.into(),
            arguments,
        }
    }

    /// Copy with one argument set
    #[must_use]
    pub fn with_argument(mut self, id: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(id.into(), value);
        self
    }

    /// Argument by id
    #[inline]
    #[must_use]
    pub fn argument(&self, id: &str) -> Option<&Value> {
        self.arguments.get(id)
    }

    /// Check whether this is a VIZUAL dataset-editing command
    #[inline]
    #[must_use]
    pub fn is_vizual(&self) -> bool {
        self.package_id == crate::vizual::PACKAGE_ID
    }

    /// JSON body
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": self.package_id,
            "id": self.command_id,
            "arguments": self.arguments,
        })
    }
}

/// Blank values count as absent
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Value the walk works with: the supplied one, else the declared default
pub(crate) fn effective<'a>(value: Option<&'a Value>, spec: &'a ParameterSpec) -> Option<&'a Value> {
    value
        .filter(|v| !is_blank(v))
        .or(spec.default.as_ref())
        .filter(|v| !is_blank(v))
}

/// Encode form values into a command request
///
/// Every top-level parameter gets a key; absent optional scalars encode as
/// `null`, absent lists as `[]`.
///
/// # Errors
/// `CommandError::MalformedArgument` when a record is not an object or a
/// list is not an array of objects. [`validate`] reports the same cases.
pub fn encode(spec: &CommandSpec, values: &FormValues) -> Result<CommandRequest, CommandError> {
    let arguments = encode_level(&spec.parameters, values)?;
    Ok(CommandRequest::new(
        spec.package_id.clone(),
        spec.command_id.clone(),
        arguments,
    ))
}

/// Validate, then encode
///
/// # Errors
/// `CommandError::Validation` with every message when validation fails.
pub fn prepare(spec: &CommandSpec, values: &FormValues) -> Result<CommandRequest, CommandError> {
    let messages = validate(spec, values);
    if !messages.is_empty() {
        return Err(CommandError::Validation(messages));
    }
    encode(spec, values)
}

fn encode_level(nodes: &[ParameterNode], values: &Map<String, Value>) -> Result<Map<String, Value>, CommandError> {
    nodes
        .iter()
        .map(|node| Ok((node.id().to_string(), encode_node(node, values.get(node.id()))?)))
        .collect()
}

fn malformed(node: &ParameterNode, expected: &'static str) -> CommandError {
    CommandError::MalformedArgument {
        parameter: node.id().to_string(),
        expected,
    }
}

fn encode_node(node: &ParameterNode, value: Option<&Value>) -> Result<Value, CommandError> {
    match node.spec.datatype {
        DataType::Record => match effective(value, &node.spec) {
            None => Ok(Value::Null),
            Some(Value::Object(fields)) => Ok(Value::Object(encode_level(&node.children, fields)?)),
            Some(_) => Err(malformed(node, "an object")),
        },
        DataType::List => match effective(value, &node.spec) {
            None => Ok(Value::Array(Vec::new())),
            Some(Value::Array(tuples)) => tuples
                .iter()
                .map(|tuple| match tuple {
                    Value::Object(fields) => Ok(Value::Object(encode_level(&node.children, fields)?)),
                    _ => Err(malformed(node, "a list of objects")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Some(_) => Err(malformed(node, "a list")),
        },
        _ => Ok(effective(value, &node.spec).cloned().unwrap_or(Value::Null)),
    }
}
