//! Argument validation
//!
//! Runs the same recursive walk as [`crate::encode`] and collects one message
//! per offending leaf. Never mutates the values.

use crate::encode::{effective, FormValues};
use crate::file::FileArgument;
use crate::spec::{CommandSpec, DataType, ParameterNode};
use serde_json::{Map, Value};

/// Validate form values against a command spec
///
/// Returns an empty list when the values may be submitted.
#[must_use]
pub fn validate(spec: &CommandSpec, values: &FormValues) -> Vec<String> {
    let mut messages = Vec::new();
    validate_level(&spec.parameters, values, None, &mut messages);
    messages
}

fn validate_level(
    nodes: &[ParameterNode],
    values: &Map<String, Value>,
    context: Option<&str>,
    out: &mut Vec<String>,
) {
    for node in nodes {
        validate_node(node, values.get(node.id()), context, out);
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_decimal(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn validate_node(node: &ParameterNode, value: Option<&Value>, context: Option<&str>, out: &mut Vec<String>) {
    let spec = &node.spec;
    let label = match context {
        Some(ctx) => format!("{ctx} / {}", spec.name),
        None => spec.name.clone(),
    };
    let value = effective(value, spec);

    match spec.datatype {
        DataType::List => match value {
            Some(Value::Array(tuples)) => {
                if tuples.is_empty() && spec.required {
                    out.push(format!("'{label}' requires at least one entry"));
                }
                for (i, tuple) in tuples.iter().enumerate() {
                    let row = format!("{label} #{}", i + 1);
                    match tuple {
                        Value::Object(fields) => validate_level(&node.children, fields, Some(&row), out),
                        _ => out.push(format!("'{row}' must be a set of named values")),
                    }
                }
            }
            Some(_) => out.push(format!("'{label}' must be a list")),
            None if spec.required => out.push(format!("'{label}' requires at least one entry")),
            None => {}
        },
        DataType::Record => match value {
            Some(Value::Object(fields)) => validate_level(&node.children, fields, Some(&label), out),
            Some(_) => out.push(format!("'{label}' must be a record")),
            None if spec.required => out.push(format!("Missing value for '{label}'")),
            None => {}
        },
        _ => match value {
            None if spec.required => out.push(format!("Missing value for '{label}'")),
            None => {}
            Some(v) => match spec.datatype {
                DataType::Int | DataType::ColumnId if !is_integer(v) => {
                    out.push(format!("Expected an integer value for '{label}'"));
                }
                DataType::Decimal if !is_decimal(v) => {
                    out.push(format!("Expected a decimal value for '{label}'"));
                }
                DataType::FileId if FileArgument::from_value(v).is_none() => {
                    out.push(format!(
                        "Invalid file for '{label}': expected an uploaded file or a URL"
                    ));
                }
                _ => {}
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ParameterSpec;
    use serde_json::json;

    fn spec() -> CommandSpec {
        CommandSpec::new(
            "vizual",
            "load",
            vec![
                ParameterSpec::new("name", DataType::String).required().at(0),
                ParameterSpec::new("file", DataType::FileId).required().at(1),
                ParameterSpec::new("limit", DataType::Int).at(2),
                ParameterSpec::new("ratio", DataType::Decimal).at(3),
                ParameterSpec::new("options", DataType::List).at(4),
                ParameterSpec::new("key", DataType::String).child_of("options").required().at(5),
            ],
        )
    }

    fn values(json: Value) -> FormValues {
        json.as_object().cloned().unwrap()
    }

    #[test]
    fn valid_values_have_no_messages() {
        let messages = validate(
            &spec(),
            &values(json!({
                "name": "people",
                "file": {"url": "http://x/people.csv"},
                "limit": "10",
                "ratio": 0.5,
                "options": [{"key": "delimiter"}]
            })),
        );
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn every_bad_leaf_is_reported() {
        let messages = validate(
            &spec(),
            &values(json!({
                "name": "  ",
                "file": {"filename": "people.csv"},
                "limit": "ten",
                "ratio": "abc",
                "options": [{"key": ""}, 3]
            })),
        );
        assert_eq!(
            messages,
            vec![
                "Missing value for 'name'".to_string(),
                "Invalid file for 'file': expected an uploaded file or a URL".to_string(),
                "Expected an integer value for 'limit'".to_string(),
                "Expected a decimal value for 'ratio'".to_string(),
                "Missing value for 'options #1 / key'".to_string(),
                "'options #2' must be a set of named values".to_string(),
            ]
        );
    }

    #[test]
    fn required_group_must_not_be_empty() {
        let spec = CommandSpec::new(
            "p",
            "c",
            vec![
                ParameterSpec::new("cols", DataType::List).required(),
                ParameterSpec::new("c", DataType::ColumnId).child_of("cols"),
            ],
        );
        assert_eq!(validate(&spec, &values(json!({"cols": []}))).len(), 1);
        assert_eq!(validate(&spec, &values(json!({}))).len(), 1);
    }

    #[test]
    fn validation_does_not_mutate() {
        let input = values(json!({"limit": "x"}));
        let before = input.clone();
        let _ = validate(&spec(), &input);
        assert_eq!(input, before);
    }
}
