//! Encode/validate agreement
//!
//! Whatever `validate` accepts, `encode` must turn into a request carrying a
//! key for every top-level parameter.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use vizier_command::{encode, prepare, validate, CommandSpec, DataType, ParameterSpec};

fn scalar_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::String),
        Just(DataType::Int),
        Just(DataType::Decimal),
        Just(DataType::Bool),
        Just(DataType::ColumnId),
        Just(DataType::RowId),
        Just(DataType::FileId),
    ]
}

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(|b| json!(b)),
        "[a-z0-9 ]{0,6}".prop_map(Value::String),
        Just(json!({"url": "http://x/file.csv"})),
        Just(json!({"fileid": "f1"})),
        Just(json!([{"k": 1}])),
    ]
}

fn spec_and_values() -> impl Strategy<Value = (CommandSpec, Map<String, Value>)> {
    prop::collection::vec((scalar_type(), any::<bool>(), any_value()), 1..6).prop_map(|params| {
        let mut declarations = Vec::new();
        let mut values = Map::new();
        for (i, (datatype, required, value)) in params.into_iter().enumerate() {
            let id = format!("p{i}");
            let mut spec = ParameterSpec::new(id.clone(), datatype).at(i as i64);
            if required {
                spec = spec.required();
            }
            declarations.push(spec);
            values.insert(id, value);
        }
        // One group parameter with a scalar child
        let group = format!("g{}", declarations.len());
        declarations.push(ParameterSpec::new(group.clone(), DataType::List).at(100));
        declarations.push(ParameterSpec::new("child", DataType::Int).child_of(group.clone()).at(101));
        values.insert(group, json!([{"child": 1}, {"child": "2"}]));

        (CommandSpec::new("pkg", "cmd", declarations), values)
    })
}

fn blank() -> impl Strategy<Value = Value> {
    prop_oneof![Just(Value::Null), "[ \t]{0,4}".prop_map(Value::String)]
}

proptest! {
    #[test]
    fn prop_blank_values_encode_as_default(
        datatype in scalar_type(),
        default in prop_oneof![Just(json!(7)), Just(json!("x")), Just(json!(true))],
        value in blank(),
    ) {
        let spec = CommandSpec::new(
            "pkg",
            "cmd",
            vec![ParameterSpec::new("p0", datatype).with_default(default.clone()).at(0)],
        );
        let mut values = Map::new();
        values.insert("p0".to_string(), value);

        let request = encode(&spec, &values).expect("blank scalars must encode");
        prop_assert_eq!(&request.arguments["p0"], &default);
    }

    #[test]
    fn prop_valid_values_always_encode((spec, values) in spec_and_values()) {
        if validate(&spec, &values).is_empty() {
            let request = encode(&spec, &values).expect("validated values must encode");
            for node in &spec.parameters {
                prop_assert!(request.arguments.contains_key(node.id()));
            }
            prop_assert_eq!(request.package_id.as_str(), "pkg");
        }
    }

    #[test]
    fn prop_validate_is_deterministic((spec, values) in spec_and_values()) {
        prop_assert_eq!(validate(&spec, &values), validate(&spec, &values));
    }
}

#[test]
fn prepare_returns_every_message() {
    let spec = CommandSpec::new(
        "vizual",
        "updateCell",
        vec![
            ParameterSpec::new("dataset", DataType::Dataset).required().at(0),
            ParameterSpec::new("column", DataType::ColumnId).required().at(1),
            ParameterSpec::new("row", DataType::RowId).required().at(2),
            ParameterSpec::new("value", DataType::String).at(3),
        ],
    );
    let values = json!({"column": "three"}).as_object().cloned().unwrap();

    let err = prepare(&spec, &values).unwrap_err();
    assert_eq!(
        err.messages(),
        &[
            "Missing value for 'dataset'".to_string(),
            "Expected an integer value for 'column'".to_string(),
            "Missing value for 'row'".to_string(),
        ]
    );
}
