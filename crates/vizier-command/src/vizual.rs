//! VIZUAL dataset-editing commands
//!
//! Each builder returns a plain [`CommandRequest`], so the reconciliation
//! engine submits these exactly like any other pipeline command.

use crate::encode::CommandRequest;
use crate::file::FileArgument;
use serde_json::{json, Map, Value};

/// Package identifier of the VIZUAL commands
pub const PACKAGE_ID: &str = "vizual";

/// Command identifiers
pub mod command {
    /// Delete a column
    pub const DELETE_COLUMN: &str = "deleteColumn";
    /// Delete a row
    pub const DELETE_ROW: &str = "deleteRow";
    /// Drop a dataset
    pub const DROP_DATASET: &str = "dropDataset";
    /// Insert a column
    pub const INSERT_COLUMN: &str = "insertColumn";
    /// Insert a row
    pub const INSERT_ROW: &str = "insertRow";
    /// Load a dataset from a file
    pub const LOAD: &str = "load";
    /// Move a column
    pub const MOVE_COLUMN: &str = "moveColumn";
    /// Move a row
    pub const MOVE_ROW: &str = "moveRow";
    /// Rename a column
    pub const RENAME_COLUMN: &str = "renameColumn";
    /// Rename a dataset
    pub const RENAME_DATASET: &str = "renameDataset";
    /// Sort a dataset
    pub const SORT_DATASET: &str = "sortDataset";
    /// Update a cell value
    pub const UPDATE_CELL: &str = "updateCell";
    /// Update a cell annotation
    pub const UPDATE_ANNOTATION: &str = "updateAnnotation";
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Options of a `load` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// File format (`csv`, `json`, ...)
    pub format: String,
    /// Infer column types
    pub infer_types: bool,
    /// Treat the first line as header
    pub detect_headers: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            infer_types: true,
            detect_headers: true,
        }
    }
}

fn request(command_id: &str, arguments: Value) -> CommandRequest {
    let arguments: Map<String, Value> = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    CommandRequest::new(PACKAGE_ID, command_id, arguments)
}

/// Delete a column
#[must_use]
pub fn delete_column(dataset: &str, column: i64) -> CommandRequest {
    request(command::DELETE_COLUMN, json!({"dataset": dataset, "column": column}))
}

/// Delete a row
#[must_use]
pub fn delete_row(dataset: &str, row: &str) -> CommandRequest {
    request(command::DELETE_ROW, json!({"dataset": dataset, "row": row}))
}

/// Drop a dataset
#[must_use]
pub fn drop_dataset(dataset: &str) -> CommandRequest {
    request(command::DROP_DATASET, json!({"dataset": dataset}))
}

/// Insert a column at a position (`None` appends)
#[must_use]
pub fn insert_column(dataset: &str, position: Option<u64>, name: &str) -> CommandRequest {
    request(
        command::INSERT_COLUMN,
        json!({"dataset": dataset, "position": position, "name": name}),
    )
}

/// Insert a row at a position (`None` appends)
#[must_use]
pub fn insert_row(dataset: &str, position: Option<u64>) -> CommandRequest {
    request(command::INSERT_ROW, json!({"dataset": dataset, "position": position}))
}

/// Load a dataset from a file
#[must_use]
pub fn load_dataset(name: &str, file: &FileArgument, options: &LoadOptions) -> CommandRequest {
    request(
        command::LOAD,
        json!({
            "name": name,
            "file": file.to_value(),
            "loadFormat": options.format,
            "loadInferTypes": options.infer_types,
            "loadDetectHeaders": options.detect_headers,
        }),
    )
}

/// Move a column to a new position
#[must_use]
pub fn move_column(dataset: &str, column: i64, position: u64) -> CommandRequest {
    request(
        command::MOVE_COLUMN,
        json!({"dataset": dataset, "column": column, "position": position}),
    )
}

/// Move a row to a new position
#[must_use]
pub fn move_row(dataset: &str, row: &str, position: u64) -> CommandRequest {
    request(
        command::MOVE_ROW,
        json!({"dataset": dataset, "row": row, "position": position}),
    )
}

/// Rename a column
#[must_use]
pub fn rename_column(dataset: &str, column: i64, name: &str) -> CommandRequest {
    request(
        command::RENAME_COLUMN,
        json!({"dataset": dataset, "column": column, "name": name}),
    )
}

/// Rename a dataset
#[must_use]
pub fn rename_dataset(dataset: &str, name: &str) -> CommandRequest {
    request(command::RENAME_DATASET, json!({"dataset": dataset, "name": name}))
}

/// Sort a dataset by one or more columns
#[must_use]
pub fn sort_dataset(dataset: &str, columns: &[(i64, SortOrder)]) -> CommandRequest {
    let columns: Vec<Value> = columns
        .iter()
        .map(|(column, order)| json!({"column": column, "order": order.as_str()}))
        .collect();
    request(command::SORT_DATASET, json!({"dataset": dataset, "columns": columns}))
}

/// Update a single cell value
#[must_use]
pub fn update_cell(dataset: &str, column: i64, row: &str, value: Value) -> CommandRequest {
    request(
        command::UPDATE_CELL,
        json!({"dataset": dataset, "column": column, "row": row, "value": value}),
    )
}

/// Set an annotation on a cell
#[must_use]
pub fn update_annotation(dataset: &str, column: i64, row: &str, key: &str, value: Value) -> CommandRequest {
    request(
        command::UPDATE_ANNOTATION,
        json!({"dataset": dataset, "column": column, "row": row, "key": key, "value": value}),
    )
}
