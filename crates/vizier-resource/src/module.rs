//! Workflow modules
//!
//! A module is one command instance inside a workflow version: the command
//! and its arguments, the datasets and charts it produced, what it printed,
//! when it ran and how it ended.

use crate::chart::ChartDescriptor;
use crate::dataset::{DatasetDescriptor, DatasetIndex};
use crate::links::LinkTable;
use crate::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Module identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl ModuleId {
    /// Create a module id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Module execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleState {
    /// Waiting to be executed
    #[default]
    Pending,
    /// Currently executing
    Running,
    /// Execution was cancelled
    Canceled,
    /// Execution failed
    Error,
    /// Execution finished successfully
    Success,
}

impl ModuleState {
    /// Decode the wire state: numeric code or case-insensitive name
    ///
    /// Unknown values decode as `Pending`.
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        match json {
            Value::Number(n) => match n.as_i64() {
                Some(1) => Self::Running,
                Some(2) => Self::Canceled,
                Some(3) => Self::Error,
                Some(4) => Self::Success,
                _ => Self::Pending,
            },
            Value::String(s) => match s.to_ascii_uppercase().as_str() {
                "RUNNING" => Self::Running,
                "CANCELED" | "CANCELLED" => Self::Canceled,
                "ERROR" => Self::Error,
                "SUCCESS" => Self::Success,
                _ => Self::Pending,
            },
            _ => Self::Pending,
        }
    }

    /// Pending or running
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Error or canceled: the cell poisons everything after it
    #[inline]
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::Canceled)
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Canceled => "CANCELED",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        };
        f.pad(name)
    }
}

/// One captured output entry
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    /// MIME-like type tag (`text/plain`, `chart/view`, ...)
    pub kind: String,
    /// Payload
    pub value: Value,
}

impl OutputEntry {
    /// Plain text type tag
    pub const TEXT_PLAIN: &'static str = "text/plain";

    /// Create an entry
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, value: Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    /// Plain text entry
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Self::TEXT_PLAIN, Value::String(value.into()))
    }

    /// Hydrate from `{type, value}`; bare strings are plain text
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        match json {
            Value::String(s) => Self::text(s.clone()),
            _ => Self {
                kind: wire::str_field(json, "type").unwrap_or_else(|| Self::TEXT_PLAIN.to_string()),
                value: json.get("value").cloned().unwrap_or(Value::Null),
            },
        }
    }

    /// Text content of the entry, if it is a string
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Module timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamps {
    /// When the module was created
    pub created_at: Option<DateTime<Utc>>,
    /// When execution started
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self {
            created_at: wire::timestamp_field(json, "createdAt"),
            started_at: wire::timestamp_field(json, "startedAt"),
            finished_at: wire::timestamp_field(json, "finishedAt"),
        }
    }

    /// Execution time, when both ends are known
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

/// Command of a module with its folded arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleCommand {
    /// Package identifier (e.g. `vizual`)
    pub package_id: String,
    /// Command identifier (e.g. `updateCell`)
    pub command_id: String,
    /// Arguments keyed by name
    pub arguments: Map<String, Value>,
}

impl ModuleCommand {
    /// Hydrate from wire JSON, folding the argument list into a mapping
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self {
            package_id: wire::str_field(json, "packageId").unwrap_or_default(),
            command_id: wire::str_field(json, "commandId").unwrap_or_default(),
            arguments: json
                .get("arguments")
                .map(fold_arguments)
                .unwrap_or_default(),
        }
    }

    /// Argument value by name
    #[inline]
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// `package.command` label
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.package_id, self.command_id)
    }
}

/// Fold `[{name, value}, ...]` into `{name: value, ...}`
///
/// Nested record values (lists of pairs) and group values (lists of lists of
/// pairs) are folded recursively. An argument object that is already a
/// mapping is returned as is.
#[must_use]
pub fn fold_arguments(json: &Value) -> Map<String, Value> {
    match json {
        Value::Object(map) => map.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|pair| {
                let name = wire::str_field(pair, "name").or_else(|| wire::str_field(pair, "id"))?;
                let value = pair.get("value").map(fold_value).unwrap_or(Value::Null);
                Some((name, value))
            })
            .collect(),
        _ => Map::new(),
    }
}

fn is_pair_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.get("value").is_some() && (item.get("name").is_some() || item.get("id").is_some())
        })
}

fn fold_value(value: &Value) -> Value {
    match value {
        Value::Array(items) if is_pair_list(items) => Value::Object(fold_arguments(value)),
        Value::Array(items)
            if !items.is_empty()
                && items
                    .iter()
                    .all(|t| t.as_array().is_some_and(|pairs| is_pair_list(pairs))) =>
        {
            Value::Array(items.iter().map(|t| Value::Object(fold_arguments(t))).collect())
        }
        other => other.clone(),
    }
}

/// One command instance within a workflow version
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module identifier
    pub id: ModuleId,
    /// Command and folded arguments
    pub command: ModuleCommand,
    /// Human-readable command text
    pub text: Option<String>,
    /// Datasets produced, sorted by name
    pub datasets: Vec<DatasetDescriptor>,
    /// Charts produced, sorted by name
    pub charts: Vec<ChartDescriptor>,
    /// Captured standard output
    pub stdout: Vec<OutputEntry>,
    /// Captured standard error
    pub stderr: Vec<OutputEntry>,
    /// Execution timestamps
    pub timestamps: Timestamps,
    /// Hypermedia links
    pub links: LinkTable,
    /// Execution state
    pub state: ModuleState,
}

impl Module {
    /// Hydrate from wire JSON without a workflow-level dataset index
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self::from_wire_indexed(json, &DatasetIndex::new())
    }

    /// Hydrate from wire JSON, resolving dataset references against the
    /// workflow's dataset index
    ///
    /// References that are not in the index are kept as the (possibly
    /// partial) descriptor the module itself listed.
    #[must_use]
    pub fn from_wire_indexed(json: &Value, index: &DatasetIndex) -> Self {
        let mut datasets: Vec<DatasetDescriptor> = wire::array_field(json, "datasets")
            .iter()
            .map(|reference| {
                let local = DatasetDescriptor::from_wire(reference);
                match index.get(&local.id) {
                    Some(full) => full.clone().with_name(local.name.or_else(|| full.name.clone())),
                    None => local,
                }
            })
            .collect();
        datasets.sort_by(|a, b| a.name.cmp(&b.name));

        let charts_json = if json.get("charts").is_some() {
            wire::array_field(json, "charts")
        } else {
            wire::array_field(json, "views")
        };
        let mut charts: Vec<ChartDescriptor> =
            charts_json.iter().map(ChartDescriptor::from_wire).collect();
        charts.sort_by(|a, b| a.name.cmp(&b.name));

        // Outputs are either top-level or nested under `outputs`
        let outputs = json.get("outputs").unwrap_or(json);
        let stdout: Vec<OutputEntry> = wire::array_field(outputs, "stdout")
            .iter()
            .map(OutputEntry::from_wire)
            .collect();
        let stderr: Vec<OutputEntry> = wire::array_field(outputs, "stderr")
            .iter()
            .map(OutputEntry::from_wire)
            .collect();

        let id = ModuleId(wire::id_field(json, "id").unwrap_or_default());
        let mut state = json.get("state").map(ModuleState::from_wire).unwrap_or_default();
        if !stderr.is_empty() && !state.is_error() {
            tracing::warn!(module = %id, ?state, "module reports stderr output, treating as error");
            state = ModuleState::Error;
        }

        Self {
            id,
            command: json
                .get("command")
                .map(ModuleCommand::from_wire)
                .unwrap_or_default(),
            text: wire::str_field(json, "text"),
            datasets,
            charts,
            stdout,
            stderr,
            timestamps: json
                .get("timestamps")
                .map(Timestamps::from_wire)
                .unwrap_or_default(),
            links: LinkTable::of(json),
            state,
        }
    }

    /// Check whether this module failed or was cancelled
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.state.is_error()
    }

    /// Check whether this module is still pending or running
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Produced dataset by name
    #[must_use]
    pub fn dataset(&self, name: &str) -> Option<&DatasetDescriptor> {
        self.datasets
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
    }

    /// Check whether two modules carry the same visible outcome
    #[must_use]
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.state == other.state && self.stdout == other.stdout && self.stderr == other.stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn state_from_codes_and_names() {
        assert_eq!(ModuleState::from_wire(&json!(4)), ModuleState::Success);
        assert_eq!(ModuleState::from_wire(&json!(2)), ModuleState::Canceled);
        assert_eq!(ModuleState::from_wire(&json!("error")), ModuleState::Error);
        assert_eq!(ModuleState::from_wire(&json!("RUNNING")), ModuleState::Running);
        assert_eq!(ModuleState::from_wire(&json!(true)), ModuleState::Pending);
    }

    #[test]
    fn arguments_are_folded() {
        let command = ModuleCommand::from_wire(&json!({
            "packageId": "vizual",
            "commandId": "sortDataset",
            "arguments": [
                {"name": "dataset", "value": "people"},
                {"name": "columns", "value": [
                    [{"name": "column", "value": 1}, {"name": "order", "value": "asc"}],
                    [{"name": "column", "value": 2}, {"name": "order", "value": "desc"}]
                ]}
            ]
        }));

        assert_eq!(command.label(), "vizual.sortDataset");
        assert_eq!(command.argument("dataset"), Some(&json!("people")));
        assert_eq!(
            command.argument("columns"),
            Some(&json!([
                {"column": 1, "order": "asc"},
                {"column": 2, "order": "desc"}
            ]))
        );
    }

    #[test]
    fn module_datasets_resolved_and_sorted() {
        let mut index = DatasetIndex::new();
        index.insert(
            "d2".to_string(),
            DatasetDescriptor::from_wire(&json!({"id": "d2", "name": "zeta", "columns": [{"id": 0, "name": "a"}]})),
        );

        let module = Module::from_wire_indexed(
            &json!({
                "id": "m1",
                "datasets": [{"id": "d2", "name": "zeta"}, {"id": "d9", "name": "alpha"}],
                "state": 4
            }),
            &index,
        );

        let names: Vec<_> = module.datasets.iter().map(|d| d.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(module.dataset("zeta").unwrap().columns.is_some());
        assert!(module.dataset("alpha").unwrap().columns.is_none());
    }

    #[test]
    fn stderr_forces_error_state() {
        let module = Module::from_wire(&json!({
            "id": "m1",
            "state": "success",
            "outputs": {"stdout": [], "stderr": ["boom"]}
        }));
        assert_eq!(module.state, ModuleState::Error);
        assert!(module.has_error());
        assert_eq!(module.stderr[0].as_text(), Some("boom"));
    }

    #[test]
    fn missing_fields_default() {
        let module = Module::from_wire(&json!({}));
        assert_eq!(module.id, ModuleId::default());
        assert!(module.datasets.is_empty());
        assert!(module.stdout.is_empty());
        assert_eq!(module.state, ModuleState::Pending);
        assert!(module.timestamps.duration().is_none());
    }
}
