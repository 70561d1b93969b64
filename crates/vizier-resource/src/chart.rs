//! Chart descriptors and chart view payloads

use crate::links::LinkTable;
use crate::wire;
use serde_json::Value;

/// Chart produced by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartDescriptor {
    /// Chart name
    pub name: String,
    /// Hypermedia links
    pub links: LinkTable,
}

impl ChartDescriptor {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self {
            name: wire::str_field(json, "name").unwrap_or_default(),
            links: LinkTable::of(json),
        }
    }
}

/// Rendered chart data as returned by a chart fetch or a `chart/view` output
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    /// Chart name
    pub name: String,
    /// Chart data series as sent by the server
    pub data: Value,
}

impl ChartView {
    /// Hydrate from wire JSON
    ///
    /// The series may arrive under `result`, `data` or `dataset`.
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let data = ["result", "data", "dataset"]
            .iter()
            .find_map(|k| json.get(*k))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            name: wire::str_field(json, "name").unwrap_or_default(),
            data,
        }
    }
}
