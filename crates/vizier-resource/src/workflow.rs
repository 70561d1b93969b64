//! Workflow version descriptor

use crate::links::LinkTable;
use crate::wire;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Action that produced a workflow version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Branch creation
    Create,
    /// Module inserted
    Insert,
    /// Module appended
    Append,
    /// Module deleted
    Delete,
    /// Module replaced
    Replace,
    /// Anything the client does not know by name
    Other(String),
}

impl WorkflowAction {
    /// Decode the wire action name (case-insensitive)
    #[must_use]
    pub fn parse(action: &str) -> Self {
        match action.to_ascii_lowercase().as_str() {
            "cre" | "create" => Self::Create,
            "ins" | "insert" => Self::Insert,
            "apd" | "append" => Self::Append,
            "del" | "delete" => Self::Delete,
            "upd" | "replace" | "update" => Self::Replace,
            _ => Self::Other(action.to_string()),
        }
    }
}

/// One executed or replayed pipeline state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDescriptor {
    /// Version identifier
    pub version: String,
    /// Branch this version belongs to
    pub branch: Option<String>,
    /// True for any version that is not the head of its branch
    pub read_only: bool,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Action that produced this version
    pub action: Option<WorkflowAction>,
    /// Hypermedia links
    pub links: LinkTable,
}

impl WorkflowDescriptor {
    /// Hydrate from wire JSON
    ///
    /// The workflow fields may be top-level or nested under `workflow`.
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let body = json.get("workflow").unwrap_or(json);
        Self {
            version: wire::id_field(body, "version")
                .or_else(|| wire::id_field(body, "id"))
                .unwrap_or_default(),
            branch: wire::id_field(body, "branch").or_else(|| wire::id_field(body, "branchId")),
            read_only: wire::bool_field(body, "readOnly"),
            created_at: wire::timestamp_field(body, "createdAt"),
            action: wire::str_field(body, "action").map(|a| WorkflowAction::parse(&a)),
            links: LinkTable::of(body),
        }
    }

    /// Copy with `read_only` derived from the branch head version
    #[must_use]
    pub fn with_head(mut self, head_version: &str) -> Self {
        self.read_only = self.version != head_version;
        self
    }
}
