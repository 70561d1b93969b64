//! Hypermedia link table
//!
//! The server tells the client where everything lives. Components never build
//! URLs themselves; they look up a relation name in the table that came with
//! the resource payload.

use crate::error::ResourceError;
use crate::wire;
use serde_json::Value;
use std::collections::HashMap;

/// Relation names referenced by the client
pub mod rel {
    /// The resource itself
    pub const SELF: &str = "self";
    /// Head workflow of a branch
    pub const BRANCH_HEAD: &str = "branch-head";
    /// Delete a module (and re-execute what follows)
    pub const MODULE_DELETE: &str = "module-delete";
    /// Insert a new module before this one
    pub const MODULE_INSERT: &str = "module-insert";
    /// Replace this module's command
    pub const MODULE_REPLACE: &str = "module-replace";
    /// Append a module to the end of the workflow
    pub const MODULE_APPEND: &str = "module-append";
    /// Cancel the running workflow
    pub const WORKFLOW_CANCEL: &str = "workflow-cancel";
    /// Branch listing / creation for a project
    pub const BRANCHES: &str = "branches";
    /// Update project properties
    pub const PROJECT_UPDATE_PROPERTY: &str = "project-update-property";
    /// Update branch properties
    pub const BRANCH_UPDATE_PROPERTY: &str = "branch-update-property";
    /// Download a dataset as CSV
    pub const DATASET_DOWNLOAD: &str = "dataset-download";
    /// Upload a file into the project's file store
    pub const PROJECT_FILE_UPLOAD: &str = "project-file-upload";
    /// Fetch or update cell annotations of a dataset
    pub const ANNOTATIONS: &str = "annotations";
    /// Fetch a page of dataset rows
    pub const DATASET_FETCH: &str = "dataset-fetch";
}

/// Mapping from relation name to URL
///
/// Built once per payload and never patched. A new payload yields a new table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    links: HashMap<String, String>,
}

impl LinkTable {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the wire form `[{rel, href}, ...]`
    ///
    /// Entries without a `rel` or `href` are skipped. Duplicate relations
    /// resolve to the last entry.
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let pairs = json.as_array().map(Vec::as_slice).unwrap_or(&[]).iter().filter_map(|link| {
            Some((wire::str_field(link, "rel")?, wire::str_field(link, "href")?))
        });
        Self::from_pairs(pairs)
    }

    /// Build from the `links` field of a resource payload
    #[inline]
    #[must_use]
    pub fn of(resource: &Value) -> Self {
        resource.get("links").map(Self::from_wire).unwrap_or_default()
    }

    /// Build from `(relation, href)` pairs, last one wins
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut links = HashMap::new();
        for (rel, href) in pairs {
            links.insert(rel.into(), href.into());
        }
        Self { links }
    }

    /// Resolve a relation to its URL
    #[inline]
    #[must_use]
    pub fn resolve(&self, relation: &str) -> Option<&str> {
        self.links.get(relation).map(String::as_str)
    }

    /// Resolve a relation, failing when the server did not offer it
    ///
    /// # Errors
    /// `ResourceError::MissingLink` if the relation is absent.
    pub fn require(&self, relation: &str) -> Result<&str, ResourceError> {
        self.resolve(relation)
            .ok_or_else(|| ResourceError::missing_link(relation))
    }

    /// Check whether a relation is present
    #[inline]
    #[must_use]
    pub fn contains(&self, relation: &str) -> bool {
        self.links.contains_key(relation)
    }

    /// Number of relations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate relation names (unordered)
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }
}
