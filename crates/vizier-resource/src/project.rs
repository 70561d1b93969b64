//! Project and branch descriptors

use crate::links::LinkTable;
use crate::wire;
use serde_json::Value;

/// A named pointer to the head version of a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Branch identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether this is the project's default branch
    pub is_default: bool,
    /// Hypermedia links
    pub links: LinkTable,
}

impl Branch {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self {
            id: wire::id_field(json, "id").unwrap_or_default(),
            name: wire::str_field(json, "name")
                .or_else(|| wire::property(json, "name"))
                .unwrap_or_default(),
            is_default: wire::bool_field(json, "isDefault"),
            links: LinkTable::of(json),
        }
    }

    /// Copy with a different name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A project owns its branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Execution environment identifier, if reported
    pub environment: Option<String>,
    /// Branches of this project
    pub branches: Vec<Branch>,
    /// Hypermedia links
    pub links: LinkTable,
}

impl Project {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let environment = match json.get("environment") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(env @ Value::Object(_)) => wire::id_field(env, "id"),
            _ => None,
        };

        Self {
            id: wire::id_field(json, "id").unwrap_or_default(),
            name: wire::str_field(json, "name")
                .or_else(|| wire::property(json, "name"))
                .unwrap_or_default(),
            environment,
            branches: wire::array_field(json, "branches")
                .iter()
                .map(Branch::from_wire)
                .collect(),
            links: LinkTable::of(json),
        }
    }

    /// Return a new project with the branch of the same id replaced
    ///
    /// Unknown branch ids leave the branch list unchanged.
    #[must_use]
    pub fn update_branch(&self, branch: Branch) -> Self {
        let branches = self
            .branches
            .iter()
            .map(|b| if b.id == branch.id { branch.clone() } else { b.clone() })
            .collect();
        Self {
            branches,
            ..self.clone()
        }
    }

    /// Return a new project with a branch appended
    #[must_use]
    pub fn add_branch(&self, branch: Branch) -> Self {
        let mut branches = self.branches.clone();
        branches.push(branch);
        Self {
            branches,
            ..self.clone()
        }
    }

    /// Copy with a different name
    #[inline]
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Look up a branch by id
    #[must_use]
    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// The default branch, if any is flagged
    #[must_use]
    pub fn default_branch(&self) -> Option<&Branch> {
        self.branches.iter().find(|b| b.is_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project_json() -> Value {
        json!({
            "id": "p1",
            "properties": [{"key": "name", "value": "Cleaning"}],
            "environment": {"id": "env-py"},
            "branches": [
                {"id": "b1", "name": "master", "isDefault": true, "links": []},
                {"id": "b2", "name": "experiment", "links": []}
            ],
            "links": [{"rel": "self", "href": "http://api/projects/p1"}]
        })
    }

    #[test]
    fn project_from_wire() {
        let project = Project::from_wire(&project_json());
        assert_eq!(project.name, "Cleaning");
        assert_eq!(project.environment.as_deref(), Some("env-py"));
        assert_eq!(project.branches.len(), 2);
        assert_eq!(project.default_branch().map(|b| b.id.as_str()), Some("b1"));
    }

    #[test]
    fn update_branch_returns_new_project() {
        let project = Project::from_wire(&project_json());
        let renamed = project.branch("b2").cloned().unwrap().with_name("renamed");

        let updated = project.update_branch(renamed);
        assert_eq!(updated.branch("b2").unwrap().name, "renamed");
        assert_eq!(project.branch("b2").unwrap().name, "experiment");
        assert_eq!(updated.branch("b1"), project.branch("b1"));
    }

    #[test]
    fn update_unknown_branch_is_noop() {
        let project = Project::from_wire(&project_json());
        let stray = Branch::from_wire(&json!({"id": "zz", "name": "stray"}));
        assert_eq!(project.update_branch(stray), project);
    }
}
