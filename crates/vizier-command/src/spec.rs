//! Command parameter declarations
//!
//! The server declares a command's parameters as a flat list where nested
//! parameters point at their parent by id. [`CommandSpec`] folds that list
//! into a tree so encoding and validation can recurse over it.

use serde_json::Value;
use vizier_resource::wire;
use vizier_resource::CommandDescriptor;

/// Parameter data type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Free text
    String,
    /// Integer number
    Int,
    /// Decimal number
    Decimal,
    /// Boolean flag
    Bool,
    /// Column identifier of the selected dataset
    ColumnId,
    /// Row identifier of the selected dataset
    RowId,
    /// Dataset name
    Dataset,
    /// File reference (uploaded file id or URL)
    FileId,
    /// Python source
    PyCode,
    /// SQL source
    Sql,
    /// Scala source
    Scala,
    /// Markdown source
    Markdown,
    /// Fixed-shape nested record ("as-row")
    Record,
    /// Repeatable tuple list ("group")
    List,
    /// Any type the client does not know by name; treated as a scalar
    Other(String),
}

impl DataType {
    /// Decode the wire datatype name
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "int" => Self::Int,
            "decimal" => Self::Decimal,
            "bool" => Self::Bool,
            "colid" => Self::ColumnId,
            "rowid" => Self::RowId,
            "dataset" => Self::Dataset,
            "fileid" => Self::FileId,
            "pyCode" => Self::PyCode,
            "sql" => Self::Sql,
            "scala" => Self::Scala,
            "markdown" => Self::Markdown,
            "record" => Self::Record,
            "list" => Self::List,
            other => Self::Other(other.to_string()),
        }
    }

    /// Record or list: carries child parameters
    #[inline]
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Record | Self::List)
    }
}

/// One parameter declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter identifier (argument key)
    pub id: String,
    /// Display name
    pub name: String,
    /// Data type
    pub datatype: DataType,
    /// Whether a value must be supplied
    pub required: bool,
    /// Identifier of the enclosing record/list parameter
    pub parent: Option<String>,
    /// Position among siblings
    pub index: i64,
    /// Hidden from forms
    pub hidden: bool,
    /// Default value
    pub default: Option<Value>,
    /// Enumerated choices
    pub values: Vec<Value>,
}

impl ParameterSpec {
    /// Create a top-level parameter
    #[must_use]
    pub fn new(id: impl Into<String>, datatype: DataType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            datatype,
            required: false,
            parent: None,
            index: 0,
            hidden: false,
            default: None,
            values: Vec::new(),
        }
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Nest under a parent
    #[inline]
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set sibling position
    #[inline]
    #[must_use]
    pub fn at(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    /// Set a default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let id = wire::str_field(json, "id").unwrap_or_default();
        Self {
            name: wire::str_field(json, "name").unwrap_or_else(|| id.clone()),
            id,
            datatype: DataType::parse(&wire::str_field(json, "datatype").unwrap_or_default()),
            required: wire::bool_field(json, "required"),
            parent: wire::str_field(json, "parent"),
            index: wire::i64_field(json, "index").unwrap_or(0),
            hidden: wire::bool_field(json, "hidden"),
            default: json.get("defaultValue").cloned(),
            values: wire::array_field(json, "values").to_vec(),
        }
    }
}

/// Parameter with its nested children
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNode {
    /// The declaration
    pub spec: ParameterSpec,
    /// Children (records and lists only), ordered by index
    pub children: Vec<ParameterNode>,
}

impl ParameterNode {
    fn build(spec: ParameterSpec, all: &[ParameterSpec]) -> Self {
        let children = all
            .iter()
            .filter(|p| p.parent.as_deref() == Some(spec.id.as_str()))
            .map(|p| Self::build(p.clone(), all))
            .collect();
        Self { spec, children }
    }

    /// Parameter identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.spec.id
    }
}

/// Parameter tree of one command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Package identifier
    pub package_id: String,
    /// Command identifier
    pub command_id: String,
    /// Display name
    pub name: String,
    /// Top-level parameters, ordered by index
    pub parameters: Vec<ParameterNode>,
}

impl CommandSpec {
    /// Build from flat declarations
    ///
    /// Parameters whose parent is not declared are treated as top-level.
    #[must_use]
    pub fn new(
        package_id: impl Into<String>,
        command_id: impl Into<String>,
        mut declarations: Vec<ParameterSpec>,
    ) -> Self {
        let command_id = command_id.into();
        declarations.sort_by_key(|p| p.index);

        let known: Vec<&str> = declarations.iter().map(|p| p.id.as_str()).collect();
        let parameters = declarations
            .iter()
            .filter(|p| p.parent.as_deref().map_or(true, |parent| !known.contains(&parent)))
            .map(|p| ParameterNode::build(p.clone(), &declarations))
            .collect();

        Self {
            package_id: package_id.into(),
            name: command_id.clone(),
            command_id,
            parameters,
        }
    }

    /// Build from a service descriptor entry
    #[must_use]
    pub fn from_descriptor(package_id: &str, descriptor: &CommandDescriptor) -> Self {
        let declarations = descriptor
            .parameters
            .iter()
            .map(ParameterSpec::from_wire)
            .collect();
        let mut spec = Self::new(package_id, descriptor.id.clone(), declarations);
        if !descriptor.name.is_empty() {
            spec.name.clone_from(&descriptor.name);
        }
        spec
    }

    /// Top-level parameter by id
    #[must_use]
    pub fn parameter(&self, id: &str) -> Option<&ParameterNode> {
        self.parameters.iter().find(|p| p.id() == id)
    }

    /// The designated file argument: the first top-level `fileid` parameter
    #[must_use]
    pub fn file_parameter(&self) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .map(|p| &p.spec)
            .find(|p| p.datatype == DataType::FileId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tree_from_flat_declarations() {
        let spec = CommandSpec::new(
            "vizual",
            "sortDataset",
            vec![
                ParameterSpec::new("order", DataType::String).child_of("columns").at(3),
                ParameterSpec::new("dataset", DataType::Dataset).required().at(0),
                ParameterSpec::new("columns", DataType::List).required().at(1),
                ParameterSpec::new("column", DataType::ColumnId).child_of("columns").at(2),
            ],
        );

        assert_eq!(spec.parameters.len(), 2);
        assert_eq!(spec.parameters[0].id(), "dataset");
        let columns = spec.parameter("columns").unwrap();
        let child_ids: Vec<_> = columns.children.iter().map(ParameterNode::id).collect();
        assert_eq!(child_ids, vec!["column", "order"]);
    }

    #[test]
    fn orphans_become_top_level() {
        let spec = CommandSpec::new(
            "p",
            "c",
            vec![ParameterSpec::new("x", DataType::Int).child_of("missing")],
        );
        assert_eq!(spec.parameters.len(), 1);
    }

    #[test]
    fn from_wire_declaration() {
        let p = ParameterSpec::from_wire(&json!({
            "id": "file", "name": "Source File", "datatype": "fileid",
            "required": true, "index": 1, "defaultValue": null
        }));
        assert_eq!(p.datatype, DataType::FileId);
        assert!(p.required);
        assert_eq!(p.name, "Source File");
    }

    #[test]
    fn file_parameter_is_designated() {
        let spec = CommandSpec::new(
            "vizual",
            "load",
            vec![
                ParameterSpec::new("name", DataType::String).at(0),
                ParameterSpec::new("file", DataType::FileId).at(1),
            ],
        );
        assert_eq!(spec.file_parameter().map(|p| p.id.as_str()), Some("file"));
    }
}
