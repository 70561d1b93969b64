//! Dataset descriptors and handles
//!
//! A [`DatasetDescriptor`] is the lightweight reference a module lists among
//! its outputs. A [`DatasetHandle`] is the hydrated page of rows shown in a
//! spreadsheet view.
//!
//! Handles are immutable values. The `with_*` methods return a new handle
//! that shares untouched rows with the original through `im`'s persistent
//! vectors, so an optimistic patch can never be observed half-applied by
//! another holder of the original handle.

use crate::annotation::{annotation_key, Annotation};
use crate::links::{rel, LinkTable};
use crate::wire;
use serde_json::Value;
use std::collections::HashMap;

/// Dataset column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column identifier (stable across renames)
    pub id: i64,
    /// Column name
    pub name: String,
}

impl Column {
    /// Create a column
    #[inline]
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    fn from_wire(json: &Value) -> Self {
        Self {
            id: wire::i64_field(json, "id").unwrap_or(-1),
            name: wire::str_field(json, "name").unwrap_or_default(),
        }
    }
}

/// Dataset row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Row identifier
    pub id: String,
    /// Cell values, positionally aligned with the dataset's columns
    pub values: Vec<Value>,
}

impl Row {
    /// Create a row
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    fn from_wire(json: &Value) -> Self {
        Self {
            id: wire::id_field(json, "id").unwrap_or_default(),
            values: wire::array_field(json, "values").to_vec(),
        }
    }
}

/// Lightweight dataset reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    /// Dataset identifier
    pub id: String,
    /// Name under which a module produced it (may be omitted by the server)
    pub name: Option<String>,
    /// Column schema (may be omitted by the server)
    pub columns: Option<Vec<Column>>,
    /// Hypermedia links
    pub links: LinkTable,
}

impl DatasetDescriptor {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let columns = json
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| cols.iter().map(Column::from_wire).collect());

        Self {
            id: wire::id_field(json, "id").unwrap_or_default(),
            name: wire::str_field(json, "name"),
            columns,
            links: LinkTable::of(json),
        }
    }

    /// Copy carrying the given name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Download link, if offered
    #[inline]
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        self.links.resolve(rel::DATASET_DOWNLOAD)
    }
}

/// Descriptors of a workflow payload keyed by dataset id
pub type DatasetIndex = HashMap<String, DatasetDescriptor>;

/// Fully hydrated page of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHandle {
    /// Dataset identifier
    pub id: String,
    /// Dataset name
    pub name: Option<String>,
    /// Column schema
    pub columns: im::Vector<Column>,
    /// Rows of the current page
    pub rows: im::Vector<Row>,
    /// Offset of the first row in the page
    pub offset: u64,
    /// Total number of rows in the dataset
    pub row_count: u64,
    /// Annotations keyed by [`annotation_key`]; an empty list marks a cell
    /// known to carry annotations that have not been fetched yet
    pub annotations: im::HashMap<String, Vec<Annotation>>,
    /// Hypermedia links
    pub links: LinkTable,
}

impl DatasetHandle {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let rows: im::Vector<Row> = wire::array_field(json, "rows")
            .iter()
            .map(Row::from_wire)
            .collect();

        let mut annotations = im::HashMap::new();
        for cell in wire::array_field(json, "annotatedCells") {
            let column = wire::i64_field(cell, "column").unwrap_or(-1);
            let row = wire::id_field(cell, "row").unwrap_or_default();
            annotations.insert(annotation_key(column, &row), Vec::new());
        }
        for entry in wire::array_field(json, "annotations") {
            let column = wire::i64_field(entry, "columnId").unwrap_or(-1);
            let row = wire::id_field(entry, "rowId").unwrap_or_default();
            annotations
                .entry(annotation_key(column, &row))
                .or_insert_with(Vec::new)
                .push(Annotation::from_wire(entry));
        }

        let row_count = json
            .get("rowCount")
            .and_then(Value::as_u64)
            .unwrap_or(rows.len() as u64);

        Self {
            id: wire::id_field(json, "id").unwrap_or_default(),
            name: wire::str_field(json, "name"),
            columns: wire::array_field(json, "columns")
                .iter()
                .map(Column::from_wire)
                .collect(),
            rows,
            offset: wire::u64_field(json, "offset"),
            row_count,
            annotations,
            links: LinkTable::of(json),
        }
    }

    /// Position of a column by id
    #[must_use]
    pub fn column_position(&self, column_id: i64) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    /// Position of a row by id within the current page
    #[must_use]
    pub fn row_position(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == row_id)
    }

    /// Value of a cell in the current page
    #[must_use]
    pub fn cell(&self, column_id: i64, row_id: &str) -> Option<&Value> {
        let col = self.column_position(column_id)?;
        let row = self.row_position(row_id)?;
        self.rows.get(row)?.values.get(col)
    }

    /// New handle with one cell value replaced
    ///
    /// Returns `None` when the column or row is not part of this page.
    #[must_use]
    pub fn with_cell_value(&self, column_id: i64, row_id: &str, value: Value) -> Option<Self> {
        let col = self.column_position(column_id)?;
        let row_pos = self.row_position(row_id)?;

        let mut row = self.rows.get(row_pos)?.clone();
        if row.values.len() <= col {
            row.values.resize(col + 1, Value::Null);
        }
        row.values[col] = value;

        Some(Self {
            rows: self.rows.update(row_pos, row),
            ..self.clone()
        })
    }

    /// New handle with one column renamed
    #[must_use]
    pub fn with_column_renamed(&self, column_id: i64, name: impl Into<String>) -> Option<Self> {
        let pos = self.column_position(column_id)?;
        let column = Column::new(column_id, name);
        Some(Self {
            columns: self.columns.update(pos, column),
            ..self.clone()
        })
    }

    /// New handle with the annotation list of one cell replaced
    #[must_use]
    pub fn with_annotations(&self, column_id: i64, row_id: &str, annotations: Vec<Annotation>) -> Self {
        Self {
            annotations: self
                .annotations
                .update(annotation_key(column_id, row_id), annotations),
            ..self.clone()
        }
    }

    /// Check whether a cell is known to carry annotations
    #[must_use]
    pub fn has_annotations(&self, column_id: i64, row_id: &str) -> bool {
        self.annotations
            .contains_key(&annotation_key(column_id, row_id))
    }

    /// Annotations fetched for a cell
    #[must_use]
    pub fn annotations_for(&self, column_id: i64, row_id: &str) -> &[Annotation] {
        self.annotations
            .get(&annotation_key(column_id, row_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Download link, if offered
    #[inline]
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        self.links.resolve(rel::DATASET_DOWNLOAD)
    }

    /// Lightweight descriptor for this handle
    #[must_use]
    pub fn descriptor(&self) -> DatasetDescriptor {
        DatasetDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            columns: Some(self.columns.iter().cloned().collect()),
            links: self.links.clone(),
        }
    }
}
