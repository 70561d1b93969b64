//! Cell annotations
//!
//! Annotations are indexed by the synthetic key `"{column}_{row}"`. Negative
//! identifiers denote "no cell selected".

use crate::wire;
use serde::Serialize;
use serde_json::Value;

/// Build the synthetic annotation key for a cell
#[inline]
#[must_use]
pub fn annotation_key(column_id: i64, row_id: &str) -> String {
    format!("{column_id}_{row_id}")
}

/// Pointer to a single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellPointer {
    /// Column identifier
    pub column_id: i64,
    /// Row identifier
    pub row_id: String,
}

impl CellPointer {
    /// Create a pointer
    #[inline]
    #[must_use]
    pub fn new(column_id: i64, row_id: impl Into<String>) -> Self {
        Self {
            column_id,
            row_id: row_id.into(),
        }
    }

    /// Synthetic annotation key of this cell
    #[inline]
    #[must_use]
    pub fn key(&self) -> String {
        annotation_key(self.column_id, &self.row_id)
    }

    /// A pointer with a negative column or row id selects nothing
    #[must_use]
    pub fn is_selection(&self) -> bool {
        let row_negative = self
            .row_id
            .parse::<i64>()
            .map(|r| r < 0)
            .unwrap_or(false);
        self.column_id >= 0 && !row_negative
    }
}

/// One annotation attached to a cell
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Annotation identifier
    pub id: i64,
    /// Annotation key (e.g. "user:comment")
    pub key: String,
    /// Annotation value
    pub value: Value,
    /// Whether the annotation was confirmed by a user
    pub confirmed: bool,
}

impl Annotation {
    /// Hydrate from wire JSON
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        Self {
            id: wire::i64_field(json, "id").unwrap_or(-1),
            key: wire::str_field(json, "key").unwrap_or_default(),
            value: json.get("value").cloned().unwrap_or(Value::Null),
            confirmed: wire::bool_field(json, "confirmed"),
        }
    }

    /// Parse an annotation response `{annotations: [...]}`
    #[must_use]
    pub fn list_from_wire(json: &Value) -> Vec<Self> {
        wire::array_field(json, "annotations")
            .iter()
            .map(Self::from_wire)
            .collect()
    }
}

/// Annotation fetch or update request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRequest {
    /// Target column
    pub column_id: i64,
    /// Target row
    pub row_id: String,
    /// Annotation key for add/update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Previous value for update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// New value for add/update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Annotation to delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anno_id: Option<i64>,
}

impl AnnotationRequest {
    /// Fetch all annotations of a cell
    #[must_use]
    pub fn fetch(cell: &CellPointer) -> Self {
        Self {
            column_id: cell.column_id,
            row_id: cell.row_id.clone(),
            key: None,
            old_value: None,
            new_value: None,
            anno_id: None,
        }
    }

    /// Add a new annotation
    #[must_use]
    pub fn add(cell: &CellPointer, key: impl Into<String>, value: Value) -> Self {
        Self {
            key: Some(key.into()),
            new_value: Some(value),
            ..Self::fetch(cell)
        }
    }

    /// Replace the value of an existing annotation
    #[must_use]
    pub fn update(cell: &CellPointer, key: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            key: Some(key.into()),
            old_value: Some(old_value),
            new_value: Some(new_value),
            ..Self::fetch(cell)
        }
    }

    /// Delete an annotation by id
    #[must_use]
    pub fn delete(cell: &CellPointer, anno_id: i64) -> Self {
        Self {
            anno_id: Some(anno_id),
            ..Self::fetch(cell)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_format() {
        assert_eq!(annotation_key(3, "r1"), "3_r1");
        assert_eq!(CellPointer::new(0, "7").key(), "0_7");
    }

    #[test]
    fn negative_ids_select_nothing() {
        assert!(CellPointer::new(2, "5").is_selection());
        assert!(!CellPointer::new(-1, "5").is_selection());
        assert!(!CellPointer::new(2, "-1").is_selection());
    }

    #[test]
    fn request_wire_shape() {
        let cell = CellPointer::new(1, "4");
        let body = serde_json::to_value(AnnotationRequest::update(&cell, "note", json!("a"), json!("b"))).unwrap();
        assert_eq!(
            body,
            json!({"columnId": 1, "rowId": "4", "key": "note", "oldValue": "a", "newValue": "b"})
        );

        let body = serde_json::to_value(AnnotationRequest::delete(&cell, 9)).unwrap();
        assert_eq!(body, json!({"columnId": 1, "rowId": "4", "annoId": 9}));
    }

    #[test]
    fn response_parsing() {
        let list = Annotation::list_from_wire(&json!({
            "annotations": [{"id": 1, "key": "note", "value": "check", "confirmed": true}]
        }));
        assert_eq!(list.len(), 1);
        assert!(list[0].confirmed);
        assert_eq!(list[0].value, json!("check"));
    }
}
