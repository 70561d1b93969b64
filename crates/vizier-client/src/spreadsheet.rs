//! Spreadsheet session
//!
//! Tracks the dataset page on display and where the next VIZUAL edit goes.
//! Edits are inserted right after the module that produced the dataset, or
//! after the last edit this session inserted (`module_index`), so successive
//! edits stack up in order.

use serde_json::Value;
use vizier_command::{vizual, CommandRequest};
use vizier_notebook::Notebook;
use vizier_resource::{DatasetDescriptor, DatasetHandle};

/// Pending change from the spreadsheet view
#[derive(Debug, Clone, PartialEq)]
pub enum SpreadsheetEdit {
    /// New value for one cell
    UpdateCell {
        /// Column id
        column: i64,
        /// Row id
        row: String,
        /// New value
        value: Value,
    },
    /// New header for one column
    RenameColumn {
        /// Column id
        column: i64,
        /// New name
        name: String,
    },
}

impl SpreadsheetEdit {
    /// Edit for a pending value: a cell edit when a row is targeted, a
    /// column rename when only the header is
    #[must_use]
    pub fn from_pending(column: i64, row: Option<&str>, value: Value) -> Self {
        match row {
            Some(row) => Self::UpdateCell {
                column,
                row: row.to_string(),
                value,
            },
            None => Self::RenameColumn {
                column,
                name: match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            },
        }
    }

    /// VIZUAL command for a dataset
    #[must_use]
    pub fn to_command(&self, dataset: &str) -> CommandRequest {
        match self {
            Self::UpdateCell { column, row, value } => {
                vizual::update_cell(dataset, *column, row, value.clone())
            }
            Self::RenameColumn { column, name } => vizual::rename_column(dataset, *column, name),
        }
    }

    /// Provisional page reflecting the edit, `None` if the target is not on
    /// this page
    #[must_use]
    pub fn apply(&self, dataset: &DatasetHandle) -> Option<DatasetHandle> {
        match self {
            Self::UpdateCell { column, row, value } => dataset.with_cell_value(*column, row, value.clone()),
            Self::RenameColumn { column, name } => dataset.with_column_renamed(*column, name.as_str()),
        }
    }
}

/// Dataset view state across edits
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetSession {
    /// Page on display
    pub dataset: DatasetHandle,
    /// Index of the module that produced the displayed dataset
    pub source_index: usize,
    /// Index of the last edit this session inserted
    pub module_index: Option<usize>,
    /// Descriptor of the dataset produced by the last committed edit
    pub pending_refresh: Option<DatasetDescriptor>,
}

impl SpreadsheetSession {
    /// Session over a page produced by the module at `source_index`
    #[must_use]
    pub fn new(dataset: DatasetHandle, source_index: usize) -> Self {
        Self {
            dataset,
            source_index,
            module_index: None,
            pending_refresh: None,
        }
    }

    /// Name the VIZUAL commands refer to the dataset by
    #[must_use]
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.name.as_deref()
    }

    /// Where the next edit is inserted
    #[must_use]
    pub fn insertion_index(&self) -> usize {
        self.module_index.unwrap_or(self.source_index) + 1
    }

    /// Record a committed edit at `index` of the new notebook
    pub fn supersede(&mut self, index: usize, notebook: &Notebook) {
        self.module_index = Some(index);
        let name = self.dataset.name.clone();
        self.pending_refresh = notebook
            .get(index)
            .and_then(|cell| name.as_deref().and_then(|n| cell.module.dataset(n)))
            .cloned();
    }

    /// Install a freshly fetched page
    pub fn refreshed(&mut self, dataset: DatasetHandle) {
        self.dataset = dataset;
        self.pending_refresh = None;
    }
}
