//! Notebook cells

use crate::output::{OutputResource, OutputVariant};
use vizier_resource::{CellPointer, Module};

/// Dataset cell whose annotations are on display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveCell {
    /// Nothing selected
    #[default]
    None,
    /// A selected dataset cell
    Cell(CellPointer),
}

impl ActiveCell {
    /// Marker for a pointer, `None` for the `(-1, -1)` sentinel
    #[must_use]
    pub fn from_pointer(pointer: CellPointer) -> Self {
        if pointer.is_selection() {
            Self::Cell(pointer)
        } else {
            Self::None
        }
    }

    /// Selected pointer, if any
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> Option<&CellPointer> {
        match self {
            Self::None => None,
            Self::Cell(pointer) => Some(pointer),
        }
    }
}

/// One cell of the notebook: a module, its output and the annotation marker
#[derive(Debug, Clone, PartialEq)]
pub struct NotebookCell {
    /// Module shown in this cell
    pub module: Module,
    /// Output pane content
    pub output: OutputResource,
    /// Selected dataset cell
    pub active_cell: ActiveCell,
}

impl NotebookCell {
    /// Cell with the output freshly derived from the module
    #[must_use]
    pub fn derive(module: Module) -> Self {
        let output = OutputResource::new(OutputVariant::for_module(&module));
        Self {
            module,
            output,
            active_cell: ActiveCell::None,
        }
    }

    /// Whether the module failed or was cancelled
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.module.has_error()
    }

    /// Copy with a different output
    #[must_use]
    pub fn with_output(&self, output: OutputResource) -> Self {
        Self {
            module: self.module.clone(),
            output,
            active_cell: self.active_cell.clone(),
        }
    }

    /// Copy with a different annotation marker
    #[must_use]
    pub fn with_active_cell(&self, active_cell: ActiveCell) -> Self {
        Self {
            module: self.module.clone(),
            output: self.output.clone(),
            active_cell,
        }
    }
}
