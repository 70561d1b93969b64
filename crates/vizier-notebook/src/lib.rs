//! Vizier Notebook
//!
//! The client-side model of one workflow version:
//! - [`derive_output`]: what a module's output pane shows, as a closed
//!   [`OutputVariant`] union with an orthogonal fetching flag
//! - [`Notebook`]: immutable, ordered [`NotebookCell`]s with pure
//!   transformations (`replace_output`, `set_fetching`, `show_annotations`,
//!   `update_workflow`)
//! - A derived freeze boundary: the first failed or cancelled cell and every
//!   cell after it are read-only
//!
//! # Example
//!
//! ```rust
//! use vizier_notebook::{Notebook, OutputTag};
//! use serde_json::json;
//!
//! let notebook = Notebook::from_workflow_json(&json!({
//!     "modules": [
//!         {"id": "m1", "state": 4, "stdout": [{"type": "text/markdown", "value": "# Intro"}]},
//!         {"id": "m2", "state": 3, "stderr": [{"type": "text/plain", "value": "boom"}]},
//!     ]
//! }));
//!
//! assert_eq!(notebook.len(), 2);
//! assert_eq!(notebook.get(0).unwrap().output.tag(), OutputTag::Markdown);
//! assert_eq!(notebook.freeze_boundary(), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cell;
pub mod notebook;
pub mod output;

pub use cell::{ActiveCell, NotebookCell};
pub use notebook::{workflow_body, CellRun, Notebook};
pub use output::{derive_output, OutputPart, OutputResource, OutputTag, OutputVariant};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with notebooks
    pub use crate::{ActiveCell, Notebook, NotebookCell, OutputResource, OutputTag, OutputVariant};
}
