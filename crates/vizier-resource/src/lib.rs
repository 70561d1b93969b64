//! Vizier Resource Layer
//!
//! Typed records for everything the notebook client reads from the server:
//! - [`LinkTable`]: the only way to obtain a URL for a resource
//! - [`Project`], [`Branch`], [`WorkflowDescriptor`]
//! - [`Module`] with its command, outputs, timestamps and execution state
//! - [`DatasetDescriptor`] / [`DatasetHandle`], [`ChartDescriptor`] / [`ChartView`]
//! - Cell annotations and the service descriptor (package catalogue)
//!
//! Every descriptor hydrates through a `from_wire` constructor that never
//! fails: missing optional fields become `None` or an empty sequence.
//!
//! # Example
//!
//! ```rust
//! use vizier_resource::{rel, LinkTable};
//! use serde_json::json;
//!
//! let links = LinkTable::from_wire(&json!([
//!     {"rel": "self", "href": "http://localhost/projects/1"},
//!     {"rel": "self", "href": "http://localhost/projects/2"},
//! ]));
//! assert_eq!(links.resolve(rel::SELF), Some("http://localhost/projects/2"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod annotation;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod links;
pub mod module;
pub mod project;
pub mod service;
pub mod wire;
pub mod workflow;

pub use annotation::{annotation_key, Annotation, AnnotationRequest, CellPointer};
pub use chart::{ChartDescriptor, ChartView};
pub use dataset::{Column, DatasetDescriptor, DatasetHandle, DatasetIndex, Row};
pub use error::ResourceError;
pub use links::{rel, LinkTable};
pub use module::{Module, ModuleCommand, ModuleId, ModuleState, OutputEntry, Timestamps};
pub use project::{Branch, Project};
pub use service::{CommandDescriptor, PackageDescriptor, ServiceDescriptor};
pub use workflow::{WorkflowAction, WorkflowDescriptor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with server resources
    pub use crate::{
        rel, Branch, DatasetDescriptor, DatasetHandle, LinkTable, Module, ModuleId, ModuleState,
        Project, WorkflowDescriptor,
    };
}
