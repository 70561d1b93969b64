//! Vizier Command Encoder
//!
//! Turns form values into the `{type, id, arguments}` body the server expects
//! when a module is inserted, appended or replaced:
//!
//! - [`CommandSpec`]: parameter tree of one command, built from the flat
//!   declarations in the service descriptor
//! - [`encode`]: recursive walk producing the argument mapping
//! - [`validate`]: the same walk, collecting one message per bad leaf
//! - [`vizual`]: builders for the fixed catalogue of dataset-editing commands
//!
//! # Example
//!
//! ```rust
//! use vizier_command::vizual;
//! use serde_json::json;
//!
//! let request = vizual::update_cell("people", 3, "r1", json!("X"));
//! assert_eq!(request.package_id, "vizual");
//! assert_eq!(request.command_id, "updateCell");
//! assert_eq!(request.arguments["row"], json!("r1"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod encode;
pub mod error;
pub mod file;
pub mod registry;
pub mod spec;
pub mod validate;
pub mod vizual;

pub use encode::{encode, prepare, CommandRequest, FormValues};
pub use error::CommandError;
pub use file::FileArgument;
pub use registry::PackageRegistry;
pub use spec::{CommandSpec, DataType, ParameterNode, ParameterSpec};
pub use validate::validate;
pub use vizual::{LoadOptions, SortOrder};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
