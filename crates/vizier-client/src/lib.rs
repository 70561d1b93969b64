//! Vizier Client
//!
//! Talks to the Vizier web API and keeps a notebook consistent with it:
//! - [`ApiClient`]: link-driven reads and writes with status classification
//!   and one-shot re-authentication on 401
//! - [`ReconciliationEngine`]: one edit at a time, optimistic dataset pages,
//!   commit of the server's new workflow version
//! - [`ModulePoller`]: cancellable per-module status polls
//! - [`ClientConfig`], [`Session`] and the [`Transport`] seam
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vizier_client::{ApiClient, ClientConfig, ReconciliationEngine, Session};
//!
//! # async fn run() -> Result<(), vizier_client::ClientError> {
//! let api = Arc::new(ApiClient::with_reqwest(ClientConfig::default(), Arc::new(Session::new()))?);
//! let project = api.fetch_project("http://localhost:5000/vizier-db/api/v1/projects/1").await?;
//! if let Some(branch) = project.default_branch() {
//!     let notebook = api.fetch_branch_head(branch).await?;
//!     let engine = ReconciliationEngine::new(Arc::clone(&api), notebook);
//!     println!("{} cells", engine.notebook().len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod poller;
pub mod session;
pub mod spreadsheet;
pub mod transport;
pub mod upload;

pub use api::{classify, ApiClient, ResourceRef};
pub use config::ClientConfig;
pub use engine::{
    CellTarget, EngineState, EngineView, ProvisionalDataset, ReconciliationEngine,
    PROVISIONAL_MODULE_ID,
};
pub use error::{ActionError, ActionErrorLog, ClientError};
pub use poller::{ModulePoller, PollHandle};
pub use session::{AuthPrompt, Credentials, Session};
pub use spreadsheet::{SpreadsheetEdit, SpreadsheetSession};
pub use transport::{
    HttpRequest, HttpResponse, Method, MultipartFile, ReqwestTransport, RequestBody, Transport,
    TransportFailure,
};
pub use upload::UploadProgress;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a notebook
    pub use crate::{
        ApiClient, CellTarget, ClientConfig, ClientError, EngineState, ReconciliationEngine, Session,
    };
}
