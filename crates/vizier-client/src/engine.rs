//! Reconciliation engine
//!
//! Drives one edit at a time against a notebook:
//!
//! ```text
//! IDLE -> SUBMITTING -> { COMMITTED | FAILED } -> IDLE
//! ```
//!
//! - A second edit while one is submitting fails with `EditInProgress`
//! - Spreadsheet edits publish a provisional dataset page right away; it is
//!   dropped when the edit resolves, either replaced by the new notebook or
//!   rolled back on failure
//! - Local files named by the command are uploaded before submission
//! - Failures leave the committed notebook untouched and are recorded in the
//!   action-error log (except `AuthRequired`)
//!
//! Every change is published as an [`EngineView`] over a `watch` channel.

use crate::api::{ApiClient, ResourceRef};
use crate::error::{ActionErrorLog, ClientError};
use crate::spreadsheet::{SpreadsheetEdit, SpreadsheetSession};
use crate::transport::{HttpRequest, Method};
use crate::upload::{PercentFn, UploadProgress};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use vizier_command::{prepare, CommandRequest, CommandSpec, FileArgument, FormValues};
use vizier_notebook::{workflow_body, Notebook};
use vizier_resource::{rel, DatasetHandle, LinkTable, ModuleId};

/// Module id labelling a provisional dataset when no edit module is known yet
pub const PROVISIONAL_MODULE_ID: &str = "__0__";

/// Edit lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No edit in flight
    Idle,
    /// Request sent, waiting for the server
    Submitting,
    /// Server accepted the edit; the new notebook is installed
    Committed,
    /// Edit failed; the notebook is unchanged
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Submitting => "SUBMITTING",
            Self::Committed => "COMMITTED",
            Self::Failed => "FAILED",
        };
        f.pad(name)
    }
}

/// Dataset page patched ahead of the server
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalDataset {
    /// Module the page is shown under
    pub module_id: ModuleId,
    /// Patched page
    pub dataset: DatasetHandle,
}

/// Snapshot published to observers
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView {
    /// Committed notebook
    pub notebook: Notebook,
    /// Edit state
    pub state: EngineState,
    /// Optimistic dataset page, while an edit is in flight
    pub provisional: Option<ProvisionalDataset>,
}

/// Where an edit lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellTarget {
    /// New cell at this index: before the cell currently there, or appended
    /// when the index is the notebook length
    Insert(usize),
    /// Replace the command of an existing module
    Replace(ModuleId),
}

/// Serialises edits against one notebook and reconciles server answers
pub struct ReconciliationEngine {
    api: Arc<ApiClient>,
    view: watch::Sender<EngineView>,
    edit: Mutex<()>,
    errors: Arc<ActionErrorLog>,
    head_url: Option<String>,
    project_links: LinkTable,
    upload_progress: Option<PercentFn>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("state", &self.state())
            .field("cells", &self.view.borrow().notebook.len())
            .field("head_url", &self.head_url)
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Engine over an already loaded notebook
    #[must_use]
    pub fn new(api: Arc<ApiClient>, notebook: Notebook) -> Self {
        let (view, _) = watch::channel(EngineView {
            notebook,
            state: EngineState::Idle,
            provisional: None,
        });
        Self {
            api,
            view,
            edit: Mutex::new(()),
            errors: Arc::new(ActionErrorLog::new()),
            head_url: None,
            project_links: LinkTable::new(),
            upload_progress: None,
        }
    }

    /// With the branch-head URL used by [`ReconciliationEngine::refresh`]
    #[must_use]
    pub fn with_head_url(mut self, url: impl Into<String>) -> Self {
        self.head_url = Some(url.into());
        self
    }

    /// With the project links (file upload)
    #[must_use]
    pub fn with_project_links(mut self, links: LinkTable) -> Self {
        self.project_links = links;
        self
    }

    /// With a shared action-error log
    #[must_use]
    pub fn with_error_log(mut self, errors: Arc<ActionErrorLog>) -> Self {
        self.errors = errors;
        self
    }

    /// With an upload percentage callback
    #[must_use]
    pub fn with_upload_progress(mut self, progress: PercentFn) -> Self {
        self.upload_progress = Some(progress);
        self
    }

    /// Observe engine views
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.view.subscribe()
    }

    /// Current view
    #[must_use]
    pub fn view(&self) -> EngineView {
        self.view.borrow().clone()
    }

    /// Current committed notebook
    #[must_use]
    pub fn notebook(&self) -> Notebook {
        self.view.borrow().notebook.clone()
    }

    /// Current edit state
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.view.borrow().state
    }

    /// Action-error log
    #[must_use]
    pub fn errors(&self) -> &Arc<ActionErrorLog> {
        &self.errors
    }

    /// Replace the committed notebook (e.g. after navigating to a version)
    pub fn install(&self, notebook: Notebook) {
        self.view.send_modify(|view| {
            view.notebook = notebook;
            view.provisional = None;
        });
    }

    fn transition(&self, state: EngineState, provisional: Option<ProvisionalDataset>) {
        let previous = self.state();
        tracing::info!(from = %previous, to = %state, "edit state");
        self.view.send_modify(|view| {
            view.state = state;
            view.provisional = provisional;
        });
    }

    fn commit(&self, notebook: Notebook) -> Notebook {
        tracing::info!(from = %self.state(), to = %EngineState::Committed, cells = notebook.len(), "edit state");
        self.view.send_modify(|view| {
            view.notebook = notebook.clone();
            view.state = EngineState::Committed;
            view.provisional = None;
        });
        notebook
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>, ClientError> {
        self.edit.try_lock().map_err(|_| {
            tracing::debug!("edit rejected, another edit is in flight");
            ClientError::EditInProgress
        })
    }

    /// Submit a command to a target cell
    ///
    /// # Errors
    /// - `EditInProgress` if another edit has not resolved
    /// - `ReadOnlyWorkflow`, `FrozenCell`, `UnknownModule`, `MissingLink`
    ///   before anything is sent
    /// - any server or transport error; the notebook is left unchanged
    pub async fn submit(&self, target: CellTarget, command: CommandRequest) -> Result<Notebook, ClientError> {
        let _guard = self.begin()?;
        self.submit_locked(target, command, None, "Save cell").await
    }

    /// Validate form values, then submit
    ///
    /// Validation failures never reach the server and are not recorded as
    /// action errors; the form shows them.
    ///
    /// # Errors
    /// `Validation` for rejected values, otherwise as [`ReconciliationEngine::submit`]
    pub async fn submit_form(
        &self,
        target: CellTarget,
        spec: &CommandSpec,
        values: &FormValues,
    ) -> Result<Notebook, ClientError> {
        let command = prepare(spec, values)?;
        let file_param = spec.file_parameter().map(|p| p.id.clone());
        let _guard = self.begin()?;
        self.submit_locked(target, command, file_param.as_deref(), "Save cell")
            .await
    }

    /// Delete a module
    ///
    /// # Errors
    /// As [`ReconciliationEngine::submit`]
    pub async fn delete(&self, id: &ModuleId) -> Result<Notebook, ClientError> {
        let _guard = self.begin()?;
        let notebook = self.notebook();
        let resolved = resolve_existing(&notebook, id, rel::MODULE_DELETE);
        let url = match resolved {
            Ok((_, url)) => url,
            Err(err) => return Err(self.fail_early("Delete cell", err)),
        };
        let request = HttpRequest::new(Method::Delete, url);
        self.run(request, ResourceRef::new("module", id.as_str()), None, None, "Delete cell")
            .await
    }

    /// Apply a spreadsheet edit as a VIZUAL command
    ///
    /// The patched page is published as provisional before the request is
    /// sent. On success the session moves its insertion point past the new
    /// module; on failure the provisional page is dropped.
    ///
    /// # Errors
    /// `Validation` if the displayed dataset has no name, otherwise as
    /// [`ReconciliationEngine::submit`]
    pub async fn edit_spreadsheet(
        &self,
        session: &mut SpreadsheetSession,
        edit: &SpreadsheetEdit,
    ) -> Result<Notebook, ClientError> {
        let _guard = self.begin()?;
        let Some(dataset_name) = session.dataset_name().map(str::to_string) else {
            return Err(ClientError::Validation(vec![
                "The displayed dataset has no name".to_string(),
            ]));
        };

        let notebook = self.notebook();
        let index = session.insertion_index().min(notebook.len());
        let label = session
            .module_index
            .and_then(|i| notebook.get(i))
            .map_or_else(|| ModuleId::new(PROVISIONAL_MODULE_ID), |c| c.module.id.clone());
        let provisional = edit.apply(&session.dataset).map(|dataset| ProvisionalDataset {
            module_id: label,
            dataset,
        });

        let command = edit.to_command(&dataset_name);
        let result = self
            .submit_with(CellTarget::Insert(index), command, None, provisional, "Edit dataset")
            .await;
        match &result {
            Ok(updated) => session.supersede(index, updated),
            Err(err) => tracing::warn!(dataset = %dataset_name, error = %err, "spreadsheet edit rolled back"),
        }
        result
    }

    /// Fetch the page the spreadsheet should show after a committed edit
    ///
    /// # Errors
    /// As [`ApiClient::fetch_dataset_page`]
    pub async fn refresh_spreadsheet(&self, session: &mut SpreadsheetSession) -> Result<(), ClientError> {
        let Some(descriptor) = session.pending_refresh.clone() else {
            return Ok(());
        };
        let page = self
            .api
            .fetch_dataset_page(&descriptor, session.dataset.offset, None)
            .await?;
        session.refreshed(page);
        Ok(())
    }

    /// Ask the server to cancel the running workflow, then re-read the head
    ///
    /// Cancellation is best effort; a failed cancel request is logged and the
    /// head is re-read regardless.
    ///
    /// # Errors
    /// Errors of the head refresh
    pub async fn cancel_execution(&self) -> Result<Notebook, ClientError> {
        let notebook = self.notebook();
        match notebook.workflow().links.resolve(rel::WORKFLOW_CANCEL) {
            Some(url) => {
                let request = HttpRequest::new(Method::Post, url);
                let resource = ResourceRef::new("workflow", notebook.workflow().version.clone());
                if let Err(err) = self.api.execute(request, &resource).await {
                    tracing::warn!(error = %err, "cancel request failed");
                    self.errors.record("Cancel execution", &err);
                }
            }
            None => tracing::warn!("workflow offers no cancel link"),
        }
        self.refresh().await
    }

    /// Re-read the branch head and install it
    ///
    /// # Errors
    /// `MissingLink` when no head URL is known, otherwise see
    /// [`ApiClient::execute`]
    pub async fn refresh(&self) -> Result<Notebook, ClientError> {
        let notebook = self.notebook();
        let url = self.head_url_for(&notebook)?;
        let json = self.api.fetch_workflow_json(&url).await?;
        let updated = notebook.update_workflow(&json, None);
        self.install(updated.clone());
        Ok(updated)
    }

    async fn submit_locked(
        &self,
        target: CellTarget,
        command: CommandRequest,
        file_param: Option<&str>,
        title: &str,
    ) -> Result<Notebook, ClientError> {
        self.submit_with(target, command, file_param, None, title).await
    }

    async fn submit_with(
        &self,
        target: CellTarget,
        command: CommandRequest,
        file_param: Option<&str>,
        provisional: Option<ProvisionalDataset>,
        title: &str,
    ) -> Result<Notebook, ClientError> {
        let notebook = self.notebook();
        let resolved = match &target {
            CellTarget::Insert(index) => resolve_insert(&notebook, *index).map(|url| (Method::Post, url, None)),
            CellTarget::Replace(id) => resolve_existing(&notebook, id, rel::MODULE_REPLACE)
                .map(|(_, url)| (Method::Put, url, Some(id.clone()))),
        };
        let (method, url, modified) = match resolved {
            Ok(resolved) => resolved,
            Err(err) => return Err(self.fail_early(title, err)),
        };

        self.transition(EngineState::Submitting, provisional.clone());
        let command = match self.upload_pending_file(command, file_param).await {
            Ok(command) => command,
            Err(err) => return Err(self.fail(title, err)),
        };

        tracing::debug!(command = %format!("{}.{}", command.package_id, command.command_id), %url, "submitting edit");
        let request = HttpRequest::new(method, url).with_json(command.to_json());
        let resource = match &modified {
            Some(id) => ResourceRef::new("module", id.as_str()),
            None => ResourceRef::new("workflow", notebook.workflow().version.clone()),
        };
        self.run(request, resource, modified, provisional, title).await
    }

    async fn run(
        &self,
        request: HttpRequest,
        resource: ResourceRef,
        modified: Option<ModuleId>,
        provisional: Option<ProvisionalDataset>,
        title: &str,
    ) -> Result<Notebook, ClientError> {
        if self.state() != EngineState::Submitting {
            self.transition(EngineState::Submitting, provisional);
        }
        match self.api.execute(request, &resource).await {
            Ok(json) => {
                let updated = match self.reconcile(&json, modified.as_ref()).await {
                    Ok(updated) => updated,
                    Err(err) => return Err(self.fail(title, err)),
                };
                let committed = self.commit(updated);
                self.transition(EngineState::Idle, None);
                Ok(committed)
            }
            Err(err) => Err(self.fail(title, err)),
        }
    }

    // The edit endpoints answer with the new workflow version; an empty
    // answer means the head has to be read separately.
    async fn reconcile(&self, json: &Value, modified: Option<&ModuleId>) -> Result<Notebook, ClientError> {
        let notebook = self.notebook();
        if workflow_body(json).is_some() {
            return Ok(notebook.update_workflow(json, modified));
        }
        let url = self.head_url_for(&notebook)?;
        tracing::debug!(%url, "edit response carries no workflow, reading head");
        let head = self.api.fetch_workflow_json(&url).await?;
        Ok(notebook.update_workflow(&head, modified))
    }

    /// Configured head URL, else the workflow's own `self` link
    fn head_url_for(&self, notebook: &Notebook) -> Result<String, ClientError> {
        match &self.head_url {
            Some(url) => Ok(url.clone()),
            None => notebook
                .workflow()
                .links
                .resolve(rel::SELF)
                .map(str::to_string)
                .ok_or_else(|| ClientError::missing_link(rel::BRANCH_HEAD)),
        }
    }

    fn fail(&self, title: &str, err: ClientError) -> ClientError {
        if self.view.borrow().provisional.is_some() {
            tracing::warn!(error = %err, "discarding provisional dataset");
        }
        tracing::info!(from = %self.state(), to = %EngineState::Failed, error = %err, "edit state");
        self.view.send_modify(|view| {
            view.state = EngineState::Failed;
            view.provisional = None;
        });
        self.errors.record(title, &err);
        self.transition(EngineState::Idle, None);
        err
    }

    fn fail_early(&self, title: &str, err: ClientError) -> ClientError {
        tracing::debug!(error = %err, "edit rejected before submission");
        self.errors.record(title, &err);
        err
    }

    async fn upload_pending_file(
        &self,
        command: CommandRequest,
        file_param: Option<&str>,
    ) -> Result<CommandRequest, ClientError> {
        let pending = match file_param {
            Some(id) => command
                .argument(id)
                .and_then(FileArgument::from_value)
                .map(|file| (id.to_string(), file)),
            None => command.arguments.iter().find_map(|(id, value)| {
                FileArgument::from_value(value)
                    .filter(FileArgument::needs_upload)
                    .map(|file| (id.clone(), file))
            }),
        };
        let Some((argument, FileArgument::Local { path, file_name })) = pending else {
            return Ok(command);
        };

        let progress = Arc::new(UploadProgress::new(self.upload_progress.clone()));
        let uploaded = self
            .api
            .upload_file(&self.project_links, &path, &file_name, &progress)
            .await?;
        Ok(command.with_argument(argument, uploaded.to_value()))
    }
}

fn resolve_insert(notebook: &Notebook, index: usize) -> Result<String, ClientError> {
    if notebook.workflow().read_only {
        return Err(ClientError::ReadOnlyWorkflow);
    }
    if !notebook.can_insert_at(index) {
        return Err(ClientError::FrozenCell { index });
    }
    let url = match notebook.get(index) {
        Some(cell) => cell.module.links.require(rel::MODULE_INSERT)?,
        None => notebook.workflow().links.require(rel::MODULE_APPEND)?,
    };
    Ok(url.to_string())
}

fn resolve_existing(notebook: &Notebook, id: &ModuleId, relation: &str) -> Result<(usize, String), ClientError> {
    if notebook.workflow().read_only {
        return Err(ClientError::ReadOnlyWorkflow);
    }
    let index = notebook
        .position(id)
        .ok_or_else(|| ClientError::UnknownModule(id.to_string()))?;
    if !notebook.can_edit(index) {
        return Err(ClientError::FrozenCell { index });
    }
    let cell = notebook
        .get(index)
        .ok_or_else(|| ClientError::UnknownModule(id.to_string()))?;
    let url = cell.module.links.require(relation)?;
    Ok((index, url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::transport::{HttpResponse, MockTransport};
    use serde_json::json;
    use vizier_command::vizual;
    use vizier_notebook::OutputTag;

    fn module(id: &str, state: i64) -> Value {
        json!({
            "id": id,
            "state": state,
            "command": {"packageId": "vizual", "commandId": "load", "arguments": []},
            "stdout": [{"type": "text/plain", "value": id}],
            "links": [
                {"rel": "self", "href": format!("http://api/modules/{id}")},
                {"rel": "module-insert", "href": format!("http://api/modules/{id}/insert")},
                {"rel": "module-replace", "href": format!("http://api/modules/{id}/replace")},
                {"rel": "module-delete", "href": format!("http://api/modules/{id}/delete")}
            ]
        })
    }

    fn workflow(version: &str, modules: Vec<Value>) -> Value {
        json!({
            "version": version,
            "modules": modules,
            "datasets": [],
            "links": [
                {"rel": "self", "href": "http://api/workflows/head"},
                {"rel": "module-append", "href": "http://api/workflows/append"},
                {"rel": "workflow-cancel", "href": "http://api/workflows/cancel"}
            ]
        })
    }

    fn engine(transport: MockTransport, modules: Vec<Value>) -> ReconciliationEngine {
        let api = ApiClient::new(Arc::new(transport), Arc::new(Session::new()), ClientConfig::default());
        let notebook = Notebook::from_workflow_json(&workflow("1", modules));
        ReconciliationEngine::new(Arc::new(api), notebook)
    }

    #[tokio::test]
    async fn insert_before_uses_module_insert_link() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::Post && req.url == "http://api/modules/b/insert")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::json(
                    200,
                    &workflow("2", vec![module("a", 4), module("n", 4), module("b", 4)]),
                ))
            });
        let engine = engine(transport, vec![module("a", 4), module("b", 4)]);

        let updated = engine
            .submit(CellTarget::Insert(1), vizual::drop_dataset("people"))
            .await
            .unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(updated.get(1).unwrap().module.id, ModuleId::new("n"));
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.notebook().workflow().version, "2");
    }

    #[tokio::test]
    async fn replace_uses_put_and_rederives_the_modified_cell() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::Put && req.url == "http://api/modules/a/replace")
            .times(1)
            .returning(|_| Ok(HttpResponse::json(200, &workflow("2", vec![module("a", 4)]))));
        let engine = engine(transport, vec![module("a", 4)]);
        engine.install(
            engine
                .notebook()
                .replace_output(&ModuleId::new("a"), vizier_notebook::OutputVariant::Hidden),
        );

        let updated = engine
            .submit(CellTarget::Replace(ModuleId::new("a")), vizual::drop_dataset("x"))
            .await
            .unwrap();
        assert_eq!(updated.get(0).unwrap().output.tag(), OutputTag::Text);
    }

    #[tokio::test]
    async fn frozen_and_read_only_targets_are_rejected_locally() {
        let engine = engine(MockTransport::new(), vec![module("a", 3), module("b", 4)]);

        let err = engine
            .submit(CellTarget::Replace(ModuleId::new("b")), vizual::drop_dataset("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::FrozenCell { index: 1 });

        let err = engine
            .submit(CellTarget::Insert(2), vizual::drop_dataset("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::FrozenCell { index: 2 });

        let notebook = engine.notebook();
        engine.install(notebook.with_workflow(notebook.workflow().clone().with_head("9")));
        let err = engine.delete(&ModuleId::new("a")).await.unwrap_err();
        assert_eq!(err, ClientError::ReadOnlyWorkflow);
        assert_eq!(engine.errors().len(), 3);
    }

    #[tokio::test]
    async fn server_error_keeps_notebook_and_records_action_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(HttpResponse::json(400, &json!({"message": "Unknown column"}))));
        let engine = engine(transport, vec![module("a", 4)]);
        let before = engine.notebook();

        let err = engine.delete(&ModuleId::new("a")).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Server {
                message: "Unknown column".into(),
                status: 400
            }
        );
        assert_eq!(engine.notebook(), before);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.errors().entries()[0].message, "Unknown column");
    }

    #[tokio::test]
    async fn spreadsheet_edit_publishes_and_discards_provisional() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.url == "http://api/workflows/append"
                    && req.json().map(|b| b["id"] == json!("updateCell")) == Some(true)
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::raw(500, "not json")));
        let engine = engine(transport, vec![module("a", 4)]);
        let mut rx = engine.subscribe();

        let page = DatasetHandle::from_wire(&json!({
            "id": "d1",
            "name": "people",
            "columns": [{"id": 3, "name": "age"}],
            "rows": [{"id": "r1", "values": [31]}]
        }));
        let mut session = SpreadsheetSession::new(page, 0);
        let edit = SpreadsheetEdit::from_pending(3, Some("r1"), json!(32));

        let err = engine.edit_spreadsheet(&mut session, &edit).await.unwrap_err();
        assert_eq!(err, ClientError::UnparseableBody { status: 500 });
        assert_eq!(session.module_index, None);
        assert_eq!(session.dataset.cell(3, "r1"), Some(&json!(31)));

        let view = rx.borrow_and_update().clone();
        assert!(view.provisional.is_none());
        assert_eq!(view.state, EngineState::Idle);
    }

    #[tokio::test]
    async fn concurrent_edit_is_rejected() {
        let engine = engine(MockTransport::new(), vec![module("a", 4)]);
        let _held = engine.begin().unwrap();
        let err = engine
            .submit(CellTarget::Insert(1), vizual::drop_dataset("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::EditInProgress);
    }

    #[tokio::test]
    async fn cancel_is_best_effort_and_refreshes() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.url == "http://api/workflows/cancel")
            .times(1)
            .returning(|_| Ok(HttpResponse::raw(500, "")));
        transport
            .expect_send()
            .withf(|req| req.method == Method::Get && req.url == "http://api/workflows/head")
            .times(1)
            .returning(|_| Ok(HttpResponse::json(200, &workflow("1", vec![module("a", 2)]))));
        let engine = engine(transport, vec![module("a", 1)]);

        let updated = engine.cancel_execution().await.unwrap();
        assert!(updated.get(0).unwrap().has_error());
        assert_eq!(engine.errors().len(), 1);
    }

    #[tokio::test]
    async fn empty_edit_response_reads_head_from_self_link() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send()
            .withf(|req| req.method == Method::Post && req.url == "http://api/workflows/append")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::raw(204, "")));
        transport
            .expect_send()
            .withf(|req| req.method == Method::Get && req.url == "http://api/workflows/head")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::json(200, &workflow("2", vec![module("a", 4), module("n", 4)]))));
        let engine = engine(transport, vec![module("a", 4)]);

        let updated = engine
            .submit(CellTarget::Insert(1), vizual::drop_dataset("people"))
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated.workflow().version, "2");
        assert!(engine.errors().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn response_with_nested_descriptor_keeps_cells() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(HttpResponse::json(
                200,
                &json!({
                    "workflow": {"id": "2"},
                    "modules": [module("a", 4), module("b", 4), module("n", 4)],
                    "datasets": []
                }),
            ))
        });
        let engine = engine(transport, vec![module("a", 4), module("b", 4)]);

        let updated = engine
            .submit(CellTarget::Insert(2), vizual::drop_dataset("people"))
            .await
            .unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(engine.notebook().len(), 3);
    }
}
