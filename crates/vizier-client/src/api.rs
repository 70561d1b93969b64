//! API client
//!
//! Every server call goes through [`ApiClient::execute`], which attaches the
//! session credentials, classifies the status code and recovers from a 401
//! once through the [`AuthPrompt`]:
//! - `[200, 400)`: body parsed as JSON (empty body is `null`)
//! - `401`: re-authenticate and retry once, else `AuthRequired`
//! - `404`: `NotFound` tied to the requested resource
//! - anything else: the body's `message`, or `UnparseableBody`
//!
//! URLs always come from a resource's link table.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{AuthPrompt, Session};
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use serde_json::{json, Value};
use std::sync::Arc;
use vizier_notebook::Notebook;
use vizier_resource::{
    rel, Annotation, AnnotationRequest, Branch, CellPointer, ChartDescriptor, ChartView,
    DatasetDescriptor, DatasetHandle, LinkTable, Module, ModuleId, Project, ServiceDescriptor,
    WorkflowDescriptor,
};

/// What a request is about, for `NotFound` errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource kind
    pub kind: &'static str,
    /// Identifier or URL
    pub id: String,
}

impl ResourceRef {
    /// Create a reference
    #[must_use]
    pub fn new(kind: &'static str, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

/// Classify a response by status code
///
/// # Errors
/// `AuthRequired`, `NotFound`, `Server`, `UnparseableBody`, or `Decode` for a
/// successful response whose body is not JSON
pub fn classify(response: &HttpResponse, resource: &ResourceRef) -> Result<Value, ClientError> {
    let status = response.status;
    match status {
        200..=399 => {
            if response.body.iter().all(u8::is_ascii_whitespace) {
                Ok(Value::Null)
            } else {
                Ok(vizier_resource::error::parse_json(&response.body)?)
            }
        }
        401 => Err(ClientError::AuthRequired),
        404 => Err(ClientError::NotFound {
            kind: resource.kind.to_string(),
            id: resource.id.clone(),
            status,
        }),
        _ => {
            let message = serde_json::from_slice::<Value>(&response.body)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
            match message {
                Some(message) => Err(ClientError::Server { message, status }),
                None => Err(ClientError::UnparseableBody { status }),
            }
        }
    }
}

fn with_query(url: &str, params: &[(&str, String)]) -> Result<String, ClientError> {
    let mut url = reqwest::Url::parse(url)
        .map_err(|err| ClientError::Decode(format!("invalid link '{url}': {err}")))?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

fn link<'a>(links: &'a LinkTable, relation: &str) -> Result<&'a str, ClientError> {
    Ok(links.require(relation)?)
}

/// Client for the Vizier web API
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    prompt: Option<Arc<dyn AuthPrompt>>,
    config: ClientConfig,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url)
            .field("authenticated", &self.session.is_authenticated())
            .field("prompt", &self.prompt.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client over any transport
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>, config: ClientConfig) -> Self {
        Self {
            transport,
            session,
            prompt: None,
            config,
        }
    }

    /// Create a client over the `reqwest` transport
    ///
    /// # Errors
    /// `ClientError::Config` if the HTTP client cannot be built
    pub fn with_reqwest(config: ClientConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), session, config))
    }

    /// With a prompt consulted on 401
    #[must_use]
    pub fn with_auth_prompt(mut self, prompt: Arc<dyn AuthPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    async fn send_once(&self, request: HttpRequest, resource: &ResourceRef) -> Result<Value, ClientError> {
        let uploading = request.is_upload();
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, "request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::from_transport(e.message, uploading))?;
        tracing::debug!(%method, %url, status = response.status, "response");

        if uploading && response.status == 413 {
            return Err(ClientError::UploadTooLarge);
        }
        classify(&response, resource)
    }

    /// Send a request with the session's credentials
    ///
    /// On `401` the auth prompt (if any) is consulted; fresh credentials are
    /// stored and the request is retried exactly once. Otherwise the session
    /// is cleared and `AuthRequired` is returned.
    ///
    /// # Errors
    /// See [`classify`]; transport failures map to `Transport` or
    /// `UploadTooLarge`
    pub async fn execute(&self, request: HttpRequest, resource: &ResourceRef) -> Result<Value, ClientError> {
        let first = request.clone().with_credentials(self.session.credentials());
        match self.send_once(first, resource).await {
            Err(ClientError::AuthRequired) => {}
            other => return other,
        }

        let fresh = match &self.prompt {
            Some(prompt) => prompt.request_credentials().await,
            None => None,
        };
        let Some(credentials) = fresh else {
            tracing::info!(url = %request.url, "authentication required");
            self.session.clear();
            return Err(ClientError::AuthRequired);
        };

        self.session.set_credentials(credentials.clone());
        let retry = request.with_credentials(Some(credentials));
        let result = self.send_once(retry, resource).await;
        if matches!(result, Err(ClientError::AuthRequired)) {
            self.session.clear();
        }
        result
    }

    /// GET a JSON resource
    ///
    /// # Errors
    /// See [`ApiClient::execute`]
    pub async fn get(&self, url: &str, resource: &ResourceRef) -> Result<Value, ClientError> {
        self.execute(HttpRequest::new(Method::Get, url), resource).await
    }

    /// Send a JSON body
    ///
    /// # Errors
    /// See [`ApiClient::execute`]
    pub async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: Value,
        resource: &ResourceRef,
    ) -> Result<Value, ClientError> {
        self.execute(HttpRequest::new(method, url).with_json(body), resource)
            .await
    }

    /// Service descriptor at the configured API root
    ///
    /// # Errors
    /// See [`ApiClient::execute`]
    pub async fn fetch_service(&self) -> Result<ServiceDescriptor, ClientError> {
        let url = self.config.api_url.clone();
        let json = self.get(&url, &ResourceRef::new("service", &url)).await?;
        Ok(ServiceDescriptor::from_wire(&json))
    }

    /// Project by URL
    ///
    /// # Errors
    /// See [`ApiClient::execute`]
    pub async fn fetch_project(&self, url: &str) -> Result<Project, ClientError> {
        let json = self.get(url, &ResourceRef::new("project", url)).await?;
        Ok(Project::from_wire(&json))
    }

    /// Head workflow of a branch, as raw JSON
    ///
    /// # Errors
    /// See [`ApiClient::execute`]
    pub async fn fetch_workflow_json(&self, url: &str) -> Result<Value, ClientError> {
        self.get(url, &ResourceRef::new("workflow", url)).await
    }

    /// Head workflow of a branch as a notebook
    ///
    /// # Errors
    /// `MissingLink` if the branch has no `branch-head` link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn fetch_branch_head(&self, branch: &Branch) -> Result<Notebook, ClientError> {
        let url = link(&branch.links, rel::BRANCH_HEAD)?;
        let json = self.fetch_workflow_json(url).await?;
        Ok(Notebook::from_workflow_json(&json))
    }

    /// Re-read one module
    ///
    /// # Errors
    /// `MissingLink` without a `self` link, otherwise see [`ApiClient::execute`]
    pub async fn fetch_module(&self, module: &Module) -> Result<Module, ClientError> {
        let url = link(&module.links, rel::SELF)?;
        let json = self
            .get(url, &ResourceRef::new("module", module.id.as_str()))
            .await?;
        Ok(Module::from_wire(&json))
    }

    /// One page of dataset rows
    ///
    /// # Errors
    /// `MissingLink` without a fetch or `self` link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn fetch_dataset_page(
        &self,
        dataset: &DatasetDescriptor,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<DatasetHandle, ClientError> {
        let base = match dataset.links.resolve(rel::DATASET_FETCH) {
            Some(url) => url,
            None => link(&dataset.links, rel::SELF)?,
        };
        let limit = limit.unwrap_or(self.config.dataset_page_size);
        let url = with_query(base, &[("offset", offset.to_string()), ("limit", limit.to_string())])?;
        let json = self.get(&url, &ResourceRef::new("dataset", &dataset.id)).await?;
        let mut handle = DatasetHandle::from_wire(&json);
        if handle.name.is_none() {
            handle.name.clone_from(&dataset.name);
        }
        Ok(handle)
    }

    /// Chart data
    ///
    /// # Errors
    /// `MissingLink` without a `self` link, otherwise see [`ApiClient::execute`]
    pub async fn fetch_chart(&self, chart: &ChartDescriptor) -> Result<ChartView, ClientError> {
        let url = link(&chart.links, rel::SELF)?;
        let json = self.get(url, &ResourceRef::new("chart", &chart.name)).await?;
        Ok(ChartView::from_wire(&json))
    }

    /// Annotations of one dataset cell
    ///
    /// # Errors
    /// `MissingLink` without an `annotations` link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn fetch_annotations(
        &self,
        dataset: &DatasetHandle,
        cell: &CellPointer,
    ) -> Result<Vec<Annotation>, ClientError> {
        let base = link(&dataset.links, rel::ANNOTATIONS)?;
        let url = with_query(
            base,
            &[("columnId", cell.column_id.to_string()), ("rowId", cell.row_id.clone())],
        )?;
        let json = self.get(&url, &ResourceRef::new("annotations", cell.key())).await?;
        Ok(Annotation::list_from_wire(&json))
    }

    /// Add, change or delete an annotation
    ///
    /// # Errors
    /// `MissingLink` without an `annotations` link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn update_annotation(
        &self,
        dataset: &DatasetHandle,
        request: &AnnotationRequest,
    ) -> Result<Vec<Annotation>, ClientError> {
        let url = link(&dataset.links, rel::ANNOTATIONS)?;
        let body = serde_json::to_value(request)?;
        let key = vizier_resource::annotation_key(request.column_id, &request.row_id);
        let json = self
            .send_json(Method::Post, url, body, &ResourceRef::new("annotations", key))
            .await?;
        Ok(Annotation::list_from_wire(&json))
    }

    /// Rename a project
    ///
    /// # Errors
    /// `MissingLink` without an update link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn update_project_name(&self, project: &Project, name: &str) -> Result<Project, ClientError> {
        let url = link(&project.links, rel::PROJECT_UPDATE_PROPERTY)?;
        let body = json!({"properties": [{"key": "name", "value": name}]});
        let json = self
            .send_json(Method::Post, url, body, &ResourceRef::new("project", &project.id))
            .await?;
        if json.is_null() {
            return Ok(project.with_name(name));
        }
        Ok(Project::from_wire(&json))
    }

    /// Rename a branch; returns the project with the branch replaced
    ///
    /// # Errors
    /// `MissingLink` without an update link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn update_branch_name(
        &self,
        project: &Project,
        branch: &Branch,
        name: &str,
    ) -> Result<Project, ClientError> {
        let url = link(&branch.links, rel::BRANCH_UPDATE_PROPERTY)?;
        let body = json!({"properties": [{"key": "name", "value": name}]});
        let json = self
            .send_json(Method::Post, url, body, &ResourceRef::new("branch", &branch.id))
            .await?;
        let updated = if json.is_null() {
            branch.clone().with_name(name)
        } else {
            Branch::from_wire(&json)
        };
        Ok(project.update_branch(updated))
    }

    /// Create a branch starting at a module of a workflow version
    ///
    /// # Errors
    /// `MissingLink` without a `branches` link, otherwise see
    /// [`ApiClient::execute`]
    pub async fn create_branch(
        &self,
        project: &Project,
        workflow: &WorkflowDescriptor,
        module: Option<&ModuleId>,
        name: &str,
    ) -> Result<(Project, Branch), ClientError> {
        let url = link(&project.links, rel::BRANCHES)?;
        let body = json!({
            "source": {
                "branchId": workflow.branch,
                "workflowId": workflow.version,
                "moduleId": module.map(ModuleId::as_str),
            },
            "properties": [{"key": "name", "value": name}],
        });
        let json = self
            .send_json(Method::Post, url, body, &ResourceRef::new("project", &project.id))
            .await?;
        let branch = Branch::from_wire(&json);
        tracing::info!(project = %project.id, branch = %branch.id, "branch created");
        Ok((project.add_branch(branch.clone()), branch))
    }
}
