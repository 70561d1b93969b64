//! Testing utilities for the Vizier client workspace
//!
//! Workflow JSON fixtures and a scripted in-memory transport.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use vizier_client::{
    ApiClient, ClientConfig, HttpRequest, HttpResponse, Method, Session, Transport, TransportFailure,
};

pub const APPEND_URL: &str = "http://vizier.test/workflows/head/modules";
pub const HEAD_URL: &str = "http://vizier.test/branches/b1/head";
pub const CANCEL_URL: &str = "http://vizier.test/workflows/head/cancel";
pub const UPLOAD_URL: &str = "http://vizier.test/projects/p1/files";

pub fn module_url(id: &str) -> String {
    format!("http://vizier.test/workflows/head/modules/{id}")
}

/// Module payload with text output and the usual edit links
pub fn module_json(id: &str, state: i64) -> Value {
    let url = module_url(id);
    json!({
        "id": id,
        "state": state,
        "command": {"packageId": "vizual", "commandId": "load", "arguments": [
            {"name": "name", "value": "people"}
        ]},
        "text": format!("LOAD DATASET people ({id})"),
        "stdout": [{"type": "text/plain", "value": format!("output of {id}")}],
        "stderr": [],
        "timestamps": {"createdAt": "2024-01-02T03:04:05Z"},
        "links": [
            {"rel": "self", "href": url},
            {"rel": "module-insert", "href": format!("{url}/insert")},
            {"rel": "module-replace", "href": url},
            {"rel": "module-delete", "href": url}
        ]
    })
}

/// Module that produced the `people` dataset
pub fn dataset_module_json(id: &str, dataset_id: &str) -> Value {
    let mut module = module_json(id, 4);
    module["datasets"] = json!([{"id": dataset_id, "name": "people"}]);
    module
}

/// Dataset descriptor for the workflow-level index
pub fn dataset_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "people",
        "columns": [{"id": 0, "name": "name"}, {"id": 3, "name": "age"}],
        "links": [
            {"rel": "self", "href": format!("http://vizier.test/datasets/{id}")},
            {"rel": "annotations", "href": format!("http://vizier.test/datasets/{id}/annotations")},
            {"rel": "dataset-download", "href": format!("http://vizier.test/datasets/{id}/csv")}
        ]
    })
}

/// Page of the `people` dataset
pub fn dataset_page_json(id: &str) -> Value {
    let mut page = dataset_json(id);
    page["rows"] = json!([
        {"id": "r0", "values": ["Alice", 23]},
        {"id": "r1", "values": ["Bob", 31]}
    ]);
    page["offset"] = json!(0);
    page["rowCount"] = json!(2);
    page
}

/// Workflow fetch response
pub fn workflow_json(version: &str, modules: Vec<Value>, datasets: Vec<Value>) -> Value {
    json!({
        "version": version,
        "branch": "b1",
        "createdAt": "2024-01-02T03:04:05Z",
        "action": "apd",
        "modules": modules,
        "datasets": datasets,
        "links": [
            {"rel": "self", "href": HEAD_URL},
            {"rel": "module-append", "href": APPEND_URL},
            {"rel": "workflow-cancel", "href": CANCEL_URL}
        ]
    })
}

/// Workflow of `n` successful modules `m0..m{n-1}`
pub fn successful_workflow(version: &str, n: usize) -> Value {
    let modules = (0..n).map(|i| module_json(&format!("m{i}"), 4)).collect();
    workflow_json(version, modules, Vec::new())
}

/// One scripted answer
#[derive(Debug, Clone)]
pub struct Step {
    pub method: Method,
    pub url: String,
    pub reply: Result<HttpResponse, TransportFailure>,
}

/// Transport answering from a script, in order, and recording every request
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(self, method: Method, url: impl Into<String>, reply: HttpResponse) -> Self {
        self.script.lock().push_back(Step {
            method,
            url: url.into(),
            reply: Ok(reply),
        });
        self
    }

    pub fn expect_json(self, method: Method, url: impl Into<String>, status: u16, body: &Value) -> Self {
        self.expect(method, url, HttpResponse::json(status, body))
    }

    pub fn expect_failure(self, method: Method, url: impl Into<String>, message: &str) -> Self {
        self.script.lock().push_back(Step {
            method,
            url: url.into(),
            reply: Err(TransportFailure::new(message)),
        });
        self
    }

    /// Requests sent so far
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().clone()
    }

    /// Steps not consumed yet
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.sent.lock().push(request.clone());
        let step = self.script.lock().pop_front();
        match step {
            Some(step) if step.method == request.method && step.url == request.url => step.reply,
            Some(step) => Err(TransportFailure::new(format!(
                "unexpected request {} {} (script expected {} {})",
                request.method, request.url, step.method, step.url
            ))),
            None => Err(TransportFailure::new(format!(
                "unexpected request {} {} (script exhausted)",
                request.method, request.url
            ))),
        }
    }
}

/// API client over a scripted transport
pub fn scripted_api(transport: Arc<ScriptedTransport>, session: Arc<Session>) -> ApiClient {
    ApiClient::new(transport, session, ClientConfig::default())
}
