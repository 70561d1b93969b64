//! HTTP transport seam
//!
//! The client never talks to `reqwest` directly; it sends [`HttpRequest`]s
//! through a [`Transport`]. Status codes are not interpreted here: a 4xx or
//! 5xx answer is still an `Ok(HttpResponse)`. Only connection-level failures
//! become a [`TransportFailure`].

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::Credentials;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Size of the chunks a multipart body is streamed in
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Byte-level progress callback: `(sent, total)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File sent as a single multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// File content
    pub content: Vec<u8>,
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON document
    Json(Value),
    /// Multipart form with one file
    Multipart(MultipartFile),
}

/// Outgoing request
#[derive(Clone)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL, always taken from a link table
    pub url: String,
    /// Body
    pub body: RequestBody,
    /// Credentials to attach as a bearer token
    pub credentials: Option<Credentials>,
    /// Upload progress callback for multipart bodies
    pub progress: Option<ProgressFn>,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("authenticated", &self.credentials.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl HttpRequest {
    /// Request without body
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: RequestBody::Empty,
            credentials: None,
            progress: None,
        }
    }

    /// With JSON body
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// With multipart body
    #[must_use]
    pub fn with_multipart(mut self, file: MultipartFile) -> Self {
        self.body = RequestBody::Multipart(file);
        self
    }

    /// With credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// With progress callback
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Whether the body is a file upload
    #[must_use]
    pub fn is_upload(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }

    /// JSON body, if any
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Raw response: status code and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status
    pub status: u16,
    /// Body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with a JSON body
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Response with a raw body
    #[must_use]
    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Connection-level failure (no HTTP status available)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    /// Failure description
    pub message: String,
}

impl TransportFailure {
    /// Create failure
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends requests to the server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// Production transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client from configuration
    ///
    /// # Errors
    /// `ClientError::Config` if the TLS backend cannot be initialised
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    fn multipart(file: MultipartFile, progress: Option<ProgressFn>) -> reqwest::multipart::Form {
        let total = file.content.len() as u64;
        let sent = Arc::new(AtomicU64::new(0));
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = file
            .content
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        let stream = futures::stream::iter(chunks).inspect(move |chunk| {
            if let (Ok(chunk), Some(progress)) = (chunk, &progress) {
                let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
                progress(so_far, total);
            }
        });
        let part = reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file.file_name);
        reqwest::multipart::Form::new().part(file.field, part)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        if let Some(credentials) = &request.credentials {
            builder = builder.bearer_auth(&credentials.token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(file) => builder.multipart(Self::multipart(file, request.progress)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::new(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::new(e.to_string()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
