//! File upload
//!
//! Local files named by a `fileid` argument are uploaded into the project's
//! file store before the command is submitted. Progress is reported as a
//! percentage that never decreases and ends at 100 on success.

use crate::api::{ApiClient, ResourceRef};
use crate::error::ClientError;
use crate::transport::{HttpRequest, Method, MultipartFile, ProgressFn};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use vizier_command::FileArgument;
use vizier_resource::{rel, wire, LinkTable};

/// Percentage callback
pub type PercentFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Monotonic upload progress
pub struct UploadProgress {
    last: AtomicU8,
    sink: Option<PercentFn>,
}

impl std::fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProgress")
            .field("percent", &self.percent())
            .finish_non_exhaustive()
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UploadProgress {
    /// Progress tracker forwarding increases to `sink`
    #[must_use]
    pub fn new(sink: Option<PercentFn>) -> Self {
        Self {
            last: AtomicU8::new(0),
            sink,
        }
    }

    /// Last reported percentage
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }

    /// Report bytes sent; returns the new percentage if it increased
    pub fn report(&self, sent: u64, total: u64) -> Option<u8> {
        let percent = if total == 0 {
            100
        } else {
            u8::try_from(u128::from(sent.min(total)) * 100 / u128::from(total)).unwrap_or(100)
        };
        self.advance(percent)
    }

    /// Mark the upload as complete
    pub fn complete(&self) {
        self.advance(100);
    }

    fn advance(&self, percent: u8) -> Option<u8> {
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent <= previous {
            return None;
        }
        if let Some(sink) = &self.sink {
            sink(percent);
        }
        Some(percent)
    }

    /// Byte-level callback for the transport
    #[must_use]
    pub fn byte_callback(self: &Arc<Self>) -> ProgressFn {
        let progress = Arc::clone(self);
        Arc::new(move |sent, total| {
            progress.report(sent, total);
        })
    }
}

impl ApiClient {
    /// Upload bytes into a project's file store
    ///
    /// The returned argument carries the server-side file id.
    ///
    /// # Errors
    /// `MissingLink` without an upload link, `UploadTooLarge` when the
    /// configured limit is exceeded or the server rejects the size, otherwise
    /// see [`ApiClient::execute`]
    pub async fn upload_bytes(
        &self,
        project_links: &LinkTable,
        file_name: &str,
        content: Vec<u8>,
        progress: &Arc<UploadProgress>,
    ) -> Result<FileArgument, ClientError> {
        if let Some(limit) = self.config().max_upload_bytes {
            if content.len() as u64 > limit {
                tracing::warn!(file = file_name, size = content.len(), limit, "upload exceeds limit");
                return Err(ClientError::UploadTooLarge);
            }
        }
        let url = project_links.require(rel::PROJECT_FILE_UPLOAD)?;
        let request = HttpRequest::new(Method::Post, url)
            .with_multipart(MultipartFile {
                field: "file".to_string(),
                file_name: file_name.to_string(),
                content,
            })
            .with_progress(progress.byte_callback());

        let json = self
            .execute(request, &ResourceRef::new("file", file_name))
            .await?;
        progress.complete();

        let file_id = wire::id_field(&json, "id").ok_or_else(|| {
            ClientError::Decode("upload response carries no file id".to_string())
        })?;
        tracing::info!(file = file_name, %file_id, "file uploaded");
        Ok(FileArgument::Uploaded {
            file_id,
            file_name: wire::str_field(&json, "name").unwrap_or_else(|| file_name.to_string()),
            url: LinkTable::of(&json).resolve(rel::SELF).map(str::to_string),
        })
    }

    /// Upload a local file
    ///
    /// # Errors
    /// `Config` if the file cannot be read, otherwise see
    /// [`ApiClient::upload_bytes`]
    pub async fn upload_file(
        &self,
        project_links: &LinkTable,
        path: &Path,
        file_name: &str,
        progress: &Arc<UploadProgress>,
    ) -> Result<FileArgument, ClientError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        self.upload_bytes(project_links, file_name, content, progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::transport::{HttpResponse, MockTransport};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let progress = UploadProgress::new(Some(Arc::new(move |p| sink_seen.lock().push(p))));

        assert_eq!(progress.report(10, 100), Some(10));
        assert_eq!(progress.report(5, 100), None);
        assert_eq!(progress.report(10, 100), None);
        assert_eq!(progress.report(150, 100), Some(100));
        progress.complete();

        assert_eq!(*seen.lock(), vec![10, 100]);
        assert_eq!(progress.percent(), 100);
    }

    proptest! {
        #[test]
        fn sink_sees_increasing_percentages(
            reports in prop::collection::vec((any::<u64>(), 0u64..=4096), 0..32),
        ) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink_seen = Arc::clone(&seen);
            let progress = UploadProgress::new(Some(Arc::new(move |p| sink_seen.lock().push(p))));

            for (sent, total) in reports {
                let before = progress.percent();
                let reported = progress.report(sent, total);
                prop_assert!(progress.percent() >= before);
                prop_assert_eq!(reported.is_some(), progress.percent() > before);
            }
            progress.complete();

            let seen = seen.lock();
            prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(seen.iter().all(|p| *p <= 100));
            prop_assert_eq!(seen.last().copied(), Some(100));
        }
    }

    #[test]
    fn empty_upload_is_complete() {
        let progress = UploadProgress::default();
        assert_eq!(progress.report(0, 0), Some(100));
    }

    #[tokio::test]
    async fn upload_rewrites_to_file_id() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.is_upload() && req.url == "http://api/p1/files")
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::json(
                    201,
                    &json!({"id": "f-9", "name": "people.csv", "links": [{"rel": "self", "href": "http://api/files/f-9"}]}),
                ))
            });
        let api = ApiClient::new(Arc::new(transport), Arc::new(Session::new()), ClientConfig::default());
        let links = LinkTable::from_pairs([(rel::PROJECT_FILE_UPLOAD, "http://api/p1/files")]);
        let progress = Arc::new(UploadProgress::default());

        let file = api
            .upload_bytes(&links, "people.csv", b"a,b\n".to_vec(), &progress)
            .await
            .unwrap();
        assert_eq!(
            file,
            FileArgument::Uploaded {
                file_id: "f-9".into(),
                file_name: "people.csv".into(),
                url: Some("http://api/files/f-9".into()),
            }
        );
        assert_eq!(progress.percent(), 100);
    }

    #[tokio::test]
    async fn configured_limit_rejects_before_sending() {
        let api = ApiClient::new(
            Arc::new(MockTransport::new()),
            Arc::new(Session::new()),
            ClientConfig::default().with_max_upload_bytes(2),
        );
        let links = LinkTable::from_pairs([(rel::PROJECT_FILE_UPLOAD, "http://api/p1/files")]);
        let err = api
            .upload_bytes(&links, "big.csv", vec![0; 3], &Arc::new(UploadProgress::default()))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::UploadTooLarge);
    }
}
