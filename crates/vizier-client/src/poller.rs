//! Module status polling
//!
//! Each poll is a task owned by whoever started it through a [`PollHandle`].
//! Dropping or cancelling the handle stops the task; the task also stops by
//! itself once the module leaves the pending/running states. Updates are
//! delivered over an `mpsc` channel, the last one being the settled module.

use crate::api::ApiClient;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use ulid::Ulid;
use vizier_resource::{Module, ModuleId};

/// Buffered module updates per poll
const CHANNEL_CAPACITY: usize = 16;

/// Running poll of one module
#[derive(Debug)]
pub struct PollHandle {
    module_id: ModuleId,
    token: Ulid,
    task: JoinHandle<()>,
    active: Arc<DashMap<ModuleId, Ulid>>,
}

impl PollHandle {
    /// Module being polled
    #[inline]
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Whether the poll loop has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            tracing::debug!(module = %self.module_id, "poll cancelled");
        }
        self.task.abort();
        let token = self.token;
        self.active.remove_if(&self.module_id, |_, t| *t == token);
    }
}

/// Starts per-module polls
#[derive(Debug, Clone)]
pub struct ModulePoller {
    api: Arc<ApiClient>,
    interval: Duration,
    active: Arc<DashMap<ModuleId, Ulid>>,
}

impl ModulePoller {
    /// Poller using the configured interval
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        let interval = api.config().poll_interval();
        Self {
            api,
            interval,
            active: Arc::new(DashMap::new()),
        }
    }

    /// With a different interval
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether a live poll exists for a module
    #[must_use]
    pub fn is_polling(&self, id: &ModuleId) -> bool {
        self.active.contains_key(id)
    }

    /// Number of live polls
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if nothing is being polled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Poll a module until it settles
    ///
    /// Must be called inside a Tokio runtime. A module that is already
    /// settled is delivered once and the poll ends immediately.
    #[must_use]
    pub fn watch(&self, module: &Module) -> (PollHandle, mpsc::Receiver<Module>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = Ulid::new();
        let module_id = module.id.clone();
        self.active.insert(module_id.clone(), token);

        let api = Arc::clone(&self.api);
        let active = Arc::clone(&self.active);
        let interval = self.interval;
        let mut current = module.clone();

        let task = tokio::spawn(async move {
            tracing::debug!(module = %current.id, "poll started");
            while current.is_active() {
                tokio::time::sleep(interval).await;
                match api.fetch_module(&current).await {
                    Ok(mut fetched) => {
                        if fetched.links.is_empty() {
                            fetched.links = current.links.clone();
                        }
                        let changed = !fetched.same_outcome(&current);
                        current = fetched;
                        if changed && current.is_active() && tx.send(current.clone()).await.is_err() {
                            break;
                        }
                    }
                    Err(err) if err.is_retryable() => {
                        tracing::warn!(module = %current.id, error = %err, "poll failed, retrying");
                    }
                    Err(err) => {
                        tracing::warn!(module = %current.id, error = %err, "poll failed, stopping");
                        break;
                    }
                }
            }
            if !current.is_active() {
                let _ = tx.send(current.clone()).await;
            }
            active.remove_if(&current.id, |_, t| *t == token);
            tracing::debug!(module = %current.id, state = ?current.state, "poll stopped");
        });

        let handle = PollHandle {
            module_id,
            token,
            task,
            active: Arc::clone(&self.active),
        };
        (handle, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::transport::{HttpResponse, MockTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vizier_resource::ModuleState;

    fn running_module() -> Module {
        Module::from_wire(&json!({
            "id": "m1",
            "state": 1,
            "links": [{"rel": "self", "href": "http://api/modules/m1"}]
        }))
    }

    fn poller(transport: MockTransport) -> ModulePoller {
        let api = ApiClient::new(Arc::new(transport), Arc::new(Session::new()), ClientConfig::default());
        ModulePoller::new(Arc::new(api)).with_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn stops_when_module_settles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut transport = MockTransport::new();
        transport.expect_send().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let state = if n < 2 { 1 } else { 4 };
            Ok(HttpResponse::json(200, &json!({"id": "m1", "state": state})))
        });
        let poller = poller(transport);

        let (handle, mut rx) = poller.watch(&running_module());
        assert!(poller.is_polling(&ModuleId::new("m1")));

        let mut last = None;
        while let Some(module) = rx.recv().await {
            last = Some(module);
        }
        let last = last.unwrap();
        assert_eq!(last.state, ModuleState::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!last.links.is_empty());

        tokio::task::yield_now().await;
        drop(handle);
        assert!(!poller.is_polling(&ModuleId::new("m1")));
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(HttpResponse::json(200, &json!({"id": "m1", "state": 1}))));
        let poller = poller(transport);

        let (handle, mut rx) = poller.watch(&running_module());
        handle.cancel();
        assert!(poller.is_empty());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn settled_module_is_delivered_once() {
        let poller = poller(MockTransport::new());
        let mut settled = running_module();
        settled.state = ModuleState::Error;

        let (_handle, mut rx) = poller.watch(&settled);
        assert_eq!(rx.recv().await.map(|m| m.state), Some(ModuleState::Error));
        assert!(rx.recv().await.is_none());
    }
}
