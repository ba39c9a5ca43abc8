//! Shared fixtures for integration tests.
//!
//! [`MockHub`] stands in for a live hub: it hands out message IDs,
//! can be told to fail, and delivers inbound traffic through whatever
//! callable was installed on it.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use samp_tracker::{
    CallableClient, Client, ClientId, ClientRegistry, Error, HubConnection, Message,
    MessageTracker, Metadata, MsgId, MsgTag, RegInfo, Response, Result, Subscriptions,
    TrackingConnection,
};

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Payload Helpers
// ============================================================================

/// Builds an OK response with a single string entry.
pub fn ok_response(key: &str, value: &str) -> Response {
    let mut result = Map::new();
    result.insert(key.to_string(), Value::from(value));
    Response::ok(result)
}

/// Builds a ping message.
pub fn ping() -> Message {
    Message::new("samp.app.ping")
}

// ============================================================================
// MockHub
// ============================================================================

#[derive(Default)]
struct MockState {
    callable: Mutex<Option<Arc<dyn CallableClient>>>,
    failure: Mutex<Option<String>>,
    broadcast_targets: Mutex<Vec<ClientId>>,
    early_responses: Mutex<Vec<(ClientId, Response)>>,
    sync_response: Mutex<Option<Response>>,
    replies: Mutex<Vec<(MsgId, Response)>>,
    metadata: Mutex<Option<Metadata>>,
    next_msg_id: AtomicU64,
}

/// In-memory hub connection.
///
/// Clones share state, so a test can keep one clone while the tracker
/// wraps another.
#[derive(Clone)]
pub struct MockHub {
    reg_info: RegInfo,
    state: Arc<MockState>,
}

impl MockHub {
    pub fn new(self_id: &str) -> Self {
        Self {
            reg_info: RegInfo::new("hub", self_id),
            state: Arc::new(MockState::default()),
        }
    }

    /// Sets the recipients of `notify_all` and `call_all`.
    pub fn with_targets(self, targets: &[&str]) -> Self {
        *self.state.broadcast_targets.lock() = targets.iter().map(|id| ClientId::new(*id)).collect();
        self
    }

    /// Makes the next hub operation fail with a hub error.
    pub fn fail_next(&self, message: &str) {
        *self.state.failure.lock() = Some(message.to_string());
    }

    /// Queues a response delivered from inside the next `call_all`,
    /// before it returns.
    pub fn respond_early(&self, responder: &str, response: Response) {
        self.state
            .early_responses
            .lock()
            .push((ClientId::new(responder), response));
    }

    /// Sets what `call_and_wait` returns.
    pub fn set_sync_response(&self, response: Response) {
        *self.state.sync_response.lock() = Some(response);
    }

    /// Returns replies the hub has forwarded.
    pub fn replies(&self) -> Vec<(MsgId, Response)> {
        self.state.replies.lock().clone()
    }

    /// Returns the metadata most recently declared.
    pub fn declared_metadata(&self) -> Option<Metadata> {
        self.state.metadata.lock().clone()
    }

    /// Delivers a response to the installed callable.
    pub async fn deliver_response(&self, responder: &str, tag: &str, response: &Response) -> Result<()> {
        self.callable()?
            .receive_response(&ClientId::new(responder), &MsgTag::new(tag), response)
            .await
    }

    /// Delivers a call to the installed callable.
    pub async fn deliver_call(&self, sender: &str, msg_id: &str, msg: &Message) -> Result<()> {
        self.callable()?
            .receive_call(&ClientId::new(sender), &MsgId::new(msg_id), msg)
            .await
    }

    /// Delivers a notification to the installed callable.
    pub async fn deliver_notification(&self, sender: &str, msg: &Message) -> Result<()> {
        self.callable()?
            .receive_notification(&ClientId::new(sender), msg)
            .await
    }

    fn callable(&self) -> Result<Arc<dyn CallableClient>> {
        self.state
            .callable
            .lock()
            .clone()
            .ok_or_else(|| Error::hub("No callable installed"))
    }

    fn check_failure(&self) -> Result<()> {
        match self.state.failure.lock().take() {
            Some(message) => Err(Error::hub(message)),
            None => Ok(()),
        }
    }

    fn next_msg_id(&self) -> MsgId {
        let n = self.state.next_msg_id.fetch_add(1, Ordering::Relaxed);
        MsgId::new(format!("msg-{n}"))
    }
}

#[async_trait]
impl HubConnection for MockHub {
    fn reg_info(&self) -> &RegInfo {
        &self.reg_info
    }

    async fn ping(&self) -> Result<()> {
        self.check_failure()
    }

    async fn unregister(&self) -> Result<()> {
        self.check_failure()
    }

    async fn declare_metadata(&self, metadata: &Metadata) -> Result<()> {
        self.check_failure()?;
        *self.state.metadata.lock() = Some(metadata.clone());
        Ok(())
    }

    async fn declare_subscriptions(&self, _subscriptions: &Subscriptions) -> Result<()> {
        self.check_failure()
    }

    async fn set_callable(&self, callable: Arc<dyn CallableClient>) -> Result<()> {
        self.check_failure()?;
        *self.state.callable.lock() = Some(callable);
        Ok(())
    }

    async fn notify(&self, _recipient_id: &ClientId, _msg: &Message) -> Result<()> {
        self.check_failure()
    }

    async fn notify_all(&self, _msg: &Message) -> Result<Vec<ClientId>> {
        self.check_failure()?;
        Ok(self.state.broadcast_targets.lock().clone())
    }

    async fn call(&self, _recipient_id: &ClientId, _msg_tag: &MsgTag, _msg: &Message) -> Result<MsgId> {
        self.check_failure()?;
        Ok(self.next_msg_id())
    }

    async fn call_all(&self, msg_tag: &MsgTag, _msg: &Message) -> Result<FxHashMap<ClientId, MsgId>> {
        self.check_failure()?;

        let early: Vec<_> = self.state.early_responses.lock().drain(..).collect();
        for (responder, response) in early {
            self.callable()?
                .receive_response(&responder, msg_tag, &response)
                .await?;
        }

        let targets = self.state.broadcast_targets.lock().clone();
        Ok(targets
            .into_iter()
            .map(|id| (id, self.next_msg_id()))
            .collect())
    }

    async fn call_and_wait(
        &self,
        _recipient_id: &ClientId,
        _msg: &Message,
        timeout: Duration,
    ) -> Result<Response> {
        self.check_failure()?;
        self.state
            .sync_response
            .lock()
            .clone()
            .ok_or_else(|| Error::timeout("call_and_wait", timeout.as_millis() as u64))
    }

    async fn reply(&self, msg_id: &MsgId, response: &Response) -> Result<()> {
        self.check_failure()?;
        self.state.replies.lock().push((msg_id.clone(), response.clone()));
        Ok(())
    }
}

// ============================================================================
// RecordingClient
// ============================================================================

/// Application-side callable that counts what it receives.
#[derive(Default)]
pub struct RecordingClient {
    pub notifications: AtomicUsize,
    pub calls: AtomicUsize,
    pub responses: AtomicUsize,
    pub fail_calls: bool,
    pub fail_notifications: bool,
}

impl RecordingClient {
    pub fn failing() -> Self {
        Self {
            fail_calls: true,
            fail_notifications: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CallableClient for RecordingClient {
    async fn receive_notification(&self, _sender_id: &ClientId, _msg: &Message) -> Result<()> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        if self.fail_notifications {
            return Err(Error::handler("notification rejected"));
        }
        Ok(())
    }

    async fn receive_call(&self, _sender_id: &ClientId, _msg_id: &MsgId, _msg: &Message) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls {
            return Err(Error::handler("call rejected"));
        }
        Ok(())
    }

    async fn receive_response(
        &self,
        _responder_id: &ClientId,
        _msg_tag: &MsgTag,
        _response: &Response,
    ) -> Result<()> {
        self.responses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A tracker wrapping a mock hub registered as client `a`.
pub struct Fixture {
    pub registry: ClientRegistry,
    pub tracker: MessageTracker,
    pub hub: MockHub,
    pub connection: TrackingConnection<MockHub>,
    pub app: Arc<RecordingClient>,
}

/// Builds a fixture knowing the given peer clients.
pub async fn fixture(peers: &[&str], hub: MockHub) -> Fixture {
    fixture_with_app(peers, hub, RecordingClient::default()).await
}

/// Builds a fixture with a specific application callable.
pub async fn fixture_with_app(peers: &[&str], hub: MockHub, app: RecordingClient) -> Fixture {
    init_tracing();

    let registry = ClientRegistry::new();
    for peer in peers {
        registry.insert(
            Client::new(*peer).with_metadata(Metadata::new().with("samp.name", peer.to_uppercase())),
        );
    }

    let tracker = MessageTracker::builder()
        .registry(registry.clone())
        .name("test")
        .build()
        .expect("build tracker");

    let connection = tracker.wrap(hub.clone());
    let app = Arc::new(app);
    connection
        .set_callable(Arc::clone(&app) as Arc<dyn CallableClient>)
        .await
        .expect("install callable");

    Fixture {
        registry,
        tracker,
        hub,
        connection,
        app,
    }
}
