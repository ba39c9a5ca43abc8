//! Correlation benchmark suite.
//!
//! Benchmarks tracked traffic against an in-memory hub:
//! - Single call/response round trips, issued concurrently
//! - Broadcasts to growing recipient sets
//!
//! Run with: cargo bench --bench correlation
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::future::join_all;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Map;
use tokio::runtime::Runtime;

use samp_tracker::{
    CallableClient, Client, ClientId, ClientRegistry, Error, HubConnection, Message,
    MessageTracker, Metadata, MsgId, MsgTag, RegInfo, Response, Result, Subscriptions,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CONCURRENT_CALLS: &[usize] = &[10, 100, 1000];
const BROADCAST_SIZES: &[usize] = &[10, 100, 500];

// ============================================================================
// Echo Hub
// ============================================================================

/// Hub that answers every call immediately through the installed callable.
struct EchoHub {
    reg_info: RegInfo,
    peers: Vec<ClientId>,
    callable: Mutex<Option<Arc<dyn CallableClient>>>,
    next_msg_id: AtomicU64,
}

impl EchoHub {
    fn new(peers: Vec<ClientId>) -> Self {
        Self {
            reg_info: RegInfo::new("hub", "bench"),
            peers,
            callable: Mutex::new(None),
            next_msg_id: AtomicU64::new(0),
        }
    }

    fn callable(&self) -> Result<Arc<dyn CallableClient>> {
        self.callable
            .lock()
            .clone()
            .ok_or_else(|| Error::hub("No callable installed"))
    }

    fn next_msg_id(&self) -> MsgId {
        MsgId::new(format!("msg-{}", self.next_msg_id.fetch_add(1, Ordering::Relaxed)))
    }
}

#[async_trait]
impl HubConnection for EchoHub {
    fn reg_info(&self) -> &RegInfo {
        &self.reg_info
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn unregister(&self) -> Result<()> {
        Ok(())
    }

    async fn declare_metadata(&self, _metadata: &Metadata) -> Result<()> {
        Ok(())
    }

    async fn declare_subscriptions(&self, _subscriptions: &Subscriptions) -> Result<()> {
        Ok(())
    }

    async fn set_callable(&self, callable: Arc<dyn CallableClient>) -> Result<()> {
        *self.callable.lock() = Some(callable);
        Ok(())
    }

    async fn notify(&self, _recipient_id: &ClientId, _msg: &Message) -> Result<()> {
        Ok(())
    }

    async fn notify_all(&self, _msg: &Message) -> Result<Vec<ClientId>> {
        Ok(self.peers.clone())
    }

    async fn call(&self, recipient_id: &ClientId, msg_tag: &MsgTag, _msg: &Message) -> Result<MsgId> {
        let msg_id = self.next_msg_id();
        self.callable()?
            .receive_response(recipient_id, msg_tag, &Response::ok(Map::new()))
            .await?;
        Ok(msg_id)
    }

    async fn call_all(&self, msg_tag: &MsgTag, _msg: &Message) -> Result<FxHashMap<ClientId, MsgId>> {
        // Every response overtakes the call_all return.
        let callable = self.callable()?;
        let mut msg_ids = FxHashMap::default();
        for peer in &self.peers {
            callable
                .receive_response(peer, msg_tag, &Response::ok(Map::new()))
                .await?;
            msg_ids.insert(peer.clone(), self.next_msg_id());
        }
        Ok(msg_ids)
    }

    async fn call_and_wait(
        &self,
        _recipient_id: &ClientId,
        _msg: &Message,
        _timeout: Duration,
    ) -> Result<Response> {
        Ok(Response::ok(Map::new()))
    }

    async fn reply(&self, _msg_id: &MsgId, _response: &Response) -> Result<()> {
        Ok(())
    }
}

/// Application handler that ignores everything.
struct Sink;

#[async_trait]
impl CallableClient for Sink {
    async fn receive_notification(&self, _sender_id: &ClientId, _msg: &Message) -> Result<()> {
        Ok(())
    }

    async fn receive_call(&self, _sender_id: &ClientId, _msg_id: &MsgId, _msg: &Message) -> Result<()> {
        Ok(())
    }

    async fn receive_response(
        &self,
        _responder_id: &ClientId,
        _msg_tag: &MsgTag,
        _response: &Response,
    ) -> Result<()> {
        Ok(())
    }
}

fn peers(count: usize) -> (ClientRegistry, Vec<ClientId>) {
    let registry = ClientRegistry::new();
    let ids: Vec<_> = (0..count).map(|i| ClientId::new(format!("peer-{i}"))).collect();
    for id in &ids {
        registry.insert(Client::new(id.clone()));
    }
    (registry, ids)
}

// ============================================================================
// Benchmark: Concurrent Calls
// ============================================================================

async fn concurrent_calls(count: usize) {
    let (registry, ids) = peers(count);
    let tracker = MessageTracker::builder()
        .registry(registry)
        .build()
        .expect("build tracker");
    let connection = tracker.wrap(EchoHub::new(ids.clone()));
    connection
        .set_callable(Arc::new(Sink))
        .await
        .expect("install callable");

    let msg = Message::new("samp.app.ping");
    let calls = ids.iter().map(|id| {
        let tag = MsgTag::generate();
        let connection = &connection;
        let msg = &msg;
        async move { connection.call(id, &tag, msg).await }
    });
    for result in join_all(calls).await {
        result.expect("call");
    }

    tracker.flush().await.expect("flush");
    assert_eq!(tracker.sent().waiting_count(), 0);
    tracker.shutdown();
}

fn bench_concurrent_calls(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("concurrent_calls");
    for &count in CONCURRENT_CALLS {
        group.bench_with_input(BenchmarkId::new("call", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| concurrent_calls(count));
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Broadcast
// ============================================================================

async fn broadcast(count: usize) {
    let (registry, ids) = peers(count);
    let tracker = MessageTracker::builder()
        .registry(registry)
        .build()
        .expect("build tracker");
    let connection = tracker.wrap(EchoHub::new(ids));
    connection
        .set_callable(Arc::new(Sink))
        .await
        .expect("install callable");

    connection
        .call_all(&MsgTag::generate(), &Message::new("samp.app.ping"))
        .await
        .expect("call_all");

    tracker.flush().await.expect("flush");
    assert!(tracker.active_broadcasts().await.expect("query").is_empty());
    tracker.shutdown();
}

fn bench_broadcast(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("broadcast");
    for &count in BROADCAST_SIZES {
        group.bench_with_input(BenchmarkId::new("call_all", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| broadcast(count));
        });
    }
    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_concurrent_calls, bench_broadcast);
criterion_main!(benches);
