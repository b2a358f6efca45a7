//! In-memory runtime used by unit tests

use super::{EventStream, LogReader, RuntimeClient, StatStream};
use crate::error::{Error, Result};
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub(crate) struct FakeRuntime {
    host: Host,
    containers: Mutex<HashMap<String, Container>>,
    logs: Mutex<HashMap<String, Vec<u8>>>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<Result<ContainerEvent>>>>,
    stats_tx: Mutex<HashMap<String, mpsc::UnboundedSender<Result<ContainerStat>>>>,
    actions: Mutex<Vec<(ContainerAction, String)>>,
    follow_requests: Mutex<Vec<Option<DateTime<Utc>>>>,
    event_subscriptions: AtomicUsize,
    fail_listing: AtomicBool,
    fail_actions: AtomicBool,
}

impl FakeRuntime {
    pub fn new(host_id: &str) -> Self {
        let mut host = Host::new(host_id, format!("{}-name", host_id));
        host.cpu_cores = 4;
        host.memory = 8 * 1024 * 1024 * 1024;
        host.runtime_version = "24.0.7".to_string();
        Self {
            host,
            containers: Mutex::new(HashMap::new()),
            logs: Mutex::new(HashMap::new()),
            events_tx: Mutex::new(None),
            stats_tx: Mutex::new(HashMap::new()),
            actions: Mutex::new(Vec::new()),
            follow_requests: Mutex::new(Vec::new()),
            event_subscriptions: AtomicUsize::new(0),
            fail_listing: AtomicBool::new(false),
            fail_actions: AtomicBool::new(false),
        }
    }

    pub fn add_container(&self, container: Container) {
        self.containers
            .lock()
            .insert(container.id.clone(), container);
    }

    pub fn remove_container(&self, id: &str) {
        self.containers.lock().remove(id);
    }

    pub fn set_logs(&self, id: &str, bytes: Vec<u8>) {
        self.logs.lock().insert(id.to_string(), bytes);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<(ContainerAction, String)> {
        self.actions.lock().clone()
    }

    /// The `since` of every follow request, in order
    pub fn follow_requests(&self) -> Vec<Option<DateTime<Utc>>> {
        self.follow_requests.lock().clone()
    }

    pub fn event_subscriptions(&self) -> usize {
        self.event_subscriptions.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` event subscriptions were opened
    pub async fn wait_for_subscriptions(&self, n: usize) {
        for _ in 0..500 {
            if self.event_subscriptions() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("runtime never saw {} event subscriptions", n);
    }

    /// Wait until a stats stream is open for `id`
    pub async fn wait_for_stats(&self, id: &str) {
        for _ in 0..500 {
            if self.stats_tx.lock().contains_key(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stats stream for {} never opened", id);
    }

    pub fn emit(&self, actor_id: &str, name: &str) {
        if let Some(tx) = self.events_tx.lock().as_ref() {
            let _ = tx.send(Ok(ContainerEvent::new(actor_id, name, "")));
        }
    }

    /// End the current event stream, as when the daemon restarts
    pub fn drop_event_stream(&self) {
        self.events_tx.lock().take();
    }

    pub fn emit_stat(&self, stat: ContainerStat) {
        if let Some(tx) = self.stats_tx.lock().get(&stat.id) {
            let _ = tx.send(Ok(stat));
        }
    }

    /// Fail the stats stream for `id` and close it
    pub fn fail_stats(&self, id: &str) {
        if let Some(tx) = self.stats_tx.lock().remove(id) {
            let _ = tx.send(Err(Error::Stream("stats endpoint reset".to_string())));
        }
    }

    pub fn has_stats_stream(&self, id: &str) -> bool {
        self.stats_tx
            .lock()
            .get(id)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    fn log_reader(&self, id: &str) -> Result<LogReader> {
        if !self.containers.lock().contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        let bytes = self.logs.lock().get(id).cloned().unwrap_or_default();
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }
}

#[async_trait]
impl RuntimeClient for FakeRuntime {
    fn host(&self) -> Host {
        self.host.clone()
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::Runtime("daemon unreachable".to_string()));
        }
        Ok(self.containers.lock().values().cloned().collect())
    }

    async fn find_container(&self, id: &str) -> Result<Container> {
        self.containers
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn container_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        _std_types: StdType,
    ) -> Result<LogReader> {
        self.follow_requests.lock().push(since);
        self.log_reader(id)
    }

    async fn container_logs_between(
        &self,
        id: &str,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
        _std_types: StdType,
    ) -> Result<LogReader> {
        self.log_reader(id)
    }

    async fn events(&self) -> Result<EventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock() = Some(tx);
        self.event_subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn container_stats(&self, id: &str) -> Result<StatStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.stats_tx.lock().insert(id.to_string(), tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn container_action(&self, action: ContainerAction, id: &str) -> Result<()> {
        if !self.containers.lock().contains_key(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(Error::Runtime(format!("cannot {} container", action)));
        }
        self.actions.lock().push((action, id.to_string()));
        Ok(())
    }
}
