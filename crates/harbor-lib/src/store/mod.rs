//! Live view of one host's containers
//!
//! The store is seeded from a full listing, then kept current by a single
//! ingestion task that applies runtime lifecycle events in order. Readers
//! get snapshots or live handles; subscribers get non-blocking
//! notifications.

mod subscribers;


use crate::error::{Error, Result};
use crate::health::{components, HealthRegistry};
use crate::models::{Container, ContainerEvent, ContainerStat, ContainerState};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::ring_buffer::DEFAULT_STATS_HISTORY;
use crate::runtime::RuntimeClient;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use subscribers::Subscribers;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long a destroyed container stays visible as `removing`
pub const DEFAULT_REMOVAL_GRACE: Duration = Duration::from_secs(5);

/// Default channel size suggested to subscribers
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Shared, in-place mutable container entry
pub type ContainerHandle = Arc<RwLock<Container>>;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub stats_history: usize,
    pub removal_grace: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stats_history: DEFAULT_STATS_HISTORY,
            removal_grace: DEFAULT_REMOVAL_GRACE,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// A running stats collector; `generation` tells a finished task whether
/// its entry was already replaced
struct StatsTask {
    generation: u64,
    token: CancellationToken,
}

/// Builder for [`ContainerStore`]
pub struct StoreBuilder {
    client: Arc<dyn RuntimeClient>,
    config: StoreConfig,
    health: Option<HealthRegistry>,
    metrics: Option<AgentMetrics>,
}

impl StoreBuilder {
    pub fn stats_history(mut self, capacity: usize) -> Self {
        self.config.stats_history = capacity;
        self
    }

    pub fn removal_grace(mut self, grace: Duration) -> Self {
        self.config.removal_grace = grace;
        self
    }

    pub fn reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max.max(initial);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Seed the store and start event ingestion
    ///
    /// Fails when the initial listing fails; the store never serves an
    /// unseeded view.
    pub async fn build(self) -> Result<Arc<ContainerStore>> {
        let host = self.client.host();
        let health = self.health.unwrap_or_default();
        let metrics = self.metrics.unwrap_or_default();
        health.register(components::STORE);

        let (removal_tx, removal_rx) = mpsc::unbounded_channel();
        let store = Arc::new(ContainerStore {
            host_id: host.id.clone(),
            client: self.client,
            config: self.config,
            containers: DashMap::new(),
            event_subscribers: Subscribers::new("events", metrics.clone()),
            stat_subscribers: Subscribers::new("stats", metrics.clone()),
            started_subscribers: Subscribers::new("started", metrics.clone()),
            stats_tasks: Arc::new(DashMap::new()),
            stats_generation: AtomicU64::new(0),
            removals: removal_tx,
            connected: AtomicBool::new(false),
            logger: StructuredLogger::new(host.id),
            health,
            metrics,
            shutdown: CancellationToken::new(),
        });

        let containers = match store.client.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                store
                    .health
                    .set_unhealthy(components::STORE, format!("initial listing failed: {}", e));
                return Err(Error::Uninitialized(e.to_string()));
            }
        };
        for container in containers {
            store.insert(container);
        }
        store.metrics.set_containers_tracked(store.containers.len());
        info!(
            host = %store.host_id,
            containers = store.containers.len(),
            "Container store seeded"
        );

        tokio::spawn(Arc::clone(&store).run_ingestion(removal_rx));
        Ok(store)
    }
}

/// Concurrent container registry for one runtime host
pub struct ContainerStore {
    host_id: String,
    client: Arc<dyn RuntimeClient>,
    config: StoreConfig,
    containers: DashMap<String, ContainerHandle>,
    event_subscribers: Subscribers<ContainerEvent>,
    stat_subscribers: Subscribers<ContainerStat>,
    started_subscribers: Subscribers<Container>,
    stats_tasks: Arc<DashMap<String, StatsTask>>,
    stats_generation: AtomicU64,
    removals: mpsc::UnboundedSender<String>,
    connected: AtomicBool,
    logger: StructuredLogger,
    health: HealthRegistry,
    metrics: AgentMetrics,
    shutdown: CancellationToken,
}

impl ContainerStore {
    pub fn builder(client: Arc<dyn RuntimeClient>) -> StoreBuilder {
        StoreBuilder {
            client,
            config: StoreConfig::default(),
            health: None,
            metrics: None,
        }
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn client(&self) -> &Arc<dyn RuntimeClient> {
        &self.client
    }

    /// True while the runtime event subscription is up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of all containers, oldest first
    pub fn list_containers(&self) -> Vec<Container> {
        let mut containers: Vec<Container> = self
            .containers
            .iter()
            .map(|entry| entry.value().read().clone())
            .collect();
        containers.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        containers
    }

    pub fn find_container(&self, id: &str) -> Result<Container> {
        self.containers
            .get(id)
            .map(|entry| entry.value().read().clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// The live entry for `id`; state changes show up through it in place
    pub fn container_handle(&self, id: &str) -> Option<ContainerHandle> {
        self.containers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Receive every lifecycle event until `cancel` fires
    pub fn subscribe_events(&self, cancel: CancellationToken, tx: mpsc::Sender<ContainerEvent>) {
        self.event_subscribers.add(cancel, tx);
    }

    /// Receive every stat sample until `cancel` fires
    pub fn subscribe_stats(&self, cancel: CancellationToken, tx: mpsc::Sender<ContainerStat>) {
        self.stat_subscribers.add(cancel, tx);
    }

    /// Receive containers as they start until `cancel` fires
    pub fn subscribe_new_containers(&self, cancel: CancellationToken, tx: mpsc::Sender<Container>) {
        self.started_subscribers.add(cancel, tx);
    }

    /// Stop ingestion, stats collection and all subscriptions
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.event_subscribers.clear();
        self.stat_subscribers.clear();
        self.started_subscribers.clear();
        self.stats_tasks.clear();
        info!(host = %self.host_id, "Container store stopped");
    }

    fn insert(&self, mut container: Container) -> Container {
        container.host = self.host_id.clone();
        let container = container.with_stats_capacity(self.config.stats_history);
        let running = container.state.is_running();
        let snapshot = container.clone();
        self.containers
            .insert(container.id.clone(), Arc::new(RwLock::new(container)));
        if running {
            self.start_stats(&snapshot);
        }
        snapshot
    }

    /// Insert or refresh from a runtime lookup, keeping stat history
    fn upsert(&self, mut fresh: Container) -> Container {
        fresh.host = self.host_id.clone();
        let existing = self.containers.get(&fresh.id).map(|e| Arc::clone(e.value()));
        match existing {
            Some(handle) => {
                let mut container = handle.write();
                container.refresh_from(&fresh);
                container.clone()
            }
            None => self.insert(fresh),
        }
    }

    fn update_state(&self, id: &str, state: ContainerState) {
        if let Some(entry) = self.containers.get(id) {
            entry.value().write().state = state;
        }
    }

    async fn run_ingestion(self: Arc<Self>, mut removals: mpsc::UnboundedReceiver<String>) {
        let mut backoff = self.config.initial_backoff;
        let mut reconnecting = false;

        loop {
            match self.client.events().await {
                Ok(mut stream) => {
                    if reconnecting {
                        self.metrics.inc_event_stream_reconnects();
                        self.resync().await;
                    }
                    self.set_connected(true, "");
                    backoff = self.config.initial_backoff;

                    let reason = loop {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => return,
                            Some(id) = removals.recv() => self.remove(&id),
                            item = stream.next() => match item {
                                Some(Ok(event)) => self.apply_event(event).await,
                                Some(Err(e)) => break e.to_string(),
                                None => break "event stream ended".to_string(),
                            },
                        }
                    };
                    self.set_connected(false, &reason);
                }
                Err(e) => {
                    warn!(host = %self.host_id, error = %e, "Failed to subscribe to runtime events");
                    self.set_connected(false, &e.to_string());
                }
            }
            reconnecting = true;

            let sleep = tokio::time::sleep(backoff);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return,
                    _ = &mut sleep => break,
                    Some(id) = removals.recv() => self.remove(&id),
                }
            }
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }

    fn set_connected(&self, connected: bool, reason: &str) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if connected {
            self.health.set_healthy(components::EVENT_STREAM);
        } else {
            self.health
                .set_degraded(components::EVENT_STREAM, format!("reconnecting: {}", reason));
        }
        if was != connected {
            self.logger.log_event_stream(connected, reason);
        }
    }

    /// Merge a fresh listing after a reconnect; nothing is evicted
    async fn resync(&self) {
        match self.client.list_containers().await {
            Ok(containers) => {
                let count = containers.len();
                for container in containers {
                    let merged = self.upsert(container);
                    if merged.state.is_running() {
                        self.start_stats(&merged);
                    } else {
                        self.stop_stats(&merged.id);
                    }
                }
                self.metrics.set_containers_tracked(self.containers.len());
                debug!(host = %self.host_id, listed = count, "Store resynchronized");
            }
            Err(e) => warn!(host = %self.host_id, error = %e, "Resync listing failed"),
        }
    }

    async fn apply_event(&self, event: ContainerEvent) {
        let event = ContainerEvent {
            host: self.host_id.clone(),
            ..event
        };
        let id = event.actor_id.as_str();
        self.metrics.inc_runtime_events(event_kind(&event.name));
        debug!(host = %self.host_id, container_id = %id, event = %event.name, "Runtime event");

        match event.name.as_str() {
            "create" | "rename" => {
                self.lookup(id).await;
            }
            "start" => {
                if let Some(container) = self.lookup(id).await {
                    self.start_stats(&container);
                    self.started_subscribers.publish(&container);
                }
            }
            "die" => {
                self.update_state(id, ContainerState::Exited);
                self.stop_stats(id);
            }
            "pause" => self.update_state(id, ContainerState::Paused),
            "unpause" | "restart" => self.update_state(id, ContainerState::Running),
            "destroy" => {
                self.update_state(id, ContainerState::Removing);
                self.stop_stats(id);
                self.schedule_removal(id);
            }
            name if name.starts_with("health_status") => {
                let status = name
                    .split_once(':')
                    .map(|(_, status)| status.trim().to_string())
                    .filter(|s| !s.is_empty());
                if let Some(entry) = self.containers.get(id) {
                    entry.value().write().health = status;
                }
            }
            _ => {}
        }

        self.metrics.set_containers_tracked(self.containers.len());
        self.event_subscribers.publish(&event);
    }

    async fn lookup(&self, id: &str) -> Option<Container> {
        match self.client.find_container(id).await {
            Ok(container) => Some(self.upsert(container)),
            Err(e) => {
                warn!(host = %self.host_id, container_id = %id, error = %e, "Container lookup failed");
                None
            }
        }
    }

    fn schedule_removal(&self, id: &str) {
        let tx = self.removals.clone();
        let id = id.to_string();
        let grace = self.config.removal_grace;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    let _ = tx.send(id);
                }
            }
        });
    }

    fn remove(&self, id: &str) {
        // a container recreated under the same id during the grace period stays
        let removable = self
            .containers
            .get(id)
            .map(|e| e.value().read().state == ContainerState::Removing)
            .unwrap_or(false);
        if removable {
            self.containers.remove(id);
            self.metrics.set_containers_tracked(self.containers.len());
            debug!(host = %self.host_id, container_id = %id, "Container removed");
        }
    }

    fn start_stats(&self, container: &Container) {
        if self.shutdown.is_cancelled() || self.stats_tasks.contains_key(&container.id) {
            return;
        }
        let token = self.shutdown.child_token();
        let generation = self.stats_generation.fetch_add(1, Ordering::SeqCst);
        self.stats_tasks.insert(
            container.id.clone(),
            StatsTask {
                generation,
                token: token.clone(),
            },
        );

        let tasks = Arc::clone(&self.stats_tasks);
        let client = Arc::clone(&self.client);
        let history = Arc::clone(&container.stats);
        let subscribers = self.stat_subscribers.clone();
        let id = container.id.clone();
        tokio::spawn(async move {
            let mut stream = match client.container_stats(&id).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(container_id = %id, error = %e, "Stats stream unavailable");
                    tasks.remove_if(&id, |_, task| task.generation == generation);
                    return;
                }
            };
            loop {
                let item = tokio::select! {
                    _ = token.cancelled() => break,
                    item = stream.next() => item,
                };
                match item {
                    Some(Ok(stat)) => {
                        history.push(stat.clone());
                        subscribers.publish(&stat);
                    }
                    Some(Err(e)) => {
                        debug!(container_id = %id, error = %e, "Stats stream failed");
                        break;
                    }
                    None => break,
                }
            }
            // lets a later start_stats reopen the stream
            tasks.remove_if(&id, |_, task| task.generation == generation);
        });
    }

    fn stop_stats(&self, id: &str) {
        if let Some((_, task)) = self.stats_tasks.remove(id) {
            task.token.cancel();
        }
    }
}

/// Bounded label set for the events metric
fn event_kind(name: &str) -> &'static str {
    match name {
        "create" => "create",
        "start" => "start",
        "die" => "die",
        "pause" => "pause",
        "unpause" => "unpause",
        "restart" => "restart",
        "rename" => "rename",
        "destroy" => "destroy",
        n if n.starts_with("health_status") => "health_status",
        _ => "other",
    }
}
