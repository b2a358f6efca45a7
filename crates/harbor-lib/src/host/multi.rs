//! Fan-out over every configured host
//!
//! An unreachable host never fails the aggregate view: its last known
//! containers are served and the host is flagged unavailable until a call
//! to it succeeds again.

use super::{HostService, RawStream};
use crate::error::{Error, Result};
use crate::logs::LogSession;
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use crate::observability::{AgentMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct HostEntry {
    service: Arc<dyn HostService>,
    info: RwLock<Host>,
    last_containers: RwLock<Vec<Container>>,
}

pub struct MultiHostService {
    hosts: DashMap<String, Arc<HostEntry>>,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl Default for MultiHostService {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiHostService {
    pub fn new() -> Self {
        Self {
            hosts: DashMap::new(),
            metrics: AgentMetrics::new(),
            logger: StructuredLogger::new("harbor"),
        }
    }

    /// Register a host under `id`, probing it once for metadata
    ///
    /// A host that cannot be reached is still registered, as unavailable.
    pub async fn add_host(&self, id: impl Into<String>, service: Arc<dyn HostService>) -> Host {
        let id = id.into();
        let info = match service.host().await {
            Ok(mut host) => {
                host.id = id.clone();
                host.available = true;
                host
            }
            Err(e) if !is_offline(&e) => {
                debug!(host = %id, error = %e, "Host metadata unavailable");
                Host::new(id.clone(), id.clone())
            }
            Err(e) => {
                self.logger
                    .log_host_status(&id, false, Some(&e.to_string()));
                let mut host = Host::new(id.clone(), id.clone());
                host.available = false;
                host
            }
        };

        let entry = Arc::new(HostEntry {
            service,
            info: RwLock::new(info.clone()),
            last_containers: RwLock::new(Vec::new()),
        });
        self.hosts.insert(id, entry);
        self.update_unavailable_gauge();
        info
    }

    pub fn remove_host(&self, id: &str) -> bool {
        let removed = self.hosts.remove(id).is_some();
        self.update_unavailable_gauge();
        removed
    }

    /// Known hosts sorted by id, with their last observed availability
    pub fn hosts(&self) -> Vec<Host> {
        let mut hosts: Vec<Host> = self
            .hosts
            .iter()
            .map(|entry| entry.value().info.read().clone())
            .collect();
        hosts.sort_by(|a, b| a.id.cmp(&b.id));
        hosts
    }

    /// Re-probe every host and return the refreshed list
    pub async fn refresh_hosts(&self) -> Vec<Host> {
        let mut probes = JoinSet::new();
        for (id, entry) in self.entries() {
            probes.spawn(async move {
                let result = entry.service.host().await;
                (id, entry, result)
            });
        }

        while let Some(joined) = probes.join_next().await {
            let Ok((id, entry, result)) = joined else {
                continue;
            };
            if let Ok(mut host) = self.observe(&id, &entry, result) {
                host.id = id.clone();
                host.available = entry.info.read().available;
                *entry.info.write() = host;
            }
        }
        self.hosts()
    }

    /// Containers across all hosts, sorted by host then creation time
    pub async fn list_all_containers(&self) -> Vec<Container> {
        let mut listings = JoinSet::new();
        for (id, entry) in self.entries() {
            listings.spawn(async move {
                let result = entry.service.list_containers().await;
                (id, entry, result)
            });
        }

        let mut all = Vec::new();
        while let Some(joined) = listings.join_next().await {
            let Ok((id, entry, result)) = joined else {
                continue;
            };
            match self.observe(&id, &entry, result) {
                Ok(containers) => {
                    *entry.last_containers.write() = containers.clone();
                    all.extend(containers);
                }
                Err(_) => all.extend(entry.last_containers.read().iter().cloned()),
            }
        }

        all.sort_by(|a, b| {
            a.host
                .cmp(&b.host)
                .then(a.created.cmp(&b.created))
                .then(a.id.cmp(&b.id))
        });
        all
    }

    pub async fn find_container(&self, host: &str, id: &str) -> Result<Container> {
        let entry = self.entry(host)?;
        let result = entry.service.find_container(id).await;
        self.observe(host, &entry, result)
    }

    pub async fn stream_logs(
        &self,
        host: &str,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let entry = self.entry(host)?;
        let result = entry.service.stream_logs(id, since, std_types).await;
        self.observe(host, &entry, result)
    }

    pub async fn logs_between_dates(
        &self,
        host: &str,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let entry = self.entry(host)?;
        let result = entry
            .service
            .logs_between_dates(id, since, until, std_types)
            .await;
        self.observe(host, &entry, result)
    }

    pub async fn raw_logs(
        &self,
        host: &str,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<RawStream> {
        let entry = self.entry(host)?;
        let result = entry.service.raw_logs(id, since, until, std_types).await;
        self.observe(host, &entry, result)
    }

    pub async fn container_action(
        &self,
        host: &str,
        id: &str,
        action: ContainerAction,
    ) -> Result<()> {
        let entry = self.entry(host)?;
        let result = entry.service.container_action(id, action).await;
        self.observe(host, &entry, result)
    }

    /// Subscribe to lifecycle events on every host; returns how many hosts
    /// accepted the subscription
    pub async fn subscribe_events(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerEvent>,
    ) -> usize {
        let mut subscribed = 0;
        for (id, entry) in self.entries() {
            let result = entry
                .service
                .subscribe_events(cancel.clone(), tx.clone())
                .await;
            if self.observe(&id, &entry, result).is_ok() {
                subscribed += 1;
            }
        }
        subscribed
    }

    pub async fn subscribe_stats(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerStat>,
    ) -> usize {
        let mut subscribed = 0;
        for (id, entry) in self.entries() {
            let result = entry
                .service
                .subscribe_stats(cancel.clone(), tx.clone())
                .await;
            if self.observe(&id, &entry, result).is_ok() {
                subscribed += 1;
            }
        }
        subscribed
    }

    pub async fn subscribe_new_containers(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<Container>,
    ) -> usize {
        let mut subscribed = 0;
        for (id, entry) in self.entries() {
            let result = entry
                .service
                .subscribe_new_containers(cancel.clone(), tx.clone())
                .await;
            if self.observe(&id, &entry, result).is_ok() {
                subscribed += 1;
            }
        }
        subscribed
    }

    // Snapshot so no map guard is held across an await
    fn entries(&self) -> Vec<(String, Arc<HostEntry>)> {
        self.hosts
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    fn entry(&self, host: &str) -> Result<Arc<HostEntry>> {
        self.hosts
            .get(host)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown host: {}", host)))
    }

    /// Only a lost connection takes a host offline; any other error means
    /// the host answered
    fn observe<T>(&self, id: &str, entry: &HostEntry, result: Result<T>) -> Result<T> {
        match &result {
            Err(e) if is_offline(e) => {
                warn!(host = %id, error = %e, "Host unreachable");
                self.mark(id, entry, Err(e));
            }
            Err(e) => {
                debug!(host = %id, error = %e, "Host call failed");
                self.mark(id, entry, Ok(()));
            }
            Ok(_) => self.mark(id, entry, Ok(())),
        }
        result
    }

    fn mark(&self, id: &str, entry: &HostEntry, outcome: std::result::Result<(), &Error>) {
        let available = outcome.is_ok();
        let changed = {
            let mut info = entry.info.write();
            let changed = info.available != available;
            info.available = available;
            changed
        };
        if changed {
            let detail = outcome.err().map(|e| e.to_string());
            self.logger.log_host_status(id, available, detail.as_deref());
            self.update_unavailable_gauge();
        }
    }

    fn update_unavailable_gauge(&self) {
        let unavailable = self
            .hosts
            .iter()
            .filter(|entry| !entry.value().info.read().available)
            .count();
        self.metrics.set_hosts_unavailable(unavailable);
    }
}

fn is_offline(err: &Error) -> bool {
    matches!(err, Error::Unavailable(_) | Error::Tls(_))
}
