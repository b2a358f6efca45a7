//! Host backed by the local runtime and its container store

use super::{HostService, RawStream};
use crate::error::{Error, Result};
use crate::logs::{EventGenerator, LogSession};
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use crate::store::ContainerStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Raw log reads are chunked at this size
pub const RAW_CHUNK_SIZE: usize = 1024;

#[derive(Clone)]
pub struct LocalHost {
    store: Arc<ContainerStore>,
    version: String,
}

impl LocalHost {
    pub fn new(store: Arc<ContainerStore>, version: impl Into<String>) -> Self {
        Self {
            store,
            version: version.into(),
        }
    }

    pub fn store(&self) -> &Arc<ContainerStore> {
        &self.store
    }
}

#[async_trait]
impl HostService for LocalHost {
    async fn host(&self) -> Result<Host> {
        let mut host = self.store.client().host();
        host.agent_version = self.version.clone();
        host.available = self.store.is_connected();
        Ok(host)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        Ok(self.store.list_containers())
    }

    async fn find_container(&self, id: &str) -> Result<Container> {
        self.store.find_container(id)
    }

    async fn stream_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let container = self.store.find_container(id)?;
        let reader = self
            .store
            .client()
            .container_logs(&container.id, since, std_types)
            .await?;
        Ok(EventGenerator::new(reader, &container, CancellationToken::new()).into_session())
    }

    async fn logs_between_dates(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let container = self.store.find_container(id)?;
        let reader = self
            .store
            .client()
            .container_logs_between(&container.id, since, until, std_types)
            .await?;
        Ok(EventGenerator::new(reader, &container, CancellationToken::new()).into_session())
    }

    async fn raw_logs(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<RawStream> {
        let container = self.store.find_container(id)?;
        let reader = self
            .store
            .client()
            .container_logs_between(&container.id, since, until, std_types)
            .await?;
        let chunks = ReaderStream::with_capacity(reader, RAW_CHUNK_SIZE);
        Ok(Box::pin(chunks.map(|chunk| chunk.map_err(Error::from))))
    }

    async fn subscribe_events(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerEvent>,
    ) -> Result<()> {
        self.store.subscribe_events(cancel, tx);
        Ok(())
    }

    async fn subscribe_stats(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerStat>,
    ) -> Result<()> {
        self.store.subscribe_stats(cancel, tx);
        Ok(())
    }

    async fn subscribe_new_containers(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<Container>,
    ) -> Result<()> {
        self.store.subscribe_new_containers(cancel, tx);
        Ok(())
    }

    async fn container_action(&self, id: &str, action: ContainerAction) -> Result<()> {
        let container = self.store.find_container(id)?;
        self.store
            .client()
            .container_action(action, &container.id)
            .await
    }
}
