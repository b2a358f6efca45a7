//! Host reached through a remote agent

use super::{HostService, RawStream};
use crate::agent::client::AgentClient;
use crate::error::Result;
use crate::logs::LogSession;
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Upstream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// A host whose containers live behind an agent connection
///
/// `id` is the key the host is registered under; it replaces whatever id
/// the agent reports so that containers route back to this entry.
#[derive(Clone)]
pub struct RemoteHost {
    id: String,
    client: Arc<AgentClient>,
}

impl RemoteHost {
    pub fn new(id: impl Into<String>, client: Arc<AgentClient>) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &Arc<AgentClient> {
        &self.client
    }

    fn tag(&self, mut container: Container) -> Container {
        container.host = self.id.clone();
        container
    }
}

#[async_trait]
impl HostService for RemoteHost {
    async fn host(&self) -> Result<Host> {
        let mut host = self.client.host_info().await?;
        host.id = self.id.clone();
        host.endpoint = Some(self.client.endpoint().to_string());
        host.available = true;
        Ok(host)
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let containers = self.client.list_containers().await?;
        Ok(containers.into_iter().map(|c| self.tag(c)).collect())
    }

    async fn find_container(&self, id: &str) -> Result<Container> {
        let container = self.client.find_container(id).await?;
        Ok(self.tag(container))
    }

    async fn stream_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogSession> {
        self.client.stream_logs(id, since, std_types).await
    }

    async fn logs_between_dates(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogSession> {
        self.client
            .logs_between_dates(id, since, until, std_types)
            .await
    }

    async fn raw_logs(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<RawStream> {
        self.client
            .stream_raw_bytes(id, since, until, std_types)
            .await
    }

    async fn subscribe_events(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerEvent>,
    ) -> Result<()> {
        let host_id = self.id.clone();
        resubscribing(self.client.clone(), cancel, tx, move |client| {
            let host_id = host_id.clone();
            async move {
                let stream = client.stream_events().await?;
                let tagged = stream.map(move |event| {
                    event.map(|mut e| {
                        e.host = host_id.clone();
                        e
                    })
                });
                Ok(Box::pin(tagged) as Upstream<ContainerEvent>)
            }
        })
        .await
    }

    async fn subscribe_stats(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerStat>,
    ) -> Result<()> {
        resubscribing(self.client.clone(), cancel, tx, |client| async move {
            client.stream_stats().await
        })
        .await
    }

    async fn subscribe_new_containers(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<Container>,
    ) -> Result<()> {
        let host_id = self.id.clone();
        resubscribing(self.client.clone(), cancel, tx, move |client| {
            let host_id = host_id.clone();
            async move {
                let stream = client.stream_container_started().await?;
                let tagged = stream.map(move |container| {
                    container.map(|mut c| {
                        c.host = host_id.clone();
                        c
                    })
                });
                Ok(Box::pin(tagged) as Upstream<Container>)
            }
        })
        .await
    }

    async fn container_action(&self, id: &str, action: ContainerAction) -> Result<()> {
        self.client.container_action(id, action).await
    }
}

/// Open a subscription stream and keep it open across agent restarts
///
/// The first attempt's error goes to the caller. Later failures are
/// retried with the client's backoff until `cancel` fires or the
/// receiver is dropped.
async fn resubscribing<T, F, Fut>(
    client: Arc<AgentClient>,
    cancel: CancellationToken,
    tx: mpsc::Sender<T>,
    open: F,
) -> Result<()>
where
    T: Send + 'static,
    F: Fn(Arc<AgentClient>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Upstream<T>>> + Send,
{
    let mut stream = open(client.clone()).await?;

    tokio::spawn(async move {
        loop {
            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tx.closed() => return,
                    item = stream.next() => item,
                };
                match item {
                    Some(Ok(item)) => {
                        if tx.send(item).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(endpoint = %client.endpoint(), error = %e, "Agent subscription failed");
                        break;
                    }
                    None => {
                        debug!(endpoint = %client.endpoint(), "Agent subscription ended");
                        break;
                    }
                }
            }

            stream = loop {
                let delay = client.reconnect_backoff().await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tx.closed() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                match open(client.clone()).await {
                    Ok(stream) => break stream,
                    Err(e) => {
                        debug!(endpoint = %client.endpoint(), error = %e, "Resubscribe failed");
                    }
                }
            };
        }
    });

    Ok(())
}
