//! Boundary to the container runtime
//!
//! The store, the agent server and the local host service only talk to the
//! runtime through [`RuntimeClient`]. The Docker implementation lives in the
//! agent binary; tests use an in-memory fake.

#[cfg(test)]
pub(crate) mod fake;

use crate::error::Result;
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_stream::Stream;

/// Raw log bytes as produced by the runtime (framed unless the container is TTY)
pub type LogReader = Pin<Box<dyn AsyncRead + Send>>;

/// Lifecycle events; the stream ending means the subscription dropped
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ContainerEvent>> + Send>>;

/// Resource samples for one container
pub type StatStream = Pin<Box<dyn Stream<Item = Result<ContainerStat>> + Send>>;

/// Operations the runtime must provide
///
/// Streams are cancelled by dropping them.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Host metadata, resolved when the client connected
    fn host(&self) -> Host;

    async fn list_containers(&self) -> Result<Vec<Container>>;

    /// Look up one container; `Error::NotFound` when it does not exist
    async fn find_container(&self, id: &str) -> Result<Container>;

    /// Follow logs from `since` until cancelled; `None` means from now,
    /// so only output written after the call is delivered
    async fn container_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogReader>;

    /// Bounded log read between two instants
    async fn container_logs_between(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogReader>;

    async fn events(&self) -> Result<EventStream>;

    async fn container_stats(&self, id: &str) -> Result<StatStream>;

    async fn container_action(&self, action: ContainerAction, id: &str) -> Result<()>;
}
