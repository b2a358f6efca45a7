//! Uniform access to container hosts, local or behind a remote agent

pub mod local;
pub mod multi;
pub mod remote;

pub use local::LocalHost;
pub use multi::MultiHostService;
pub use remote::RemoteHost;

use crate::error::Result;
use crate::logs::LogSession;
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// Unparsed log bytes, in chunks
pub type RawStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Containers announced as they start
pub type ContainerStream = Pin<Box<dyn Stream<Item = Result<Container>> + Send>>;

/// Everything a caller can do with one host
///
/// Subscriptions deliver into the caller's channel until `cancel` fires or
/// the receiver is dropped.
#[async_trait]
pub trait HostService: Send + Sync {
    async fn host(&self) -> Result<Host>;

    async fn list_containers(&self) -> Result<Vec<Container>>;

    async fn find_container(&self, id: &str) -> Result<Container>;

    async fn stream_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogSession>;

    async fn logs_between_dates(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogSession>;

    async fn raw_logs(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<RawStream>;

    async fn subscribe_events(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerEvent>,
    ) -> Result<()>;

    async fn subscribe_stats(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<ContainerStat>,
    ) -> Result<()>;

    async fn subscribe_new_containers(
        &self,
        cancel: CancellationToken,
        tx: mpsc::Sender<Container>,
    ) -> Result<()>;

    async fn container_action(&self, id: &str, action: ContainerAction) -> Result<()>;
}
