//! gRPC client for a remote Harbor agent
//!
//! The channel is created lazily and dropped on transport failures, so the
//! next call reconnects. Streaming calls never carry a request deadline;
//! unary calls use `request_timeout`.

use super::convert::to_timestamp;
use crate::error::{Error, Result};
use crate::host::{ContainerStream, RawStream};
use crate::logs::{LogEvent, LogSession, EVENT_BUFFER};
use crate::models::{Container, ContainerAction, ContainerEvent, ContainerStat, Host, StdType};
use crate::proto::{self, AgentServiceClient};
use crate::runtime::{EventStream, StatStream};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tonic::codec::Streaming;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};
use tonic::Status;
use tracing::{debug, info, warn};

/// Client certificate material for mutual TLS
#[derive(Debug, Clone)]
pub struct ClientTlsFiles {
    pub ca_cert_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Name to verify the agent certificate against; defaults to the endpoint host
    pub domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgentClientConfig {
    /// Agent URL, e.g. `https://node-2:7007`
    pub endpoint: String,
    /// `None` only for plaintext test setups
    pub tls: Option<ClientTlsFiles>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub keepalive_interval: Duration,
    pub keepalive_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:7007".to_string(),
            tls: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct ConnectionState {
    connected: bool,
    last_error: Option<String>,
    reconnect_attempts: u32,
    current_backoff: Duration,
}

/// Connection to one remote agent
pub struct AgentClient {
    config: AgentClientConfig,
    channel: Arc<RwLock<Option<Channel>>>,
    state: Arc<RwLock<ConnectionState>>,
}

impl AgentClient {
    pub fn new(config: AgentClientConfig) -> Self {
        let state = ConnectionState {
            connected: false,
            last_error: None,
            reconnect_attempts: 0,
            current_backoff: config.initial_backoff,
        };
        Self {
            config,
            channel: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn builder() -> AgentClientBuilder {
        AgentClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    /// Delay before the next reconnect attempt
    pub async fn reconnect_backoff(&self) -> Duration {
        self.state.read().await.current_backoff
    }

    /// (connected, reconnect attempts, last error)
    pub async fn connection_stats(&self) -> (bool, u32, Option<String>) {
        let state = self.state.read().await;
        (state.connected, state.reconnect_attempts, state.last_error.clone())
    }

    async fn load_tls_config(&self, files: &ClientTlsFiles) -> Result<ClientTlsConfig> {
        let read = |path: PathBuf| async move {
            tokio::fs::read(&path)
                .await
                .map_err(|e| Error::Tls(format!("failed to read {}: {}", path.display(), e)))
        };
        let ca = read(files.ca_cert_path.clone()).await?;
        let cert = read(files.cert_path.clone()).await?;
        let key = read(files.key_path.clone()).await?;

        let domain = match &files.domain {
            Some(domain) => domain.clone(),
            None => self.extract_domain()?,
        };
        Ok(ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(ca))
            .identity(Identity::from_pem(cert, key))
            .domain_name(domain))
    }

    fn extract_domain(&self) -> Result<String> {
        let url = url::Url::parse(&self.config.endpoint).map_err(|e| {
            Error::InvalidArgument(format!("invalid endpoint {}: {}", self.config.endpoint, e))
        })?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidArgument(format!("no host in {}", self.config.endpoint)))
    }

    async fn create_channel(&self) -> Result<Channel> {
        let mut endpoint = Channel::from_shared(self.config.endpoint.clone())
            .map_err(|e| Error::InvalidArgument(format!("invalid endpoint: {}", e)))?;
        if let Some(files) = &self.config.tls {
            let tls = self.load_tls_config(files).await?;
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| Error::Tls(e.to_string()))?;
        }

        let channel = endpoint
            .connect_timeout(self.config.connect_timeout)
            .http2_keep_alive_interval(self.config.keepalive_interval)
            .keep_alive_timeout(self.config.keepalive_timeout)
            .keep_alive_while_idle(true)
            .connect()
            .await?;
        Ok(channel)
    }

    async fn get_channel(&self) -> Result<Channel> {
        if let Some(channel) = self.channel.read().await.as_ref() {
            return Ok(channel.clone());
        }

        let channel = self.create_channel().await?;
        *self.channel.write().await = Some(channel.clone());

        let mut state = self.state.write().await;
        state.connected = true;
        state.reconnect_attempts = 0;
        state.current_backoff = self.config.initial_backoff;
        state.last_error = None;
        info!(endpoint = %self.config.endpoint, "Connected to agent");

        Ok(channel)
    }

    async fn handle_connection_failure(&self, error: &str) {
        let mut state = self.state.write().await;
        state.connected = false;
        state.last_error = Some(error.to_string());
        state.reconnect_attempts += 1;
        state.current_backoff = std::cmp::min(state.current_backoff * 2, self.config.max_backoff);

        *self.channel.write().await = None;

        warn!(
            endpoint = %self.config.endpoint,
            error = %error,
            attempts = state.reconnect_attempts,
            next_backoff_ms = state.current_backoff.as_millis() as u64,
            "Connection to agent failed"
        );
    }

    /// Run one RPC, resetting the channel when the transport failed
    async fn call<T, F, Fut>(&self, rpc: F) -> Result<T>
    where
        F: FnOnce(AgentServiceClient<Channel>) -> Fut,
        Fut: Future<Output = std::result::Result<T, Status>>,
    {
        let channel = match self.get_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                self.handle_connection_failure(&e.to_string()).await;
                return Err(e);
            }
        };

        match rpc(AgentServiceClient::new(channel)).await {
            Ok(value) => Ok(value),
            Err(status) => {
                if matches!(
                    status.code(),
                    tonic::Code::Unavailable | tonic::Code::Unknown
                ) {
                    self.handle_connection_failure(status.message()).await;
                }
                Err(Error::from(status))
            }
        }
    }

    fn unary<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        request.set_timeout(self.config.request_timeout);
        request
    }

    pub async fn host_info(&self) -> Result<Host> {
        let request = self.unary(proto::HostInfoRequest {});
        let response = self
            .call(|mut client| async move { client.host_info(request).await })
            .await?
            .into_inner();
        response
            .host
            .map(Host::from)
            .ok_or_else(|| Error::Stream("agent returned no host info".to_string()))
    }

    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let request = self.unary(proto::ListContainersRequest {});
        let response = self
            .call(|mut client| async move { client.list_containers(request).await })
            .await?
            .into_inner();
        Ok(response.containers.into_iter().map(Container::from).collect())
    }

    pub async fn find_container(&self, id: &str) -> Result<Container> {
        let request = self.unary(proto::FindContainerRequest {
            container_id: id.to_string(),
        });
        let response = self
            .call(|mut client| async move { client.find_container(request).await })
            .await?
            .into_inner();
        response
            .container
            .map(Container::from)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn container_action(&self, id: &str, action: ContainerAction) -> Result<()> {
        let request = self.unary(proto::ContainerActionRequest {
            container_id: id.to_string(),
            action: proto::ContainerAction::from(action) as i32,
        });
        self.call(|mut client| async move { client.container_action(request).await })
            .await?;
        Ok(())
    }

    pub async fn stream_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let request = proto::StreamLogsRequest {
            container_id: id.to_string(),
            since: since.map(to_timestamp),
            stream_types: std_types.bits(),
        };
        let stream = self
            .call(|mut client| async move { client.stream_logs(request).await })
            .await?
            .into_inner();
        Ok(log_session(stream))
    }

    pub async fn logs_between_dates(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogSession> {
        let request = proto::LogsBetweenDatesRequest {
            container_id: id.to_string(),
            since: Some(to_timestamp(since)),
            until: Some(to_timestamp(until)),
            stream_types: std_types.bits(),
        };
        let stream = self
            .call(|mut client| async move { client.logs_between_dates(request).await })
            .await?
            .into_inner();
        Ok(log_session(stream))
    }

    pub async fn stream_raw_bytes(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<RawStream> {
        let request = proto::StreamRawBytesRequest {
            container_id: id.to_string(),
            since: Some(to_timestamp(since)),
            until: Some(to_timestamp(until)),
            stream_types: std_types.bits(),
        };
        let stream = self
            .call(|mut client| async move { client.stream_raw_bytes(request).await })
            .await?
            .into_inner();
        Ok(Box::pin(stream.map(|item| {
            item.map(|resp| Bytes::from(resp.data))
                .map_err(Error::from)
        })))
    }

    pub async fn stream_events(&self) -> Result<EventStream> {
        let stream = self
            .call(|mut client| async move {
                client.stream_events(proto::StreamEventsRequest {}).await
            })
            .await?
            .into_inner();
        Ok(Box::pin(stream.filter_map(|item| match item {
            Ok(resp) => resp.event.map(|e| Ok(ContainerEvent::from(e))),
            Err(status) => Some(Err(Error::from(status))),
        })))
    }

    pub async fn stream_stats(&self) -> Result<StatStream> {
        let stream = self
            .call(|mut client| async move {
                client.stream_stats(proto::StreamStatsRequest {}).await
            })
            .await?
            .into_inner();
        Ok(Box::pin(stream.filter_map(|item| match item {
            Ok(resp) => resp.stat.map(|s| Ok(ContainerStat::from(s))),
            Err(status) => Some(Err(Error::from(status))),
        })))
    }

    pub async fn stream_container_started(&self) -> Result<ContainerStream> {
        let stream = self
            .call(|mut client| async move {
                client
                    .stream_container_started(proto::StreamContainerStartedRequest {})
                    .await
            })
            .await?
            .into_inner();
        Ok(Box::pin(stream.filter_map(|item| match item {
            Ok(resp) => resp.container.map(|c| Ok(Container::from(c))),
            Err(status) => Some(Err(Error::from(status))),
        })))
    }
}

/// Adapt a remote log stream to the same session shape local logs use
fn log_session(mut stream: Streaming<proto::StreamLogsResponse>) -> LogSession {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let (error_tx, error_rx) = oneshot::channel();
    let token = cancel.clone();

    tokio::spawn(async move {
        let failure = loop {
            let message = tokio::select! {
                _ = token.cancelled() => break None,
                message = stream.message() => message,
            };
            match message {
                Ok(Some(resp)) => {
                    let Some(event) = resp.event else { continue };
                    match LogEvent::try_from(event) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break None;
                            }
                        }
                        Err(e) => break Some(e),
                    }
                }
                Ok(None) => break None,
                Err(status) => break Some(Error::from(status)),
            }
        };
        if let Some(err) = failure {
            debug!(error = %err, "Remote log stream failed");
            let _ = error_tx.send(err);
        }
    });

    LogSession::new(rx, error_rx, cancel)
}

/// Builder for [`AgentClient`]
#[derive(Default)]
pub struct AgentClientBuilder {
    config: AgentClientConfig,
}

impl AgentClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn tls(mut self, files: ClientTlsFiles) -> Self {
        self.config.tls = Some(files);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max.max(initial);
        self
    }

    pub fn build(self) -> AgentClient {
        AgentClient::new(self.config)
    }
}
