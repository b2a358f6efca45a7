//! Server side of `harbor.v1.AgentService`
//!
//! Every streaming RPC runs a forwarding task that stops as soon as the
//! client goes away; dropping the upstream session or subscription token
//! then releases the runtime resources behind it.

use super::convert::{action_from_wire, from_timestamp};
use crate::error::{Error, Result};
use crate::health::{components, HealthRegistry};
use crate::host::{HostService, LocalHost, RawStream};
use crate::logs::{LogEvent, LogSession};
use crate::models::StdType;
use crate::observability::AgentMetrics;
use crate::proto::{self, AgentService, AgentServiceServer};
use crate::store::{ContainerStore, DEFAULT_SUBSCRIBER_BUFFER};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

/// Outbound buffer per streaming RPC
const STREAM_BUFFER: usize = 64;

type ResponseStream<T> = Pin<Box<dyn Stream<Item = std::result::Result<T, Status>> + Send>>;

/// Certificate material for the agent endpoint
#[derive(Debug, Clone)]
pub struct ServerTlsFiles {
    pub ca_cert_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Build a TLS config that requires clients to present a certificate
/// signed by the configured CA
pub async fn load_server_tls(files: &ServerTlsFiles) -> Result<ServerTlsConfig> {
    let read = |path: PathBuf| async move {
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Tls(format!("failed to read {}: {}", path.display(), e)))
    };
    let cert = read(files.cert_path.clone()).await?;
    let key = read(files.key_path.clone()).await?;
    let ca = read(files.ca_cert_path.clone()).await?;

    Ok(ServerTlsConfig::new()
        .identity(Identity::from_pem(cert, key))
        .client_ca_root(Certificate::from_pem(ca)))
}

/// Serves one host's store and logs to remote callers
#[derive(Clone)]
pub struct AgentServer {
    local: LocalHost,
    metrics: AgentMetrics,
}

impl AgentServer {
    pub fn new(store: Arc<ContainerStore>, version: impl Into<String>) -> Self {
        Self {
            local: LocalHost::new(store, version),
            metrics: AgentMetrics::new(),
        }
    }

    pub fn into_service(self) -> AgentServiceServer<Self> {
        AgentServiceServer::new(self)
    }

    /// Serve on `addr` with mutual TLS until `shutdown` resolves
    pub async fn serve<F>(
        self,
        addr: SocketAddr,
        tls: ServerTlsConfig,
        health: HealthRegistry,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!(addr = %addr, host = %self.local.store().host_id(), "Agent endpoint listening");
        health.register(components::AGENT_SERVER);

        let result = Server::builder()
            .tls_config(tls)
            .map_err(|e| Error::Tls(e.to_string()))?
            .add_service(self.into_service())
            .serve_with_shutdown(addr, shutdown)
            .await;

        if let Err(e) = &result {
            health.set_unhealthy(components::AGENT_SERVER, e.to_string());
        }
        result.map_err(|e| Error::Unavailable(e.to_string()))
    }

    fn record<T>(
        &self,
        method: &str,
        result: Result<T>,
    ) -> std::result::Result<Response<T>, Status> {
        match result {
            Ok(value) => Ok(Response::new(value)),
            Err(err) => {
                if !err.is_not_found() {
                    warn!(method, error = %err, "RPC failed");
                }
                self.metrics.inc_rpc_errors(method);
                Err(Status::from(err))
            }
        }
    }

    async fn stream_logs_inner(
        &self,
        req: proto::StreamLogsRequest,
    ) -> Result<ResponseStream<proto::StreamLogsResponse>> {
        let since = req.since.as_ref().and_then(from_timestamp);
        let session = self
            .local
            .stream_logs(&req.container_id, since, StdType::from_bits(req.stream_types))
            .await?;
        debug!(container_id = %req.container_id, "Log stream opened");
        Ok(forward_logs(session, None, self.metrics.clone()))
    }

    async fn logs_between_dates_inner(
        &self,
        req: proto::LogsBetweenDatesRequest,
    ) -> Result<ResponseStream<proto::StreamLogsResponse>> {
        let (since, until) = time_range(req.since.as_ref(), req.until.as_ref())?;
        let session = self
            .local
            .logs_between_dates(
                &req.container_id,
                since,
                until,
                StdType::from_bits(req.stream_types),
            )
            .await?;
        let window = (since.timestamp(), until.timestamp());
        Ok(forward_logs(session, Some(window), self.metrics.clone()))
    }

    async fn stream_raw_bytes_inner(
        &self,
        req: proto::StreamRawBytesRequest,
    ) -> Result<ResponseStream<proto::StreamRawBytesResponse>> {
        let (since, until) = time_range(req.since.as_ref(), req.until.as_ref())?;
        let chunks = self
            .local
            .raw_logs(
                &req.container_id,
                since,
                until,
                StdType::from_bits(req.stream_types),
            )
            .await?;
        Ok(forward_raw(chunks))
    }

    async fn container_action_inner(&self, req: proto::ContainerActionRequest) -> Result<()> {
        let action = action_from_wire(req.action)?;
        info!(container_id = %req.container_id, action = %action, "Container action requested");
        self.local.container_action(&req.container_id, action).await
    }
}

fn time_range(
    since: Option<&prost_types::Timestamp>,
    until: Option<&prost_types::Timestamp>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let since = since
        .and_then(from_timestamp)
        .ok_or_else(|| Error::InvalidArgument("since is required".to_string()))?;
    let until = until
        .and_then(from_timestamp)
        .ok_or_else(|| Error::InvalidArgument("until is required".to_string()))?;
    if until < since {
        return Err(Error::InvalidArgument("until is before since".to_string()));
    }
    Ok((since, until))
}

fn in_window(event: &LogEvent, window: Option<(i64, i64)>) -> bool {
    match window {
        Some((since, until)) => event.timestamp >= since && event.timestamp <= until,
        None => true,
    }
}

/// Pump a log session into a response stream
///
/// After the last event, a failure recorded by the session becomes the
/// stream's terminal status.
fn forward_logs(
    mut session: LogSession,
    window: Option<(i64, i64)>,
    metrics: AgentMetrics,
) -> ResponseStream<proto::StreamLogsResponse> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        metrics.log_stream_opened();
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                event = session.recv() => match event {
                    Some(event) => {
                        if !in_window(&event, window) {
                            continue;
                        }
                        let resp = proto::StreamLogsResponse {
                            event: Some(proto::LogEvent::from(&event)),
                        };
                        if tx.send(Ok(resp)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        if let Some(err) = session.take_error() {
                            let _ = tx.send(Err(Status::internal(err.to_string()))).await;
                        }
                        break;
                    }
                },
            }
        }
        metrics.log_stream_closed();
    });
    Box::pin(ReceiverStream::new(rx))
}

fn forward_raw(mut chunks: RawStream) -> ResponseStream<proto::StreamRawBytesResponse> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                chunk = chunks.next() => match chunk {
                    Some(Ok(bytes)) => {
                        let resp = proto::StreamRawBytesResponse { data: bytes.to_vec() };
                        if tx.send(Ok(resp)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(Status::internal(e.to_string()))).await;
                        break;
                    }
                    None => break,
                },
            }
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

/// Pump a store subscription into a response stream
fn forward_subscription<T, R>(
    mut rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
    map: fn(T) -> R,
) -> ResponseStream<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let (tx, out) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(async move {
        let _guard = cancel.drop_guard();
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                item = rx.recv() => match item {
                    Some(item) => {
                        if tx.send(Ok(map(item))).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });
    Box::pin(ReceiverStream::new(out))
}

#[async_trait]
impl AgentService for AgentServer {
    type StreamLogsStream = ResponseStream<proto::StreamLogsResponse>;
    type LogsBetweenDatesStream = ResponseStream<proto::StreamLogsResponse>;
    type StreamRawBytesStream = ResponseStream<proto::StreamRawBytesResponse>;
    type StreamEventsStream = ResponseStream<proto::StreamEventsResponse>;
    type StreamStatsStream = ResponseStream<proto::StreamStatsResponse>;
    type StreamContainerStartedStream = ResponseStream<proto::StreamContainerStartedResponse>;

    async fn stream_logs(
        &self,
        request: Request<proto::StreamLogsRequest>,
    ) -> std::result::Result<Response<Self::StreamLogsStream>, Status> {
        let result = self.stream_logs_inner(request.into_inner()).await;
        self.record("StreamLogs", result)
    }

    async fn logs_between_dates(
        &self,
        request: Request<proto::LogsBetweenDatesRequest>,
    ) -> std::result::Result<Response<Self::LogsBetweenDatesStream>, Status> {
        let result = self.logs_between_dates_inner(request.into_inner()).await;
        self.record("LogsBetweenDates", result)
    }

    async fn stream_raw_bytes(
        &self,
        request: Request<proto::StreamRawBytesRequest>,
    ) -> std::result::Result<Response<Self::StreamRawBytesStream>, Status> {
        let result = self.stream_raw_bytes_inner(request.into_inner()).await;
        self.record("StreamRawBytes", result)
    }

    async fn stream_events(
        &self,
        _request: Request<proto::StreamEventsRequest>,
    ) -> std::result::Result<Response<Self::StreamEventsStream>, Status> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(DEFAULT_SUBSCRIBER_BUFFER);
        self.local.store().subscribe_events(cancel.clone(), tx);
        Ok(Response::new(forward_subscription(rx, cancel, |event| {
            proto::StreamEventsResponse {
                event: Some(proto::ContainerEvent::from(&event)),
            }
        })))
    }

    async fn stream_stats(
        &self,
        _request: Request<proto::StreamStatsRequest>,
    ) -> std::result::Result<Response<Self::StreamStatsStream>, Status> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(DEFAULT_SUBSCRIBER_BUFFER);
        self.local.store().subscribe_stats(cancel.clone(), tx);
        Ok(Response::new(forward_subscription(rx, cancel, |stat| {
            proto::StreamStatsResponse {
                stat: Some(proto::ContainerStat::from(&stat)),
            }
        })))
    }

    async fn stream_container_started(
        &self,
        _request: Request<proto::StreamContainerStartedRequest>,
    ) -> std::result::Result<Response<Self::StreamContainerStartedStream>, Status> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(DEFAULT_SUBSCRIBER_BUFFER);
        self.local.store().subscribe_new_containers(cancel.clone(), tx);
        Ok(Response::new(forward_subscription(rx, cancel, |container| {
            proto::StreamContainerStartedResponse {
                container: Some(proto::Container::from(&container)),
            }
        })))
    }

    async fn find_container(
        &self,
        request: Request<proto::FindContainerRequest>,
    ) -> std::result::Result<Response<proto::FindContainerResponse>, Status> {
        let req = request.into_inner();
        let result = self
            .local
            .find_container(&req.container_id)
            .await
            .map(|container| proto::FindContainerResponse {
                container: Some(proto::Container::from(&container)),
            });
        self.record("FindContainer", result)
    }

    async fn list_containers(
        &self,
        _request: Request<proto::ListContainersRequest>,
    ) -> std::result::Result<Response<proto::ListContainersResponse>, Status> {
        let result = self.local.list_containers().await.map(|containers| {
            proto::ListContainersResponse {
                containers: containers.iter().map(proto::Container::from).collect(),
            }
        });
        self.record("ListContainers", result)
    }

    async fn host_info(
        &self,
        _request: Request<proto::HostInfoRequest>,
    ) -> std::result::Result<Response<proto::HostInfoResponse>, Status> {
        let result = self.local.host().await.map(|host| proto::HostInfoResponse {
            host: Some(proto::Host::from(&host)),
        });
        self.record("HostInfo", result)
    }

    async fn container_action(
        &self,
        request: Request<proto::ContainerActionRequest>,
    ) -> std::result::Result<Response<proto::ContainerActionResponse>, Status> {
        let result = self
            .container_action_inner(request.into_inner())
            .await
            .map(|_| proto::ContainerActionResponse {});
        self.record("ContainerAction", result)
    }
}
