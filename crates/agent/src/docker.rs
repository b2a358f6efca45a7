//! Docker Engine implementation of the runtime boundary

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, ContainerStatsResponse, EventMessage};
use bollard::query_parameters::{
    EventsOptionsBuilder, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RestartContainerOptions, StartContainerOptions, StatsOptionsBuilder, StopContainerOptions,
};
use bollard::Docker;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use harbor_lib::logs::demux::encode_frame;
use harbor_lib::runtime::{EventStream, LogReader, RuntimeClient, StatStream};
use harbor_lib::{
    Container, ContainerAction, ContainerEvent, ContainerStat, ContainerState, Error, Host,
    Result, StdType,
};
use std::collections::HashMap;
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// Runtime client talking to the local Docker daemon
pub struct DockerRuntime {
    docker: Docker,
    host: Host,
}

impl DockerRuntime {
    /// Connect over the platform default socket and resolve host metadata
    pub async fn connect(host_name: &str) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Unavailable(format!("cannot connect to docker: {}", e)))?;

        let version = docker.version().await.map_err(runtime_error)?;
        let system = docker.info().await.map_err(runtime_error)?;

        let id = system.id.clone().unwrap_or_else(|| host_name.to_string());
        let mut host = Host::new(id, host_name);
        host.cpu_cores = system.ncpu.unwrap_or_default().max(0) as u32;
        host.memory = system.mem_total.unwrap_or_default().max(0) as u64;
        host.runtime_version = version.version.unwrap_or_default();

        info!(
            host_id = %host.id,
            runtime_version = %host.runtime_version,
            cpu_cores = host.cpu_cores,
            "Connected to docker"
        );
        Ok(Self { docker, host })
    }

    fn logs(&self, id: &str, options: LogsOptions) -> LogReader {
        let output = self.docker.logs(id, Some(options)).map(|chunk| {
            chunk
                .map(reframe)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });
        Box::pin(StreamReader::new(Box::pin(output)))
    }
}

/// Whole seconds as the engine's query parameter expects them
fn unix_seconds(t: DateTime<Utc>) -> Result<i32> {
    t.timestamp()
        .try_into()
        .map_err(|_| Error::InvalidArgument(format!("time {} is out of range", t)))
}

/// Options for following logs; without `since` only new output is sent
fn follow_options(since: Option<DateTime<Utc>>, std_types: StdType) -> Result<LogsOptions> {
    Ok(LogsOptions {
        follow: true,
        stdout: std_types.contains(StdType::STDOUT),
        stderr: std_types.contains(StdType::STDERR),
        since: unix_seconds(since.unwrap_or_else(Utc::now))?,
        timestamps: true,
        tail: if since.is_some() { "all" } else { "0" }.to_string(),
        ..Default::default()
    })
}

fn between_options(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    std_types: StdType,
) -> Result<LogsOptions> {
    Ok(LogsOptions {
        follow: false,
        stdout: std_types.contains(StdType::STDOUT),
        stderr: std_types.contains(StdType::STDERR),
        since: unix_seconds(since)?,
        until: unix_seconds(until)?,
        timestamps: true,
        tail: "all".to_string(),
        ..Default::default()
    })
}

/// Put demultiplexed output back into the runtime's framed form
///
/// TTY output was never framed and passes through as is.
fn reframe(output: LogOutput) -> Bytes {
    match output {
        LogOutput::StdOut { message } => Bytes::from(encode_frame(StdType::STDOUT, &message)),
        LogOutput::StdErr { message } => Bytes::from(encode_frame(StdType::STDERR, &message)),
        // stdin echo is framed as stream 0, which readers surface as stderr
        LogOutput::StdIn { message } => Bytes::from(encode_frame(StdType::STDERR, &message)),
        LogOutput::Console { message } => message,
    }
}

fn runtime_error(err: DockerError) -> Error {
    Error::Runtime(err.to_string())
}

fn lookup_error(id: &str, err: DockerError) -> Error {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => Error::NotFound(id.to_string()),
        other => runtime_error(other),
    }
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        // the engine reports the zero time for containers that never started
        .filter(|dt| dt.timestamp() > 0)
}

fn to_container(inspect: ContainerInspectResponse) -> Container {
    let id = inspect.id.unwrap_or_default();
    let name = inspect
        .name
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();

    let state = inspect
        .state
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .and_then(|status| status.to_string().parse().ok())
        .unwrap_or(ContainerState::Dead);

    let mut container = Container::new(id, name, state);
    container.image_id = inspect.image.unwrap_or_default();
    container.created = parse_time(inspect.created.as_deref()).unwrap_or_else(Utc::now);

    if let Some(runtime_state) = inspect.state {
        container.started_at = parse_time(runtime_state.started_at.as_deref());
        container.health = runtime_state
            .health
            .and_then(|h| h.status)
            .map(|status| status.to_string())
            .filter(|status| !status.is_empty() && status != "none");
    }

    if let Some(config) = inspect.config {
        container.image = config.image.unwrap_or_default();
        container.tty = config.tty.unwrap_or(false);
        container.command = config.cmd.unwrap_or_default().join(" ");
        container.labels = config.labels.unwrap_or_default();
        container.group = Container::resolve_group(&container.labels);
    }
    container
}

fn to_event(message: EventMessage) -> Option<ContainerEvent> {
    let actor_id = message.actor.and_then(|actor| actor.id)?;
    let name = message.action?;
    Some(ContainerEvent::new(actor_id, name, ""))
}

fn to_stat(id: &str, stats: ContainerStatsResponse) -> ContainerStat {
    let cpu_percent = match (stats.cpu_stats.as_ref(), stats.precpu_stats.as_ref()) {
        (Some(cpu), Some(precpu)) => {
            let total = cpu.cpu_usage.as_ref().and_then(|u| u.total_usage).unwrap_or(0);
            let prev_total = precpu
                .cpu_usage
                .as_ref()
                .and_then(|u| u.total_usage)
                .unwrap_or(0);
            let cpu_delta = total.saturating_sub(prev_total);
            let system_delta = cpu
                .system_cpu_usage
                .unwrap_or(0)
                .saturating_sub(precpu.system_cpu_usage.unwrap_or(0));
            if system_delta > 0 && cpu_delta > 0 {
                let cpus = cpu.online_cpus.unwrap_or(1) as f64;
                cpu_delta as f64 / system_delta as f64 * cpus * 100.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    let (memory_usage, memory_limit) = stats
        .memory_stats
        .as_ref()
        .map(|m| (m.usage.unwrap_or(0), m.limit.unwrap_or(0)))
        .unwrap_or((0, 0));
    let memory_percent = if memory_limit > 0 {
        memory_usage as f64 / memory_limit as f64 * 100.0
    } else {
        0.0
    };

    ContainerStat {
        id: id.to_string(),
        cpu_percent,
        memory_percent,
        memory_usage: memory_usage as f64,
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    fn host(&self) -> Host {
        self.host.clone()
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(runtime_error)?;

        // the summary lacks tty and start time, so inspect each one
        let mut containers = Vec::with_capacity(summaries.len());
        for id in summaries.into_iter().filter_map(|s| s.id) {
            match self.find_container(&id).await {
                Ok(container) => containers.push(container),
                // removed between the listing and the inspect
                Err(Error::NotFound(_)) => debug!(container_id = %id, "Container vanished"),
                Err(e) => return Err(e),
            }
        }
        Ok(containers)
    }

    async fn find_container(&self, id: &str) -> Result<Container> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| lookup_error(id, e))?;
        Ok(to_container(inspect))
    }

    async fn container_logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
        std_types: StdType,
    ) -> Result<LogReader> {
        let options = follow_options(since, std_types)?;
        Ok(self.logs(id, options))
    }

    async fn container_logs_between(
        &self,
        id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        std_types: StdType,
    ) -> Result<LogReader> {
        let options = between_options(since, until, std_types)?;
        Ok(self.logs(id, options))
    }

    async fn events(&self) -> Result<EventStream> {
        let filters = HashMap::from_iter([("type", vec!["container".to_string()])]);
        let options = EventsOptionsBuilder::default().filters(&filters).build();
        let stream = self.docker.events(Some(options)).filter_map(|item| match item {
            Ok(message) => to_event(message).map(Ok),
            Err(e) => Some(Err(Error::Stream(e.to_string()))),
        });
        Ok(Box::pin(stream))
    }

    async fn container_stats(&self, id: &str) -> Result<StatStream> {
        let options = StatsOptionsBuilder::new().stream(true).build();
        let container_id = id.to_string();
        let stream = self.docker.stats(id, Some(options)).map(move |item| {
            item.map(|stats| to_stat(&container_id, stats))
                .map_err(|e| Error::Stream(e.to_string()))
        });
        Ok(Box::pin(stream))
    }

    async fn container_action(&self, action: ContainerAction, id: &str) -> Result<()> {
        let result = match action {
            ContainerAction::Start => {
                self.docker
                    .start_container(id, None::<StartContainerOptions>)
                    .await
            }
            ContainerAction::Stop => {
                self.docker
                    .stop_container(id, None::<StopContainerOptions>)
                    .await
            }
            ContainerAction::Restart => {
                self.docker
                    .restart_container(id, None::<RestartContainerOptions>)
                    .await
            }
        };
        result.map_err(|e| lookup_error(id, e))
    }
}
