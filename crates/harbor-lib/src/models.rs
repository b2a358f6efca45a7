//! Core data models for containers, stats, lifecycle events and hosts

use crate::error::Error;
use crate::ring_buffer::{RingBuffer, DEFAULT_STATS_HISTORY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Label that explicitly assigns a container to a group
pub const GROUP_LABEL: &str = "dev.harbor.group";

/// Compose project label, used as the group when no explicit one is set
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// Lifecycle state of a container as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(ContainerState::Created),
            "running" => Ok(ContainerState::Running),
            "paused" => Ok(ContainerState::Paused),
            "restarting" => Ok(ContainerState::Restarting),
            "removing" => Ok(ContainerState::Removing),
            "exited" => Ok(ContainerState::Exited),
            "dead" => Ok(ContainerState::Dead),
            other => Err(Error::InvalidArgument(format!(
                "unknown container state: {}",
                other
            ))),
        }
    }
}

/// One point-in-time resource sample for a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStat {
    pub id: String,
    #[serde(rename = "cpu")]
    pub cpu_percent: f64,
    #[serde(rename = "memory")]
    pub memory_percent: f64,
    #[serde(rename = "memoryUsage")]
    pub memory_usage: f64,
}

/// A lifecycle notification from the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEvent {
    #[serde(rename = "actorId")]
    pub actor_id: String,
    pub name: String,
    pub host: String,
}

impl ContainerEvent {
    pub fn new(actor_id: impl Into<String>, name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            name: name.into(),
            host: host.into(),
        }
    }
}

/// A workload on one host
///
/// Clones share the stat history buffer, so a clone taken from the store
/// keeps seeing new samples.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub command: String,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub state: ContainerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    pub host: String,
    #[serde(skip)]
    pub tty: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(serialize_with = "serialize_stats")]
    pub stats: Arc<RingBuffer<ContainerStat>>,
}

fn serialize_stats<S>(stats: &Arc<RingBuffer<ContainerStat>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    stats.snapshot().serialize(serializer)
}

impl Container {
    /// Minimal container with empty metadata, mostly useful for tests and
    /// as a starting point for runtime adapters
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: ContainerState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: String::new(),
            image_id: String::new(),
            command: String::new(),
            created: Utc::now(),
            started_at: None,
            state,
            health: None,
            host: String::new(),
            tty: false,
            labels: HashMap::new(),
            group: None,
            stats: Arc::new(RingBuffer::new(DEFAULT_STATS_HISTORY)),
        }
    }

    /// Replace the stat history with an empty buffer of the given capacity
    pub fn with_stats_capacity(mut self, capacity: usize) -> Self {
        self.stats = Arc::new(RingBuffer::new(capacity));
        self
    }

    /// Copy runtime metadata from a fresh lookup, keeping the stat history
    pub fn refresh_from(&mut self, other: &Container) {
        self.name = other.name.clone();
        self.image = other.image.clone();
        self.image_id = other.image_id.clone();
        self.command = other.command.clone();
        self.created = other.created;
        self.started_at = other.started_at;
        self.state = other.state;
        self.health = other.health.clone();
        self.tty = other.tty;
        self.labels = other.labels.clone();
        self.group = other.group.clone();
    }

    /// Group from the explicit label, falling back to the compose project
    pub fn resolve_group(labels: &HashMap<String, String>) -> Option<String> {
        labels
            .get(GROUP_LABEL)
            .or_else(|| labels.get(COMPOSE_PROJECT_LABEL))
            .filter(|g| !g.is_empty())
            .cloned()
    }
}

/// Commands that can be forwarded to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
}

impl ContainerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Restart => "restart",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ContainerAction::Start),
            "stop" => Ok(ContainerAction::Stop),
            "restart" => Ok(ContainerAction::Restart),
            other => Err(Error::InvalidArgument(format!("unknown action: {}", other))),
        }
    }
}

/// Selection of output streams, stored as bit flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StdType(u8);

impl StdType {
    pub const STDOUT: StdType = StdType(1);
    pub const STDERR: StdType = StdType(2);
    pub const ALL: StdType = StdType(3);

    /// Decode wire bits; an empty selection means both streams
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => StdType::ALL,
            b => StdType(b as u8),
        }
    }

    pub fn bits(&self) -> u32 {
        self.0 as u32
    }

    pub fn contains(&self, other: StdType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn as_str(&self) -> &'static str {
        match self.0 {
            1 => "stdout",
            2 => "stderr",
            _ => "all",
        }
    }
}

impl Default for StdType {
    fn default() -> Self {
        StdType::ALL
    }
}

impl fmt::Display for StdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StdType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(StdType::STDOUT),
            "stderr" => Ok(StdType::STDERR),
            "all" | "" => Ok(StdType::ALL),
            other => Err(Error::InvalidArgument(format!("unknown stream: {}", other))),
        }
    }
}

impl Serialize for StdType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Capacity and version metadata for one runtime endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: String,
    pub name: String,
    pub cpu_cores: u32,
    pub memory: u64,
    pub runtime_version: String,
    pub agent_version: String,
    /// Agent endpoint for remote hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub available: bool,
}

impl Host {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cpu_cores: 0,
            memory: 0,
            runtime_version: String::new(),
            agent_version: String::new(),
            endpoint: None,
            available: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_state_parsing() {
        assert_eq!("running".parse::<ContainerState>().unwrap(), ContainerState::Running);
        assert_eq!("Exited".parse::<ContainerState>().unwrap(), ContainerState::Exited);
        assert!("sleeping".parse::<ContainerState>().is_err());
        assert_eq!(ContainerState::Restarting.to_string(), "restarting");
    }

    #[test]
    fn test_container_action_parsing() {
        assert_eq!("restart".parse::<ContainerAction>().unwrap(), ContainerAction::Restart);
        let err = "explode".parse::<ContainerAction>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_std_type_bits() {
        assert_eq!(StdType::from_bits(0), StdType::ALL);
        assert_eq!(StdType::from_bits(1), StdType::STDOUT);
        assert_eq!(StdType::from_bits(2), StdType::STDERR);
        assert!(StdType::ALL.contains(StdType::STDERR));
        assert!(!StdType::STDOUT.contains(StdType::STDERR));
        assert_eq!(StdType::STDERR.to_string(), "stderr");
    }

    #[test]
    fn test_group_resolution() {
        let mut labels = HashMap::new();
        assert_eq!(Container::resolve_group(&labels), None);

        labels.insert(COMPOSE_PROJECT_LABEL.to_string(), "shop".to_string());
        assert_eq!(Container::resolve_group(&labels), Some("shop".to_string()));

        labels.insert(GROUP_LABEL.to_string(), "payments".to_string());
        assert_eq!(Container::resolve_group(&labels), Some("payments".to_string()));
    }

    #[test]
    fn test_clone_shares_stat_history() {
        let container = Container::new("abc", "web", ContainerState::Running);
        let copy = container.clone();

        container.stats.push(ContainerStat {
            id: "abc".to_string(),
            cpu_percent: 12.5,
            memory_percent: 40.0,
            memory_usage: 1024.0,
        });

        assert_eq!(copy.stats.len(), 1);
    }

    #[test]
    fn test_refresh_keeps_history() {
        let mut container = Container::new("abc", "web", ContainerState::Created);
        container.stats.push(ContainerStat {
            id: "abc".to_string(),
            cpu_percent: 1.0,
            memory_percent: 1.0,
            memory_usage: 1.0,
        });

        let fresh = Container::new("abc", "web-renamed", ContainerState::Running);
        container.refresh_from(&fresh);

        assert_eq!(container.name, "web-renamed");
        assert_eq!(container.state, ContainerState::Running);
        assert_eq!(container.stats.len(), 1);
    }

    #[test]
    fn test_container_serializes_stats_snapshot() {
        let container = Container::new("abc", "web", ContainerState::Running);
        container.stats.push(ContainerStat {
            id: "abc".to_string(),
            cpu_percent: 3.0,
            memory_percent: 4.0,
            memory_usage: 5.0,
        });

        let json = serde_json::to_value(&container).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["stats"][0]["cpu"], 3.0);
        assert!(json.get("tty").is_none());
    }
}
