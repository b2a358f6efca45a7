//! Conversions between domain types and `harbor.v1` messages

use crate::error::{Error, Result};
use crate::logs::{LogEvent, LogMessage, LogPosition, OrderedMap};
use crate::models::{
    Container, ContainerAction, ContainerEvent, ContainerStat, ContainerState, Host, StdType,
};
use crate::proto;
use crate::ring_buffer::{RingBuffer, DEFAULT_STATS_HISTORY};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub fn to_timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

pub fn from_timestamp(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts.seconds, ts.nanos.max(0) as u32).single()
}

impl From<&Container> for proto::Container {
    fn from(c: &Container) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            image: c.image.clone(),
            image_id: c.image_id.clone(),
            command: c.command.clone(),
            created: Some(to_timestamp(c.created)),
            state: c.state.as_str().to_string(),
            health: c.health.clone().unwrap_or_default(),
            host: c.host.clone(),
            tty: c.tty,
            labels: c.labels.clone(),
            stats: c.stats.snapshot().iter().map(proto::ContainerStat::from).collect(),
            group: c.group.clone().unwrap_or_default(),
            started: c.started_at.map(to_timestamp),
        }
    }
}

impl From<proto::Container> for Container {
    fn from(c: proto::Container) -> Self {
        let stats = RingBuffer::new(DEFAULT_STATS_HISTORY);
        for stat in c.stats {
            stats.push(ContainerStat::from(stat));
        }
        Self {
            id: c.id,
            name: c.name,
            image: c.image,
            image_id: c.image_id,
            command: c.command,
            created: c
                .created
                .as_ref()
                .and_then(from_timestamp)
                .unwrap_or_else(Utc::now),
            started_at: c.started.as_ref().and_then(from_timestamp),
            // an agent running a newer runtime may report states we do not know
            state: c.state.parse().unwrap_or(ContainerState::Dead),
            health: Some(c.health).filter(|h| !h.is_empty()),
            host: c.host,
            tty: c.tty,
            labels: c.labels,
            group: Some(c.group).filter(|g| !g.is_empty()),
            stats: Arc::new(stats),
        }
    }
}

impl From<&ContainerStat> for proto::ContainerStat {
    fn from(s: &ContainerStat) -> Self {
        Self {
            id: s.id.clone(),
            cpu_percent: s.cpu_percent,
            memory_percent: s.memory_percent,
            memory_usage: s.memory_usage,
        }
    }
}

impl From<proto::ContainerStat> for ContainerStat {
    fn from(s: proto::ContainerStat) -> Self {
        Self {
            id: s.id,
            cpu_percent: s.cpu_percent,
            memory_percent: s.memory_percent,
            memory_usage: s.memory_usage,
        }
    }
}

impl From<&ContainerEvent> for proto::ContainerEvent {
    fn from(e: &ContainerEvent) -> Self {
        Self {
            actor_id: e.actor_id.clone(),
            name: e.name.clone(),
            host: e.host.clone(),
        }
    }
}

impl From<proto::ContainerEvent> for ContainerEvent {
    fn from(e: proto::ContainerEvent) -> Self {
        Self {
            actor_id: e.actor_id,
            name: e.name,
            host: e.host,
        }
    }
}

impl From<&Host> for proto::Host {
    fn from(h: &Host) -> Self {
        Self {
            id: h.id.clone(),
            name: h.name.clone(),
            cpu_cores: h.cpu_cores,
            memory: h.memory,
            runtime_version: h.runtime_version.clone(),
            agent_version: h.agent_version.clone(),
        }
    }
}

impl From<proto::Host> for Host {
    fn from(h: proto::Host) -> Self {
        Self {
            id: h.id,
            name: h.name,
            cpu_cores: h.cpu_cores,
            memory: h.memory,
            runtime_version: h.runtime_version,
            agent_version: h.agent_version,
            endpoint: None,
            available: true,
        }
    }
}

impl From<ContainerAction> for proto::ContainerAction {
    fn from(action: ContainerAction) -> Self {
        match action {
            ContainerAction::Start => proto::ContainerAction::Start,
            ContainerAction::Stop => proto::ContainerAction::Stop,
            ContainerAction::Restart => proto::ContainerAction::Restart,
        }
    }
}

/// Decode the wire action; unspecified or unknown values are rejected
pub fn action_from_wire(value: i32) -> Result<ContainerAction> {
    match proto::ContainerAction::try_from(value) {
        Ok(proto::ContainerAction::Start) => Ok(ContainerAction::Start),
        Ok(proto::ContainerAction::Stop) => Ok(ContainerAction::Stop),
        Ok(proto::ContainerAction::Restart) => Ok(ContainerAction::Restart),
        _ => Err(Error::InvalidArgument(format!("unknown action: {}", value))),
    }
}

impl From<&LogEvent> for proto::LogEvent {
    fn from(e: &LogEvent) -> Self {
        let message = match &e.message {
            LogMessage::Simple(text) => proto::log_event::Message::Simple(proto::SimpleMessage {
                message: text.clone(),
            }),
            LogMessage::Complex(map) => proto::log_event::Message::Complex(proto::ComplexMessage {
                data: serde_json::to_vec(map).unwrap_or_default(),
            }),
        };
        Self {
            id: e.id,
            container_id: e.container_id.clone(),
            message: Some(message),
            timestamp: Some(prost_types::Timestamp {
                seconds: e.timestamp,
                nanos: 0,
            }),
            level: e.level.clone().unwrap_or_default(),
            stream: e.stream.as_str().to_string(),
            position: e.position.as_str().to_string(),
        }
    }
}

impl TryFrom<proto::LogEvent> for LogEvent {
    type Error = Error;

    fn try_from(e: proto::LogEvent) -> Result<Self> {
        let message = match e.message {
            Some(proto::log_event::Message::Simple(simple)) => LogMessage::Simple(simple.message),
            Some(proto::log_event::Message::Complex(complex)) => {
                let map: OrderedMap = serde_json::from_slice(&complex.data).map_err(|err| {
                    Error::Stream(format!("malformed structured log payload: {}", err))
                })?;
                LogMessage::Complex(map)
            }
            None => LogMessage::Simple(String::new()),
        };
        Ok(Self {
            message,
            timestamp: e.timestamp.map(|ts| ts.seconds).unwrap_or_default(),
            id: e.id,
            level: Some(e.level).filter(|l| !l.is_empty()),
            position: LogPosition::from_name(&e.position),
            stream: e.stream.parse().unwrap_or(StdType::STDOUT),
            container_id: e.container_id,
        })
    }
}
