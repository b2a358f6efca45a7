//! Harbor: container log, event and stat aggregation
//!
//! This crate provides the core functionality for:
//! - Demultiplexing and parsing container log streams into events
//! - A live, event-driven view of one host's containers
//! - The agent protocol that exposes a host to remote callers
//! - Fan-out over many hosts with offline fallback
//! - Health checks and observability

pub mod agent;
pub mod error;
pub mod health;
pub mod host;
pub mod logs;
pub mod models;
pub mod observability;
pub mod proto;
pub mod ring_buffer;
pub mod runtime;
pub mod store;

pub use error::{Error, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use host::{HostService, LocalHost, MultiHostService, RemoteHost};
pub use logs::{EventGenerator, LogEvent, LogMessage, LogPosition, LogSession};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use ring_buffer::RingBuffer;
pub use runtime::RuntimeClient;
pub use store::{ContainerHandle, ContainerStore};
