//! Prometheus metrics and structured lifecycle logging
//!
//! Metrics live in the default Prometheus registry and are registered once
//! per process; [`AgentMetrics`] is a cheap handle onto them.

use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

static GLOBAL_METRICS: OnceLock<Option<MetricsInner>> = OnceLock::new();

struct MetricsInner {
    containers_tracked: IntGauge,
    runtime_events: IntCounterVec,
    subscriber_drops: IntCounterVec,
    active_log_streams: IntGauge,
    event_stream_reconnects: IntCounter,
    hosts_unavailable: IntGauge,
    rpc_errors: IntCounterVec,
}

impl MetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            containers_tracked: register_int_gauge!(
                "harbor_containers_tracked",
                "Containers currently held by the store"
            )?,
            runtime_events: register_int_counter_vec!(
                "harbor_runtime_events_total",
                "Lifecycle events received from the runtime",
                &["event"]
            )?,
            subscriber_drops: register_int_counter_vec!(
                "harbor_subscriber_drops_total",
                "Notifications dropped because a subscriber was not keeping up",
                &["kind"]
            )?,
            active_log_streams: register_int_gauge!(
                "harbor_active_log_streams",
                "Log sessions currently being served"
            )?,
            event_stream_reconnects: register_int_counter!(
                "harbor_event_stream_reconnects_total",
                "Times the runtime event subscription was re-established"
            )?,
            hosts_unavailable: register_int_gauge!(
                "harbor_hosts_unavailable",
                "Hosts that failed their last request"
            )?,
            rpc_errors: register_int_counter_vec!(
                "harbor_rpc_errors_total",
                "Agent RPCs that returned an error status",
                &["method"]
            )?,
        })
    }
}

/// Handle to the process-wide metrics
///
/// If registration failed (a name clash in the default registry) every
/// recording method becomes a no-op instead of aborting the process.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match MetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register metrics, recording disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&MetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn set_containers_tracked(&self, count: usize) {
        if let Some(m) = self.inner() {
            m.containers_tracked.set(count as i64);
        }
    }

    pub fn inc_runtime_events(&self, event: &str) {
        if let Some(m) = self.inner() {
            m.runtime_events.with_label_values(&[event]).inc();
        }
    }

    pub fn inc_subscriber_drops(&self, kind: &str) {
        if let Some(m) = self.inner() {
            m.subscriber_drops.with_label_values(&[kind]).inc();
        }
    }

    pub fn log_stream_opened(&self) {
        if let Some(m) = self.inner() {
            m.active_log_streams.inc();
        }
    }

    pub fn log_stream_closed(&self) {
        if let Some(m) = self.inner() {
            m.active_log_streams.dec();
        }
    }

    pub fn inc_event_stream_reconnects(&self) {
        if let Some(m) = self.inner() {
            m.event_stream_reconnects.inc();
        }
    }

    pub fn set_hosts_unavailable(&self, count: usize) {
        if let Some(m) = self.inner() {
            m.hosts_unavailable.set(count as i64);
        }
    }

    pub fn inc_rpc_errors(&self, method: &str) {
        if let Some(m) = self.inner() {
            m.rpc_errors.with_label_values(&[method]).inc();
        }
    }
}

/// Lifecycle events logged with a consistent set of fields
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn log_startup(&self, version: &str, runtime_version: &str, containers: usize) {
        info!(
            event = "agent_started",
            host = %self.host,
            agent_version = %version,
            runtime_version = %runtime_version,
            containers = containers,
            "Harbor agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host,
            reason = %reason,
            "Harbor agent shutting down"
        );
    }

    pub fn log_event_stream(&self, connected: bool, detail: &str) {
        if connected {
            info!(
                event = "event_stream",
                host = %self.host,
                connected = true,
                "Subscribed to runtime events"
            );
        } else {
            warn!(
                event = "event_stream",
                host = %self.host,
                connected = false,
                detail = %detail,
                "Runtime event stream lost, reconnecting"
            );
        }
    }

    pub fn log_host_status(&self, host_id: &str, available: bool, detail: Option<&str>) {
        if available {
            info!(
                event = "host_status",
                host = %self.host,
                target_host = %host_id,
                available = true,
                "Host is reachable"
            );
        } else {
            warn!(
                event = "host_status",
                host = %self.host,
                target_host = %host_id,
                available = false,
                detail = detail.unwrap_or(""),
                "Host is unavailable, serving last known state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle_records() {
        let metrics = AgentMetrics::new();
        let other = AgentMetrics::new();

        metrics.set_containers_tracked(3);
        metrics.inc_runtime_events("start");
        metrics.inc_subscriber_drops("events");
        metrics.log_stream_opened();
        other.log_stream_closed();
        metrics.inc_event_stream_reconnects();
        metrics.set_hosts_unavailable(1);
        metrics.inc_rpc_errors("FindContainer");

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "harbor_runtime_events_total"));
    }

    #[test]
    fn test_structured_logger() {
        let logger = StructuredLogger::new("node-a");
        assert_eq!(logger.host, "node-a");
        logger.log_host_status("remote-1", false, Some("connection refused"));
    }
}
