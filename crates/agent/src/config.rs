//! Agent configuration

use anyhow::Result;
use harbor_lib::agent::ServerTlsFiles;
use harbor_lib::ring_buffer::DEFAULT_STATS_HISTORY;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables use this prefix, e.g. `HARBOR_AGENT_API_PORT`
pub const ENV_PREFIX: &str = "HARBOR_AGENT";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Display name reported to remote callers
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// gRPC agent endpoint
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Health and metrics port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_ca_cert_path")]
    pub ca_cert_path: PathBuf,

    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,

    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// Stat samples kept per container
    #[serde(default = "default_stats_history")]
    pub stats_history: usize,

    /// Seconds a destroyed container stays listed
    #[serde(default = "default_removal_grace")]
    pub removal_grace_secs: u64,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 7007))
}

fn default_api_port() -> u16 {
    8080
}

fn default_ca_cert_path() -> PathBuf {
    PathBuf::from("/certs/ca.pem")
}

fn default_cert_path() -> PathBuf {
    PathBuf::from("/certs/cert.pem")
}

fn default_key_path() -> PathBuf {
    PathBuf::from("/certs/key.pem")
}

fn default_stats_history() -> usize {
    DEFAULT_STATS_HISTORY
}

fn default_removal_grace() -> u64 {
    5
}

impl AgentConfig {
    /// Load from an optional `harbor-agent` config file, then the environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("harbor-agent").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn server_tls_files(&self) -> ServerTlsFiles {
        ServerTlsFiles {
            ca_cert_path: self.ca_cert_path.clone(),
            cert_path: self.cert_path.clone(),
            key_path: self.key_path.clone(),
        }
    }

    pub fn removal_grace(&self) -> Duration {
        Duration::from_secs(self.removal_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_builder(config::Config::builder()).unwrap();
        assert_eq!(config.listen_addr.port(), 7007);
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.stats_history, DEFAULT_STATS_HISTORY);
        assert_eq!(config.removal_grace(), Duration::from_secs(5));
        assert_eq!(config.server_tls_files().ca_cert_path, PathBuf::from("/certs/ca.pem"));
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("listen_addr", "127.0.0.1:9000")
            .unwrap()
            .set_override("removal_grace_secs", 12)
            .unwrap()
            .set_override("host_name", "edge-1")
            .unwrap();
        let config = AgentConfig::from_builder(builder).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.removal_grace_secs, 12);
        assert_eq!(config.host_name, "edge-1");
    }

    #[test]
    fn test_rejects_bad_address() {
        let builder = config::Config::builder()
            .set_override("listen_addr", "not an address")
            .unwrap();
        assert!(AgentConfig::from_builder(builder).is_err());
    }
}
