//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::ValueEnum;
use harbor_lib::agent::{AgentClient, ClientTlsFiles};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Agents the CLI talks to
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    /// Default output format
    pub default_format: Option<String>,
}

/// One agent endpoint and the client certificate used to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub id: String,
    /// e.g. `https://node-2:7007`
    pub endpoint: String,
    /// Omit for plaintext agents (local testing only)
    pub tls: Option<TlsConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub ca_cert: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    /// Name in the agent certificate when it differs from the endpoint host
    pub domain: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load from `path`, or the default location when `None`
    ///
    /// A missing default file yields an empty config; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("config file {} does not exist", config_path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content).context("Failed to parse config file")?;
        let mut seen = std::collections::HashSet::new();
        for host in &config.hosts {
            if !seen.insert(host.id.as_str()) {
                anyhow::bail!("host {} is configured twice", host.id);
            }
        }
        Ok(config)
    }

    /// `default_format` from the file, table when unset
    pub fn default_format(&self) -> Result<OutputFormat> {
        match self.default_format.as_deref() {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("invalid default_format: {}", e)),
            None => Ok(OutputFormat::default()),
        }
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("harbor").join("config.json"))
    }
}

impl HostConfig {
    pub fn client(&self) -> AgentClient {
        let timeout = Duration::from_secs(self.timeout_secs);
        let mut builder = AgentClient::builder()
            .endpoint(self.endpoint.clone())
            .connect_timeout(timeout)
            .request_timeout(timeout);
        if let Some(tls) = &self.tls {
            builder = builder.tls(ClientTlsFiles {
                ca_cert_path: tls.ca_cert.clone(),
                cert_path: tls.cert.clone(),
                key_path: tls.key.clone(),
                domain: tls.domain.clone(),
            });
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosts() {
        let config = Config::parse(
            r#"{
                "hosts": [
                    {"id": "edge-1", "endpoint": "https://edge-1:7007",
                     "tls": {"ca_cert": "/c/ca.pem", "cert": "/c/cli.pem", "key": "/c/cli.key"}},
                    {"id": "dev", "endpoint": "http://127.0.0.1:7007", "timeout_secs": 2}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.hosts[0].timeout_secs, 10);
        assert!(config.hosts[0].tls.as_ref().unwrap().domain.is_none());
        assert!(config.hosts[1].tls.is_none());
        assert_eq!(config.hosts[1].client().endpoint(), "http://127.0.0.1:7007");
    }

    #[test]
    fn test_duplicate_host_ids_rejected() {
        let err = Config::parse(
            r#"{"hosts": [
                {"id": "a", "endpoint": "http://x:1"},
                {"id": "a", "endpoint": "http://y:1"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn test_default_format() {
        assert!(matches!(Config::default().default_format().unwrap(), OutputFormat::Table));
        let config = Config::parse(r#"{"default_format": "JSON"}"#).unwrap();
        assert!(matches!(config.default_format().unwrap(), OutputFormat::Json));
        let config = Config::parse(r#"{"default_format": "yaml"}"#).unwrap();
        assert!(config.default_format().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.json"))).is_err());

        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hosts": []}"#).unwrap();
        assert!(Config::load(Some(&path)).unwrap().hosts.is_empty());
    }
}
