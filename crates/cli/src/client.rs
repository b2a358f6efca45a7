//! Connections to the configured agents

use crate::config::Config;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use harbor_lib::host::{MultiHostService, RemoteHost};
use std::str::FromStr;
use std::sync::Arc;

/// Register every configured agent, optionally only the one named `only`
pub async fn connect(config: &Config, only: Option<&str>) -> Result<MultiHostService> {
    let hosts: Vec<_> = config
        .hosts
        .iter()
        .filter(|h| only.map_or(true, |id| h.id == id))
        .collect();

    if hosts.is_empty() {
        match only {
            Some(id) => bail!("host {} is not configured", id),
            None => bail!("no hosts configured; add agents to ~/.config/harbor/config.json"),
        }
    }

    let multi = MultiHostService::new();
    for host in hosts {
        let remote = RemoteHost::new(host.id.clone(), Arc::new(host.client()));
        multi.add_host(host.id.clone(), Arc::new(remote)).await;
    }
    Ok(multi)
}

/// A container addressed as `host/container`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub container: String,
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((host, container)) if !host.is_empty() && !container.is_empty() => Ok(Self {
                host: host.to_string(),
                container: container.to_string(),
            }),
            _ => bail!("expected HOST/CONTAINER, got {:?}", s),
        }
    }
}

/// Parse a relative time such as `90s`, `15m`, `2h` or `7d` into an
/// absolute point in the past
pub fn parse_ago(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .context("missing unit (s, m, h or d)")?;
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount
        .parse()
        .with_context(|| format!("invalid duration {:?}", value))?;
    let delta = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => bail!("unknown duration unit {:?}", other),
    };
    delta
        .and_then(|delta| Utc::now().checked_sub_signed(delta))
        .with_context(|| format!("duration {:?} is out of range", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        let target: Target = "edge-1/web".parse().unwrap();
        assert_eq!(target.host, "edge-1");
        assert_eq!(target.container, "web");

        assert!("web".parse::<Target>().is_err());
        assert!("/web".parse::<Target>().is_err());
        assert!("edge-1/".parse::<Target>().is_err());
    }

    #[test]
    fn test_parse_ago() {
        let before = Utc::now();
        let t = parse_ago("15m").unwrap();
        let delta = before - t;
        assert!(delta >= Duration::minutes(15) - Duration::seconds(1));
        assert!(delta <= Duration::minutes(15) + Duration::seconds(1));

        assert!(parse_ago("15").is_err());
        assert!(parse_ago("m").is_err());
        assert!(parse_ago("3w").is_err());
    }

    #[tokio::test]
    async fn test_connect_requires_hosts() {
        let err = connect(&Config::default(), None).await.err().unwrap();
        assert!(err.to_string().contains("no hosts configured"));

        let err = connect(&Config::default(), Some("edge-1")).await.err().unwrap();
        assert!(err.to_string().contains("edge-1"));
    }
}
