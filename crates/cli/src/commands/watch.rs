//! Live event and stat feeds across all hosts

use anyhow::{bail, Result};
use colored::Colorize;
use harbor_lib::store::DEFAULT_SUBSCRIBER_BUFFER;
use harbor_lib::MultiHostService;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::output::{format_bytes, format_percent, print_json, short_id, OutputFormat};

pub async fn watch_events(multi: &MultiHostService, format: OutputFormat) -> Result<()> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let (tx, mut rx) = mpsc::channel(DEFAULT_SUBSCRIBER_BUFFER);
    if multi.subscribe_events(cancel, tx).await == 0 {
        bail!("no host accepted the event subscription");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => match format {
                    OutputFormat::Json => print_json(&event),
                    OutputFormat::Table => println!(
                        "{} {} {}",
                        format!("{}/{}", event.host, short_id(&event.actor_id)).cyan(),
                        event.name.bold(),
                        chrono::Utc::now().format("%H:%M:%S").to_string().dimmed(),
                    ),
                },
                None => break,
            },
        }
    }
    Ok(())
}

pub async fn watch_stats(multi: &MultiHostService, format: OutputFormat) -> Result<()> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let (tx, mut rx) = mpsc::channel(DEFAULT_SUBSCRIBER_BUFFER);
    if multi.subscribe_stats(cancel, tx).await == 0 {
        bail!("no host accepted the stats subscription");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            stat = rx.recv() => match stat {
                Some(stat) => match format {
                    OutputFormat::Json => print_json(&stat),
                    OutputFormat::Table => println!(
                        "{:<12}  cpu {:>7}  mem {:>7}  {}",
                        short_id(&stat.id),
                        format_percent(stat.cpu_percent),
                        format_percent(stat.memory_percent),
                        format_bytes(stat.memory_usage as u64),
                    ),
                },
                None => break,
            },
        }
    }
    Ok(())
}
