//! Log viewing

use anyhow::Result;
use chrono::{DateTime, Utc};
use harbor_lib::{MultiHostService, StdType};
use std::io::Write;
use tokio_stream::StreamExt;

use crate::client::Target;
use crate::output::{format_log_line, OutputFormat};

pub struct LogsArgs {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub streams: StdType,
    pub raw: bool,
}

pub async fn show_logs(
    multi: &MultiHostService,
    target: &Target,
    args: LogsArgs,
    format: OutputFormat,
) -> Result<()> {
    if args.raw {
        let since = args.since.unwrap_or(DateTime::UNIX_EPOCH);
        let until = args.until.unwrap_or_else(Utc::now);
        let mut chunks = multi
            .raw_logs(&target.host, &target.container, since, until, args.streams)
            .await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            stdout.write_all(&chunk?)?;
        }
        stdout.flush()?;
        return Ok(());
    }

    let mut session = match (args.since, args.until) {
        (Some(since), Some(until)) => {
            multi
                .logs_between_dates(&target.host, &target.container, since, until, args.streams)
                .await?
        }
        (since, None) => {
            multi
                .stream_logs(&target.host, &target.container, since, args.streams)
                .await?
        }
        (None, Some(until)) => {
            multi
                .logs_between_dates(
                    &target.host,
                    &target.container,
                    DateTime::UNIX_EPOCH,
                    until,
                    args.streams,
                )
                .await?
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = session.recv() => match event {
                Some(event) => match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
                    OutputFormat::Table => println!("{}", format_log_line(&event, &target.host)),
                },
                None => break,
            },
        }
    }

    if let Some(err) = session.take_error() {
        return Err(err.into());
    }
    Ok(())
}
