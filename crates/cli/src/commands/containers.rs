//! Host and container listing, and lifecycle actions

use anyhow::Result;
use chrono::Utc;
use harbor_lib::{ContainerAction, MultiHostService};
use serde::Serialize;
use tabled::Tabled;

use crate::client::Target;
use crate::output::{
    color_availability, color_state, format_age, format_bytes, print_success, print_table,
    print_warning, short_id, OutputFormat,
};

#[derive(Tabled, Serialize)]
struct HostRow {
    #[tabled(rename = "Host")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPUs")]
    cpu_cores: u32,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Docker")]
    runtime_version: String,
    #[tabled(rename = "Agent")]
    agent_version: String,
}

#[derive(Tabled, Serialize)]
struct ContainerRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Created")]
    created: String,
}

pub async fn show_hosts(multi: &MultiHostService, format: OutputFormat) -> Result<()> {
    let hosts = multi.refresh_hosts().await;
    match format {
        OutputFormat::Json => crate::output::print_json(&hosts),
        OutputFormat::Table => {
            let rows: Vec<HostRow> = hosts
                .into_iter()
                .map(|h| HostRow {
                    status: color_availability(h.available),
                    memory: format_bytes(h.memory),
                    id: h.id,
                    name: h.name,
                    cpu_cores: h.cpu_cores,
                    runtime_version: h.runtime_version,
                    agent_version: h.agent_version,
                })
                .collect();
            print_table(&rows, format);
        }
    }
    Ok(())
}

pub async fn list_containers(
    multi: &MultiHostService,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let containers: Vec<_> = multi
        .list_all_containers()
        .await
        .into_iter()
        .filter(|c| all || c.state.is_running())
        .collect();

    for host in multi.hosts().iter().filter(|h| !h.available) {
        print_warning(&format!("{} is unavailable, showing last known state", host.id));
    }

    match format {
        OutputFormat::Json => crate::output::print_json(&containers),
        OutputFormat::Table => {
            let now = Utc::now();
            let rows: Vec<ContainerRow> = containers
                .iter()
                .map(|c| ContainerRow {
                    host: c.host.clone(),
                    id: short_id(&c.id).to_string(),
                    name: c.name.clone(),
                    image: c.image.clone(),
                    state: color_state(c.state),
                    health: c.health.clone().unwrap_or_default(),
                    created: format_age(c.created, now),
                })
                .collect();
            print_table(&rows, format);
        }
    }
    Ok(())
}

pub async fn run_action(
    multi: &MultiHostService,
    target: &Target,
    action: ContainerAction,
) -> Result<()> {
    multi
        .container_action(&target.host, &target.container, action)
        .await?;
    print_success(&format!(
        "{} {}/{}",
        match action {
            ContainerAction::Start => "Started",
            ContainerAction::Stop => "Stopped",
            ContainerAction::Restart => "Restarted",
        },
        target.host,
        target.container
    ));
    Ok(())
}
