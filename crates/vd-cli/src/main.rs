use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use vd_agent::{DiagnosticsService, StaticRegistry};
use vd_core::{AgentConfig, DiagnosticsRequest, RequestPayload};

#[derive(Parser)]
#[command(name = "vmdiag")]
#[command(version, about = "Remote diagnostics agent for system VMs", long_about = None)]
struct Cli {
    /// Agent configuration file
    #[arg(short, long, default_value = "vmdiag.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a whitelisted network probe against a target appliance
    Run {
        #[command(subcommand)]
        action: RunAction,
    },
    /// Bundle log files or captures from a target appliance
    Retrieve {
        /// Appliance id the request is addressed to
        #[arg(long)]
        target: String,
        /// Retrieval category: LOGFILES or FILES
        #[arg(long, default_value = "LOGFILES")]
        r#type: String,
        /// Comma-separated paths and alias tokens; empty uses the
        /// defaults configured for the appliance kind
        #[arg(long, default_value = "")]
        items: String,
    },
    /// Handle one raw JSON request from a file or stdin
    Request {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Remove stale archives and captures from the work directory
    Gc,
    /// Metrics server
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },
}

#[derive(Subcommand)]
enum RunAction {
    /// ICMP reachability probe
    Ping {
        #[arg(long)]
        target: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        params: Option<String>,
    },
    /// Hop-by-hop route probe
    Traceroute {
        #[arg(long)]
        target: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        params: Option<String>,
    },
    /// ARP-level reachability probe
    Arping {
        #[arg(long)]
        target: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        params: Option<String>,
    },
}

#[derive(Subcommand)]
enum MetricsAction {
    /// Start metrics server
    Serve {
        #[arg(long, default_value = "9138")]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { action } => {
            let request = run_action_to_request(action);
            tokio::runtime::Runtime::new()?
                .block_on(async { handle_request(&cli.config, request).await })?;
        }
        Commands::Retrieve {
            target,
            r#type,
            items,
        } => {
            let request = DiagnosticsRequest {
                target_id: target,
                payload: RequestPayload::FileRetrieval {
                    retrieval_type: r#type,
                    items,
                },
            };
            tokio::runtime::Runtime::new()?
                .block_on(async { handle_request(&cli.config, request).await })?;
        }
        Commands::Request { file } => {
            let request = read_request(file.as_deref())?;
            tokio::runtime::Runtime::new()?
                .block_on(async { handle_request(&cli.config, request).await })?;
        }
        Commands::Gc => {
            let config = AgentConfig::load_or_default(&cli.config)?;
            let removed = vd_archive::purge_stale(
                &config.work_dir,
                &config.archive_prefix,
                config.max_file_age(),
            )?;
            println!("removed {} stale file(s) from {}", removed, config.work_dir.display());
        }
        Commands::Metrics { action } => {
            tokio::runtime::Runtime::new()?
                .block_on(async { handle_metrics_action(&cli.config, action).await })?;
        }
    }

    Ok(())
}

fn run_action_to_request(action: RunAction) -> DiagnosticsRequest {
    let (command_type, target, address, params) = match action {
        RunAction::Ping {
            target,
            address,
            params,
        } => ("PING", target, address, params),
        RunAction::Traceroute {
            target,
            address,
            params,
        } => ("TRACEROUTE", target, address, params),
        RunAction::Arping {
            target,
            address,
            params,
        } => ("ARPING", target, address, params),
    };

    DiagnosticsRequest {
        target_id: target,
        payload: RequestPayload::LiveCommand {
            command_type: command_type.to_string(),
            address,
            extra_args: params,
        },
    }
}

fn read_request(file: Option<&std::path::Path>) -> anyhow::Result<DiagnosticsRequest> {
    use anyhow::Context;

    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request from {:?}", path))?,
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read request from stdin")?,
    };
    serde_json::from_str(&raw).context("Failed to decode diagnostics request JSON")
}

async fn handle_request(
    config_path: &std::path::Path,
    request: DiagnosticsRequest,
) -> anyhow::Result<()> {
    let config = AgentConfig::load_or_default(config_path)?;

    if config.gc.enabled {
        let removed =
            vd_archive::purge_stale(&config.work_dir, &config.archive_prefix, config.max_file_age())?;
        if removed > 0 {
            tracing::debug!(removed, "purged stale diagnostics files");
        }
    }

    let registry = StaticRegistry::from_config(&config);
    let service = DiagnosticsService::new(config, registry);

    let response = service.handle(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn handle_metrics_action(
    config_path: &std::path::Path,
    action: MetricsAction,
) -> anyhow::Result<()> {
    match action {
        MetricsAction::Serve { port } => {
            let config = AgentConfig::load_or_default(config_path)?;
            let collector = Arc::new(vd_metrics::MetricsCollector::new()?);
            collector.set_archive_dir_bytes(archive_dir_bytes(&config)?);
            let server = vd_metrics::MetricsServer::new(collector, port);
            server.serve().await?;
        }
    }
    Ok(())
}

/// Total size of agent-produced archives currently in the work directory.
fn archive_dir_bytes(config: &AgentConfig) -> anyhow::Result<u64> {
    if !config.work_dir.is_dir() {
        return Ok(0);
    }
    let mut total = 0;
    for entry in std::fs::read_dir(&config.work_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(&config.archive_prefix) && name.ends_with(".zip") {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
