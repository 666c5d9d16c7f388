use clap::Parser;
use sinkhole_dns_domain::config::CliOverrides;
use sinkhole_dns_jobs::{AutoUpdateJob, BlocklistHousekeepingJob, ClientSyncJob, JobRunner};
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;
mod di;
mod server;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "sinkhole-dns")]
#[command(version)]
#[command(about = "Sinkhole DNS - caching DNS forwarder with ad-blocking")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Database path
    #[arg(long)]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for downloaded block list snapshots
    #[arg(long, value_name = "DIR")]
    lists_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        database_path: cli.database.clone(),
        log_level: cli.log_level.clone(),
        lists_dir: cli.lists_dir.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Sinkhole DNS Server v{}", env!("CARGO_PKG_VERSION"));

    let database_url = format!("sqlite:{}", config.database.path);
    let pool = bootstrap::init_database(&database_url).await?;

    let repos = di::Repositories::new(pool);
    let dns_services = di::DnsServices::new(&config, &repos)?;
    let use_cases = di::UseCases::new(&config, &repos, &dns_services);

    let shutdown = CancellationToken::new();

    // Allow list first so no lookup runs against an empty allow set.
    let seeded = use_cases.ensure_allowlist.execute().await?;
    if seeded > 0 {
        info!(seeded, "Default allow list installed");
    }
    use_cases
        .seed_lists
        .execute(&config.blocking.default_lists)
        .await?;

    let consumer = dns_services.engine.clone().start(shutdown.clone());
    dns_services.signals.request_update();

    let mut runner = JobRunner::new()
        .with_housekeeping(
            BlocklistHousekeepingJob::new(
                dns_services.engine.clone(),
                dns_services.signals.clone(),
                use_cases.refresh_lists.clone(),
                dns_services.answer_cache.clone(),
                dns_services.events.clone(),
            )
            .with_stats_interval(config.blocking.stats_refresh_interval_secs),
        )
        .with_client_sync(ClientSyncJob::new(use_cases.sync_clients.clone()))
        .with_shutdown_token(shutdown.clone());
    if config.blocking.auto_update {
        runner = runner.with_auto_update(AutoUpdateJob::new(dns_services.signals.clone()));
    }
    let job_handles = runner.start();

    let addresses: Vec<IpAddr> = config
        .server
        .listen_v4
        .iter()
        .copied()
        .map(IpAddr::V4)
        .chain(config.server.listen_v6.iter().copied().map(IpAddr::V6))
        .collect();

    let server_shutdown = shutdown.clone();
    let handler = Arc::clone(&dns_services.handler_use_case);
    let port = config.server.dns_port;
    let server_task = tokio::spawn(async move {
        let result =
            server::start_dns_server(addresses, port, handler, server_shutdown.clone()).await;
        if let Err(e) = result {
            error!(error = %e, "DNS server error");
            server_shutdown.cancel();
        }
    });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    if let Err(e) = server_task.await {
        warn!(error = %e, "DNS server task ended abnormally");
    }
    if let Some(consumer) = consumer {
        let _ = consumer.await;
    }
    for handle in job_handles {
        let _ = handle.await;
    }

    info!("Server shutdown complete");
    Ok(())
}
