use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use rental_api::{
    config,
    services::dashboard::DashboardStats,
    sync::{watch_and_refresh, SyncConfig, ViewSynchronizer, WebSocketChannel},
};

/// Keeps a dashboard view of a running rental-api in sync with its change feed.
#[derive(Parser, Debug)]
#[command(name = "rental-watch", version, about)]
struct Cli {
    /// Base URL of the rental API
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Notification socket; derived from --server when omitted
    #[arg(long)]
    ws: Option<String>,

    /// Delay before retrying a lost notification channel
    #[arg(long, default_value_t = 3_000)]
    reconnect_ms: u64,

    /// Print raw JSON instead of a summary line
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    data: Option<DashboardStats>,
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing(&cli.log_level, false);

    let server = cli.server.trim_end_matches('/').to_string();
    let ws_url = match cli.ws.clone() {
        Some(url) => url,
        None => socket_url(&server)?,
    };
    let stats_url = format!("{server}/api/v1/dashboard/stats");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    info!(ws = %ws_url, "watching rental-api");
    let handle = ViewSynchronizer::new(
        WebSocketChannel::new(ws_url),
        SyncConfig {
            reconnect_delay: Duration::from_millis(cli.reconnect_ms),
        },
    )
    .spawn();

    let json = cli.json;
    let refresher = watch_and_refresh(handle.subscribe(), |generation| {
        let client = client.clone();
        let stats_url = stats_url.clone();
        async move {
            match fetch_stats(&client, &stats_url).await {
                Ok(stats) => {
                    if let Err(err) = render(generation, &stats, json) {
                        warn!(error = %err, "failed to render stats");
                    }
                }
                Err(err) => warn!(generation, error = %err, "refresh failed"),
            }
        }
    });

    tokio::select! {
        _ = refresher => {},
        _ = tokio::signal::ctrl_c() => info!("stopping rental-watch"),
    }

    handle.close().await;
    Ok(())
}

fn socket_url(server: &str) -> Result<String> {
    let rest = if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(anyhow!("--server must start with http:// or https://"));
    };
    Ok(format!("{rest}/ws"))
}

async fn fetch_stats(client: &reqwest::Client, url: &str) -> Result<DashboardStats> {
    let envelope: Envelope = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?
        .json()
        .await
        .context("malformed stats response")?;

    match envelope {
        Envelope {
            success: true,
            data: Some(stats),
            ..
        } => Ok(stats),
        Envelope { message, .. } => Err(anyhow!(
            "server reported failure: {}",
            message.unwrap_or_else(|| "no message".into())
        )),
    }
}

fn render(generation: u64, stats: &DashboardStats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(stats)?);
        return Ok(());
    }
    println!(
        "[gen {generation}] garments {}/{} available, {} active rentals ({} late, {} due soon), revenue 24h {} / 7d {} / 30d {}",
        stats.available_garments,
        stats.total_garments,
        stats.active_rentals,
        stats.late_rentals,
        stats.due_soon_rentals,
        stats.revenue.day,
        stats.revenue.week,
        stats.revenue.month,
    );
    Ok(())
}
