use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use surplus_notifications::config;
use surplus_notifications::metrics;
use surplus_notifications::{HttpTransport, NotificationCenter, NotificationTransport};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the marketplace API, e.g. https://api.example.org/api
    #[clap(long)]
    pub api_base_url: Option<String>,

    /// Bearer token for the notification endpoints.
    #[clap(long)]
    pub auth_token: Option<String>,

    /// Seconds between background refreshes.
    #[clap(long, default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Deadline in seconds for a single request to the notification API.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Serve Prometheus metrics on this port.
    #[clap(long)]
    pub metrics_port: Option<u16>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            api_base_url: args.api_base_url.clone(),
            auth_token: args.auth_token.clone(),
            poll_interval_secs: args.poll_interval_secs,
            request_timeout_secs: args.request_timeout_secs,
            metrics_port: args.metrics_port,
        }
    }
}

async fn run_metrics_server(port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics::metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  api_base_url: {}", app_config.api_base_url);
    info!("  poll_interval_secs: {}", app_config.poll_interval_secs);
    info!("  request_timeout_secs: {}", app_config.request_timeout_secs);
    if app_config.auth_token.is_none() {
        warn!("No auth token configured, requests will be anonymous");
    }

    let shutdown_token = CancellationToken::new();

    if let Some(port) = app_config.metrics_port {
        info!("Initializing metrics...");
        metrics::init_metrics();

        let token = shutdown_token.clone();
        tokio::spawn(async move {
            info!("Metrics available at port {}!", port);
            if let Err(e) = run_metrics_server(port, token).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let transport: Arc<dyn NotificationTransport> = Arc::new(HttpTransport::new(
        app_config.api_base_url.clone(),
        app_config.request_timeout(),
        app_config.auth_token.clone(),
    )?);
    let center = NotificationCenter::new(transport, app_config.sync_settings());

    let mut last_seen = None;
    let listener = center.subscribe_with(move |snapshot| {
        let summary = (snapshot.unread_count, snapshot.notifications.len(), snapshot.error);
        if last_seen == Some(summary) {
            return;
        }
        last_seen = Some(summary);

        match snapshot.error {
            Some(kind) => warn!(
                unread = snapshot.unread_count,
                total = snapshot.notifications.len(),
                error = %kind,
                "Notifications updated with sync error"
            ),
            None => info!(
                unread = snapshot.unread_count,
                total = snapshot.notifications.len(),
                "Notifications updated"
            ),
        }
    });

    let poller = center.start_polling(&shutdown_token);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating graceful shutdown");

    shutdown_token.cancel();
    poller.shutdown().await;
    listener.unsubscribe();

    Ok(())
}
