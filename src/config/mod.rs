mod file_config;

pub use file_config::{FileConfig, MetricsConfig};

use anyhow::{bail, Result};
use std::time::Duration;

use crate::sync::SyncSettings;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub api_base_url: Option<String>,
    pub auth_token: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,

    /// Port of the Prometheus endpoint, `None` when metrics are disabled.
    pub metrics_port: Option<u16>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let api_base_url = file
            .api_base_url
            .or_else(|| cli.api_base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("api_base_url must be specified via --api-base-url or in config file")
            })?;

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            bail!("api_base_url must be an http(s) URL: {}", api_base_url);
        }

        let auth_token = file.auth_token.or_else(|| cli.auth_token.clone());

        let poll_interval_secs = file.poll_interval_secs.unwrap_or(cli.poll_interval_secs);
        if poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }

        let request_timeout_secs = file
            .request_timeout_secs
            .unwrap_or(cli.request_timeout_secs);
        if request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }

        // [metrics] section takes precedence over --metrics-port
        let metrics_port = match file.metrics {
            Some(metrics) if metrics.enabled == Some(false) => None,
            Some(metrics) => metrics.port.or(cli.metrics_port),
            None => cli.metrics_port,
        };

        Ok(Self {
            api_base_url,
            auth_token,
            poll_interval_secs,
            request_timeout_secs,
            metrics_port,
        })
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
