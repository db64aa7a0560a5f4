//! Configuration for the stats server.
//!
//! Every option is a CLI flag with an environment variable fallback.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use stats_billing::upstream::DEFAULT_BASE_URL;
use stats_billing::{BillingError, UpstreamEndpoints};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Stats server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "stats-server")]
#[command(about = "Billing report proxy for the SiliconCloud stats dashboard")]
#[command(version)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "STATS_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "STATS_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Origin of the legacy billing API and key directory.
    #[arg(long, env = "STATS_LEGACY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub legacy_base_url: String,

    /// Origin of the tenant REST billing API.
    #[arg(long, env = "STATS_TENANT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub tenant_base_url: String,

    /// Log output format.
    #[arg(long, env = "STATS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Inbound request timeout in seconds.
    #[arg(long, env = "STATS_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Longest span accepted by the daily range report.
    #[arg(
        long,
        env = "STATS_MAX_RANGE_DAYS",
        default_value_t = 31,
        value_parser = clap::value_parser!(u32).range(1..=366)
    )]
    pub max_range_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            legacy_base_url: DEFAULT_BASE_URL.to_string(),
            tenant_base_url: DEFAULT_BASE_URL.to_string(),
            log_format: LogFormat::Pretty,
            request_timeout_secs: 60,
            max_range_days: 31,
        }
    }
}

impl Config {
    /// Socket address to bind.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Inbound request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed upstream endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if either base URL is invalid.
    pub fn endpoints(&self) -> Result<UpstreamEndpoints, BillingError> {
        UpstreamEndpoints::parse(&self.legacy_base_url, &self.tenant_base_url)
    }
}
