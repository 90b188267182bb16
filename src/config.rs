//! Crawl configuration.
//!
//! Values come from built-in defaults, an optional `mpls-topology.toml`, then
//! `MPLS_TOPOLOGY__*` environment variables. The binary applies command line overrides last.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    data_aquisition::snmp::{DEFAULT_TIMEOUT, DEFAULT_UDP_PORT},
    network::node::DEFAULT_COMMUNITY,
    topology::{discoverer::ExclusionFilter, worker::DEFAULT_POLL_INTERVAL},
};

pub const DEFAULT_CONFIG_PREFIX: &str = "mpls-topology";
pub const ENV_PREFIX: &str = "MPLS_TOPOLOGY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
}

impl From<SnmpVersion> for snmp2::Version {
    fn from(version: SnmpVersion) -> Self {
        match version {
            SnmpVersion::V1 => snmp2::Version::V1,
            SnmpVersion::V2c => snmp2::Version::V2C,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("could not resolve seed {seed}: {reason}")]
    SeedResolution { seed: String, reason: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Address or hostname the crawl starts from.
    #[serde(default = "default_seed")]
    pub seed: String,

    #[serde(default = "default_community")]
    pub community: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub version: SnmpVersion,

    /// Number of discovery workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request SNMP timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Back-off of an idle worker.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Supervisor tick.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    /// Log the worker counters every this many ticks.
    #[serde(default = "default_status_log_every")]
    pub status_log_every: u32,

    /// Hostnames matching this are recorded but neither expanded nor reported as neighbors.
    #[serde(default = "default_exclude_pattern")]
    pub exclude_pattern: String,

    #[serde(default)]
    pub format: ReportFormat,
}

fn default_seed() -> String {
    "1.1.1.1".to_string()
}

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_workers() -> usize {
    2
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_status_interval_ms() -> u64 {
    1000
}

fn default_status_log_every() -> u32 {
    3
}

fn default_exclude_pattern() -> String {
    ExclusionFilter::DEFAULT_PATTERN.to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            community: default_community(),
            port: default_port(),
            version: SnmpVersion::default(),
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
            status_log_every: default_status_log_every(),
            exclude_pattern: default_exclude_pattern(),
            format: ReportFormat::default(),
        }
    }
}

impl CrawlConfig {
    /// Reads `<file_prefix>.{toml,json,yaml,...}` if present, then the environment.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(invalid("workers", "at least one worker is needed"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be positive"));
        }
        if self.status_interval_ms == 0 {
            return Err(invalid("status_interval_ms", "must be positive"));
        }
        if self.seed.trim().is_empty() {
            return Err(invalid("seed", "empty"));
        }
        Regex::new(&self.exclude_pattern)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn exclusion_filter(&self) -> Result<ExclusionFilter, ConfigError> {
        Ok(ExclusionFilter::new(Regex::new(&self.exclude_pattern)?))
    }

    /// Seed as an IPv4 address, resolving a hostname if needed.
    pub async fn resolve_seed(&self) -> Result<Ipv4Addr, ConfigError> {
        let seed = self.seed.trim();
        if let Ok(address) = seed.parse::<Ipv4Addr>() {
            return Ok(address);
        }

        let resolved = tokio::net::lookup_host((seed, self.port))
            .await
            .map_err(|e| ConfigError::SeedResolution {
                seed: seed.to_string(),
                reason: e.to_string(),
            })?
            .find_map(|addr| match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            });
        resolved.ok_or_else(|| ConfigError::SeedResolution {
            seed: seed.to_string(),
            reason: "no IPv4 address".to_string(),
        })
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}
