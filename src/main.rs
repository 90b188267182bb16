use std::{process::ExitCode, time::SystemTime};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use mpls_topology::{
    config::{CrawlConfig, DEFAULT_CONFIG_PREFIX, ReportFormat, SnmpVersion},
    data_aquisition::snmp::SnmpClient,
    parsers::ldp_parser::LdpEngine,
    topology::{self, CrawlSettings, TopologyGraph, status::CrawlOutcome},
};

#[derive(Parser)]
#[command(name = "mpls-topology")]
#[command(about = "Crawls an MPLS network over SNMP and prints its LDP adjacencies")]
struct Cli {
    /// Seed router, as an IPv4 address or a hostname.
    seed: Option<String>,

    /// SNMP community used for every router.
    #[arg(short, long)]
    community: Option<String>,

    /// SNMP UDP port.
    #[arg(long)]
    port: Option<u16>,

    /// SNMP version: v1 or v2c.
    #[arg(long = "snmp-version", value_enum)]
    snmp_version: Option<SnmpVersion>,

    /// Number of parallel discovery workers.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-request timeout, e.g. "5s" or "800ms".
    #[arg(short, long)]
    timeout: Option<humantime::Duration>,

    /// Hostnames matching this regex are recorded but not crawled through.
    #[arg(long)]
    exclude: Option<String>,

    /// Report format.
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Config file prefix.
    #[arg(long, default_value = DEFAULT_CONFIG_PREFIX)]
    config: String,
}

impl Cli {
    fn apply(self, mut config: CrawlConfig) -> CrawlConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(community) = self.community {
            config.community = community;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(version) = self.snmp_version {
            config.version = version;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(exclude) = self.exclude {
            config.exclude_pattern = exclude;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // stdout carries the report only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = CrawlConfig::load(&cli.config)?;
    let config = cli.apply(config);
    config.validate()?;

    let seed = config.resolve_seed().await?;
    let settings = CrawlSettings::from_config(&config)?;

    let result = topology::crawl(seed, &settings, |_| {
        let client = SnmpClient::new(&config.community, config.version.into(), config.timeout());
        LdpEngine::new(client, config.port)
    })
    .await;

    match result.outcome {
        CrawlOutcome::BootstrapFailed => {
            tracing::error!(%seed, "Node specified could not be queried");
            return Ok(ExitCode::FAILURE);
        }
        CrawlOutcome::Exhausted { completed, errored } => {
            tracing::info!(nodes = result.nodes.len(), completed, errors = errored, "Topology complete");
        }
    }

    let graph = TopologyGraph::build(result.nodes, &settings.exclusion);
    let generated = SystemTime::now();
    match config.format {
        ReportFormat::Text => print!("{}", graph.render_text(generated)),
        ReportFormat::Json => println!("{}", graph.render_json(generated)?),
    }
    Ok(ExitCode::SUCCESS)
}
