/*!
Topology crawl

This module ties the crawl together: a shared frontier, a pool of discovery workers and
a supervisor that decides when the crawl is over.

Structure:
- `store`: the deduplicated frontier (`FrontierStore`) all workers share.
- `discoverer`: queries one router and merges its adjacencies (`Discoverer`).
- `worker`: the per-task loop around a `Discoverer` (`Worker`).
- `status`: worker counters, termination and the stop signal (`StatusAggregator`).
- `report`: graph built from the finished crawl, and its text/JSON rendering.
*/

pub mod discoverer;
pub mod report;
pub mod status;
pub mod store;
pub mod worker;

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use tokio::task::JoinSet;

use crate::{
    config::{ConfigError, CrawlConfig},
    data_aquisition::core::SnmpTransport,
    network::node::Node,
    parsers::ldp_parser::LdpEngine,
};

use discoverer::{Discoverer, ExclusionFilter};
use status::{CrawlOutcome, StatusAggregator};
use store::FrontierStore;
use worker::Worker;

pub use report::TopologyGraph;

/// Runtime knobs of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub community: String,
    pub workers: usize,
    pub poll_interval: Duration,
    pub status_interval: Duration,
    pub status_log_every: u32,
    pub exclusion: ExclusionFilter,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            community: config.community.clone(),
            workers: config.workers,
            poll_interval: config.poll_interval(),
            status_interval: config.status_interval(),
            status_log_every: config.status_log_every,
            exclusion: config.exclusion_filter()?,
        })
    }
}

#[derive(Debug)]
pub struct CrawlResult {
    pub outcome: CrawlOutcome,
    /// Every registered node, in registration order.
    pub nodes: Vec<Node>,
}

/// Crawls the LDP topology reachable from `seed`.
///
/// `engine_for` builds the protocol engine of each worker, given the worker id.
pub async fn crawl<T, F>(seed: Ipv4Addr, settings: &CrawlSettings, mut engine_for: F) -> CrawlResult
where
    T: SnmpTransport + 'static,
    F: FnMut(usize) -> LdpEngine<T>,
{
    let frontier = Arc::new(FrontierStore::new());
    frontier.try_register(Node::with_community(seed, &settings.community).shared());

    let status = Arc::new(StatusAggregator::new(
        settings.status_interval,
        settings.status_log_every,
    ));

    tracing::info!(%seed, workers = settings.workers, "Starting crawl");
    let mut workers = JoinSet::new();
    for id in 0..settings.workers.max(1) {
        let discoverer = Discoverer::new(engine_for(id), settings.exclusion.clone());
        let worker = Worker::new(
            id,
            discoverer,
            Arc::clone(&frontier),
            status.clone(),
            status.stop_listener(),
            &settings.community,
        )
        .with_poll_interval(settings.poll_interval);
        workers.spawn(worker.run());
    }

    let outcome = status.supervise(&frontier).await;

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Worker task failed");
        }
    }

    CrawlResult {
        outcome,
        nodes: frontier.snapshot_data(),
    }
}
