use std::{
    net::Ipv4Addr,
    sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard},
};

use regex::Regex;
use thiserror::Error;

use crate::{
    data_aquisition::core::SnmpTransport,
    network::node::{Node, SharedNode},
    parsers::ldp_parser::{LdpEngine, LdpError},
};

/// Hostname pattern of devices that are recorded but never expanded.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    pattern: Option<Regex>,
}

impl ExclusionFilter {
    pub const DEFAULT_PATTERN: &'static str = "^.+-shadow-.+$";

    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern: Some(pattern),
        }
    }

    /// Excludes nothing.
    pub fn none() -> Self {
        Self { pattern: None }
    }

    pub fn is_excluded(&self, hostname: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(hostname))
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        match Regex::new(Self::DEFAULT_PATTERN) {
            Ok(re) => Self::new(re),
            Err(_) => Self::none(),
        }
    }
}

/// What a successful discovery contributes to the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The hostname matched the exclusion filter; nothing to expand.
    Excluded,
    /// Remote addresses of every adjacency found.
    Expanded(Vec<Ipv4Addr>),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{address} is unreachable: {source}")]
    Unreachable {
        address: Ipv4Addr,
        source: LdpError,
    },
    #[error("could not resolve adjacencies of {address}: {source}")]
    Adjacency {
        address: Ipv4Addr,
        source: LdpError,
    },
}

fn read(node: &SharedNode) -> RwLockReadGuard<'_, Node> {
    node.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(node: &SharedNode) -> RwLockWriteGuard<'_, Node> {
    node.write().unwrap_or_else(PoisonError::into_inner)
}

/// Queries one node at a time and fills in its hostname and adjacencies.
pub struct Discoverer<T> {
    engine: LdpEngine<T>,
    exclusion: ExclusionFilter,
}

impl<T: SnmpTransport> Discoverer<T> {
    pub fn new(engine: LdpEngine<T>, exclusion: ExclusionFilter) -> Self {
        Self { engine, exclusion }
    }

    pub async fn discover(&mut self, node: &SharedNode) -> Result<Discovery, DiscoveryError> {
        let (address, community) = {
            let node = read(node);
            (node.address(), node.community.clone())
        };

        self.engine
            .retarget(address, &community)
            .await
            .map_err(|source| DiscoveryError::Unreachable { address, source })?;

        // a node without a readable sysName is still expanded, it just cannot be excluded
        let hostname = match self.engine.hostname().await {
            Ok(hostname) => {
                write(node).set_hostname(hostname.clone());
                Some(hostname)
            }
            Err(e) => {
                tracing::warn!(%address, error = %e, "Could not read hostname");
                None
            }
        };

        if let Some(hostname) = hostname.as_deref().filter(|h| self.exclusion.is_excluded(h)) {
            tracing::info!(%address, %hostname, "Excluded, not expanding");
            return Ok(Discovery::Excluded);
        }

        let edges = self
            .engine
            .adjacencies()
            .await
            .map_err(|source| DiscoveryError::Adjacency { address, source })?;
        let remotes: Vec<Ipv4Addr> = edges.iter().map(|edge| edge.remote).collect();
        tracing::info!(%address, ?hostname, adjacencies = remotes.len(), "Discovered");

        write(node).add_all(edges);
        Ok(Discovery::Expanded(remotes))
    }
}
