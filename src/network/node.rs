use std::{
    collections::HashMap,
    fmt::Display,
    net::Ipv4Addr,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::network::edge::Edge;

pub const DEFAULT_COMMUNITY: &str = "public";

/// A node that is shared between the frontier and the worker processing it.
pub type SharedNode = Arc<RwLock<Node>>;

/// One discovered router and the adjacencies it reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    address: Ipv4Addr,
    pub community: String,
    hostname: Option<String>,
    edges: HashMap<Ipv4Addr, Edge>,
}

impl Node {
    pub fn new(address: Ipv4Addr) -> Self {
        Self::with_community(address, DEFAULT_COMMUNITY)
    }

    pub fn with_community(address: Ipv4Addr, community: &str) -> Self {
        Self {
            address,
            community: community.to_string(),
            hostname: None,
            edges: HashMap::new(),
        }
    }

    pub fn shared(self) -> SharedNode {
        Arc::new(RwLock::new(self))
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Records the resolved hostname. Only the first resolution is kept.
    pub fn set_hostname(&mut self, hostname: String) {
        match &self.hostname {
            Some(existing) if existing != &hostname => {
                tracing::warn!(address = %self.address, %existing, ignored = %hostname, "Hostname already resolved");
            }
            Some(_) => {}
            None => self.hostname = Some(hostname),
        }
    }

    /// Returns the edge that was replaced, if any.
    pub fn add_edge(&mut self, edge: Edge) -> Option<Edge> {
        let remote = edge.remote;
        let replaced = self.edges.insert(remote, edge);
        if replaced.is_some() {
            tracing::warn!(address = %self.address, %remote, "Adjacency already exists, replacing it");
        }
        replaced
    }

    /// Merges a freshly resolved adjacency set; later entries win on collision.
    ///
    /// Returns how many existing edges were replaced.
    pub fn add_all(&mut self, edges: impl IntoIterator<Item = Edge>) -> usize {
        edges
            .into_iter()
            .filter_map(|edge| self.add_edge(edge))
            .count()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, remote: &Ipv4Addr) -> Option<&Edge> {
        self.edges.get(remote)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node[{}, community: {}, hostname: {}",
            self.address,
            self.community,
            self.hostname.as_deref().unwrap_or("unknown")
        )?;
        for (remote, edge) in &self.edges {
            write!(f, "\n [{remote}] -> ({edge})")?;
        }
        write!(f, "]")
    }
}
