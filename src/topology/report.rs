/*!
Turns the crawl result into the printed topology.

This module defines:
- `TopologyGraph`: a directed graph of discovered routers. Adjacencies pointing at excluded
  (shadow) routers, or at addresses that were never registered, are left out.
- Text rendering in the line-oriented `addr:remote:interface:speed` format, and JSON rendering.
*/

use std::{collections::HashMap, fmt::Write, net::Ipv4Addr, time::SystemTime};

use petgraph::{Directed, graph::NodeIndex, prelude::StableGraph};
use serde::Serialize;

use crate::network::node::Node;

use super::discoverer::ExclusionFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub address: Ipv4Addr,
    pub hostname: Option<String>,
    pub excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeSummary {
    pub remote: Ipv4Addr,
    pub interface: Option<String>,
    /// kb/s, as printed
    pub speed_kbps: u64,
}

#[derive(Debug, Serialize)]
struct JsonNode<'a> {
    #[serde(flatten)]
    node: &'a NodeSummary,
    edges: Vec<&'a EdgeSummary>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated: String,
    nodes: Vec<JsonNode<'a>>,
}

pub struct TopologyGraph {
    graph: StableGraph<NodeSummary, EdgeSummary, Directed>,
    /// registration order, which is the print order
    order: Vec<NodeIndex>,
}

impl TopologyGraph {
    pub fn build(nodes: Vec<Node>, exclusion: &ExclusionFilter) -> Self {
        let mut graph = StableGraph::new();
        let mut order = Vec::with_capacity(nodes.len());
        let mut index_map: HashMap<Ipv4Addr, NodeIndex> = HashMap::with_capacity(nodes.len());

        for node in &nodes {
            let summary = NodeSummary {
                address: node.address(),
                hostname: node.hostname().map(str::to_string),
                excluded: node.hostname().is_some_and(|h| exclusion.is_excluded(h)),
            };
            let index = graph.add_node(summary);
            index_map.insert(node.address(), index);
            order.push(index);
        }

        for node in &nodes {
            let Some(&source) = index_map.get(&node.address()) else {
                continue;
            };
            let mut edges: Vec<_> = node.edges().collect();
            edges.sort_by_key(|edge| edge.remote);
            for edge in edges {
                let Some(&target) = index_map.get(&edge.remote) else {
                    tracing::debug!(address = %node.address(), remote = %edge.remote, "Adjacency to unknown node dropped");
                    continue;
                };
                if graph[target].excluded {
                    continue;
                }
                graph.add_edge(
                    source,
                    target,
                    EdgeSummary {
                        remote: edge.remote,
                        interface: edge.interface.clone(),
                        speed_kbps: edge.speed.saturating_mul(1000),
                    },
                );
            }
        }

        Self { graph, order }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSummary> {
        self.order.iter().map(|index| &self.graph[*index])
    }

    /// Outgoing adjacencies of `index`, sorted by remote address.
    fn edges_of(&self, index: NodeIndex) -> Vec<&EdgeSummary> {
        let mut edges: Vec<&EdgeSummary> = self.graph.edges(index).map(|edge| edge.weight()).collect();
        edges.sort_by_key(|edge| edge.remote);
        edges
    }

    pub fn edges_from(&self, address: Ipv4Addr) -> Vec<&EdgeSummary> {
        self.order
            .iter()
            .find(|index| self.graph[**index].address == address)
            .map(|index| self.edges_of(*index))
            .unwrap_or_default()
    }

    pub fn render_text(&self, generated: SystemTime) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Topology output");
        let _ = writeln!(out, "# {}", humantime::format_rfc3339_seconds(generated));

        let _ = writeln!(out, "# HOSTNAME");
        for node in self.nodes() {
            let _ = writeln!(out, "# {}:{}", node.address, hostname_or_unknown(node));
        }
        let _ = writeln!(out, "# ");

        let _ = writeln!(out, "# DATA");
        for index in &self.order {
            let node = &self.graph[*index];
            let _ = writeln!(out, "# {} ({})", node.address, hostname_or_unknown(node));
            for edge in self.edges_of(*index) {
                let _ = writeln!(
                    out,
                    "{}:{}:{}:{}",
                    node.address,
                    edge.remote,
                    edge.interface.as_deref().unwrap_or("null"),
                    edge.speed_kbps
                );
            }
        }
        out
    }

    pub fn render_json(&self, generated: SystemTime) -> serde_json::Result<String> {
        let report = JsonReport {
            generated: humantime::format_rfc3339_seconds(generated).to_string(),
            nodes: self
                .order
                .iter()
                .map(|index| JsonNode {
                    node: &self.graph[*index],
                    edges: self.edges_of(*index),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&report)
    }
}

fn hostname_or_unknown(node: &NodeSummary) -> &str {
    node.hostname.as_deref().unwrap_or("unknown")
}
