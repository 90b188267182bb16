use std::{fmt::Display, net::Ipv4Addr};

use serde::{Deserialize, Serialize};

/// One LDP adjacency seen from the local router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub remote: Ipv4Addr,
    /// ifDescr of the local interface, filled in by interface enrichment
    pub interface: Option<String>,
    /// ifHighSpeed of the local interface in Mb/s, 0 until enriched
    pub speed: u64,
    /// SNMP ifIndex of the local interface
    pub if_index: u32,
}

impl Edge {
    pub fn new(remote: Ipv4Addr, if_index: u32) -> Self {
        Self {
            remote,
            interface: None,
            speed: 0,
            if_index,
        }
    }

    pub fn set_interface(&mut self, name: String, speed: u64) {
        self.interface = Some(name);
        self.speed = speed;
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Edge[remote: {}, interface: {}, ifIndex: {}]",
            self.remote,
            self.interface.as_deref().unwrap_or("null"),
            self.if_index
        )
    }
}
