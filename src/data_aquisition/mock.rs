//! In-memory SNMP agents for tests.

use std::{
    collections::{BTreeMap, HashMap},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use snmp2::Oid;

use super::{
    core::{SnmpTransport, SnmpValue, Varbind, oid_arcs, oid_from},
    snmp::SnmpClientError,
};
use crate::{
    network::ip::ipv4_arcs,
    parsers::ldp_parser::oids,
};

fn join(parts: &[Vec<u64>]) -> Vec<u64> {
    parts.concat()
}

fn ldp_id(address: Ipv4Addr) -> Vec<u64> {
    let mut arcs = ipv4_arcs(address).to_vec();
    arcs.extend([0, 0]);
    arcs
}

/// One simulated agent: a sorted OID table plus OID prefixes that never answer.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    values: BTreeMap<Vec<u64>, SnmpValue>,
    silent: Vec<Vec<u64>>,
}

impl MockDevice {
    pub fn new(descr: &str, hostname: &str) -> Self {
        Self::default()
            .with(oids::SYS_DESCR, SnmpValue::OctetString(descr.to_string()))
            .with(oids::SYS_NAME, SnmpValue::OctetString(hostname.to_string()))
    }

    pub fn juniper(hostname: &str) -> Self {
        Self::new("Juniper Networks, Inc. mx480 internet router", hostname)
    }

    pub fn cisco(hostname: &str) -> Self {
        Self::new("Cisco IOS Software, 7600 Software", hostname)
    }

    pub fn with(mut self, arcs: &[u64], value: SnmpValue) -> Self {
        self.values.insert(arcs.to_vec(), value);
        self
    }

    pub fn without(mut self, arcs: &[u64]) -> Self {
        self.values.remove(arcs);
        self
    }

    /// Requests touching `prefix` time out.
    pub fn silent_on(mut self, prefix: &[u64]) -> Self {
        self.silent.push(prefix.to_vec());
        self
    }

    pub fn interface(self, if_index: u32, name: &str, speed_mbps: u32) -> Self {
        let index = vec![u64::from(if_index)];
        self.with(&join(&[oids::IF_DESCR.to_vec(), index.clone()]), SnmpValue::OctetString(name.to_string()))
            .with(&join(&[oids::IF_HIGH_SPEED.to_vec(), index]), SnmpValue::Unsigned32(speed_mbps))
    }

    pub fn juniper_adjacency(self, local: Ipv4Addr, peer: Ipv4Addr, if_index: u32, adj_type: i64) -> Self {
        let arcs = join(&[
            oids::JNX_LDP_HELLO_ADJ_TYPE.to_vec(),
            ldp_id(local),
            vec![1],
            ldp_id(peer),
            vec![u64::from(if_index)],
        ]);
        self.with(&arcs, SnmpValue::Integer(adj_type))
    }

    pub fn ldp_session(self, local: Ipv4Addr, link: Ipv4Addr, peer: Ipv4Addr, state: i64) -> Self {
        let arcs = join(&[
            oids::MPLS_LDP_SES_STATE.to_vec(),
            ldp_id(local),
            vec![u64::from(u32::from(link))],
            ldp_id(peer),
        ]);
        self.with(&arcs, SnmpValue::Integer(state))
    }

    pub fn targeted_peer(self, local: Ipv4Addr, link: Ipv4Addr, truth: i64) -> Self {
        let arcs = join(&[
            oids::MPLS_LDP_ENTITY_TARGETED_PEER.to_vec(),
            ldp_id(local),
            vec![u64::from(u32::from(link))],
        ]);
        self.with(&arcs, SnmpValue::Integer(truth))
    }

    pub fn conf_if_index(self, local: Ipv4Addr, link: Ipv4Addr, if_index: i64) -> Self {
        let arcs = join(&[
            oids::MPLS_LDP_ENTITY_CONF_IF_INDEX.to_vec(),
            ldp_id(local),
            vec![u64::from(u32::from(link))],
        ]);
        self.with(&arcs, SnmpValue::Integer(if_index))
    }

    pub fn route(self, destination: Ipv4Addr, next_hop: Ipv4Addr, metric: i64, if_index: i64) -> Self {
        let dest = ipv4_arcs(destination).to_vec();
        self.with(&join(&[oids::IP_ROUTE_NEXT_HOP.to_vec(), dest.clone()]), SnmpValue::IpAddress(next_hop))
            .with(&join(&[oids::IP_ROUTE_METRIC1.to_vec(), dest.clone()]), SnmpValue::Integer(metric))
            .with(&join(&[oids::IP_ROUTE_IF_INDEX.to_vec(), dest]), SnmpValue::Integer(if_index))
    }

    fn is_silent(&self, arcs: &[u64]) -> bool {
        self.silent
            .iter()
            .any(|prefix| arcs.starts_with(prefix) || prefix.starts_with(arcs))
    }
}

/// A set of simulated agents keyed by address. Unknown addresses never answer.
#[derive(Debug, Default)]
pub struct MockNetwork {
    devices: HashMap<Ipv4Addr, MockDevice>,
    pub get_requests: AtomicUsize,
    pub walks: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(mut self, address: Ipv4Addr, device: MockDevice) -> Self {
        self.devices.insert(address, device);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn transport(self: &Arc<Self>) -> MockTransport {
        MockTransport {
            network: Arc::clone(self),
            current: None,
        }
    }
}

pub struct MockTransport {
    network: Arc<MockNetwork>,
    current: Option<Ipv4Addr>,
}

impl MockTransport {
    fn device(&self) -> Result<&MockDevice, SnmpClientError> {
        let address = self.current.ok_or(SnmpClientError::NoSession)?;
        self.network.devices.get(&address).ok_or(SnmpClientError::Timeout)
    }
}

#[async_trait]
impl SnmpTransport for MockTransport {
    async fn open(&mut self, target: SocketAddr, _community: &str) -> Result<(), SnmpClientError> {
        self.current = match target.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        };
        Ok(())
    }

    async fn get_many(&mut self, oids: &[Oid<'static>]) -> Result<Vec<Varbind>, SnmpClientError> {
        self.network.get_requests.fetch_add(1, Ordering::SeqCst);
        let device = self.device()?;
        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            let arcs = oid_arcs(oid)?;
            if device.is_silent(&arcs) {
                return Err(SnmpClientError::Timeout);
            }
            let value = device.values.get(&arcs).cloned().unwrap_or(SnmpValue::Missing);
            out.push(Varbind::new(oid.clone(), value));
        }
        Ok(out)
    }

    async fn walk(&mut self, column: &Oid<'static>) -> Result<Vec<Varbind>, SnmpClientError> {
        self.network.walks.fetch_add(1, Ordering::SeqCst);
        let device = self.device()?;
        let prefix = oid_arcs(column)?;
        if device.is_silent(&prefix) {
            return Err(SnmpClientError::Timeout);
        }
        device
            .values
            .range(prefix.clone()..)
            .take_while(|(arcs, _)| arcs.starts_with(&prefix))
            .map(|(arcs, value)| Ok(Varbind::new(oid_from(arcs, &[])?, value.clone())))
            .collect()
    }
}
