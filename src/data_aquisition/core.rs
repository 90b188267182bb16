use std::{fmt::Display, net::{Ipv4Addr, SocketAddr}};

use async_trait::async_trait;
use snmp2::{Oid, Value};

use super::snmp::SnmpClientError;

/// One (OID, value) pair returned by a device, detached from the response buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Varbind {
    pub oid: Oid<'static>,
    pub value: SnmpValue,
}

impl Varbind {
    pub fn new(oid: Oid<'static>, value: SnmpValue) -> Self {
        Self { oid, value }
    }

    /// Arcs of the OID that follow `prefix`, or `None` if the OID is outside of it.
    pub fn index_after(&self, prefix: &[u64]) -> Option<Vec<u64>> {
        let arcs = oid_arcs(&self.oid).ok()?;
        if arcs.len() < prefix.len() || &arcs[..prefix.len()] != prefix {
            return None;
        }
        Some(arcs[prefix.len()..].to_vec())
    }
}

/// Owned replacement for `snmp2::Value`, which borrows from the session buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    IpAddress(Ipv4Addr),
    OctetString(String),
    Counter32(u32),
    Counter64(u64),
    Timeticks(u32),
    Boolean(bool),
    // Gauge32 lands here as well
    Unsigned32(u32),
    /// noSuchObject, noSuchInstance or endOfMibView
    Missing,
    Unknown,
}

impl SnmpValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(i) => Some(*i),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                Some(i64::from(*v))
            }
            SnmpValue::Counter64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(i) => u64::try_from(*i).ok(),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                Some(u64::from(*v))
            }
            SnmpValue::Counter64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            SnmpValue::IpAddress(ip) => Some(*ip),
            SnmpValue::OctetString(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SnmpValue::OctetString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SnmpValue::Missing)
    }
}

impl From<&Value<'_>> for SnmpValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Integer(i) => SnmpValue::Integer(*i),
            Value::IpAddress(ip) => SnmpValue::IpAddress(Ipv4Addr::from(*ip)),
            Value::OctetString(s) => SnmpValue::OctetString(String::from_utf8_lossy(s).to_string()),
            Value::Counter32(c) => SnmpValue::Counter32(*c),
            Value::Counter64(c) => SnmpValue::Counter64(*c),
            Value::Timeticks(t) => SnmpValue::Timeticks(*t),
            Value::Boolean(b) => SnmpValue::Boolean(*b),
            Value::Unsigned32(u) => SnmpValue::Unsigned32(*u),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => SnmpValue::Missing,
            _ => SnmpValue::Unknown,
        }
    }
}

impl Display for SnmpValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnmpValue::Integer(i) => write!(f, "{i}"),
            SnmpValue::IpAddress(ip) => write!(f, "{ip}"),
            SnmpValue::OctetString(s) => write!(f, "{s}"),
            SnmpValue::Counter32(v) | SnmpValue::Unsigned32(v) | SnmpValue::Timeticks(v) => {
                write!(f, "{v}")
            }
            SnmpValue::Counter64(v) => write!(f, "{v}"),
            SnmpValue::Boolean(b) => write!(f, "{b}"),
            SnmpValue::Missing => write!(f, "<missing>"),
            SnmpValue::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// A single-column table row: the index arcs that follow the column OID, and the cell value.
#[derive(Debug, Clone, PartialEq)]
pub struct SnmpTableRow {
    pub index: Vec<u64>,
    pub value: SnmpValue,
}

impl SnmpTableRow {
    /// Turns the result of a column walk into rows, dropping anything outside the column.
    pub fn group_into_rows(varbinds: Vec<Varbind>, column: &[u64]) -> Vec<SnmpTableRow> {
        varbinds
            .into_iter()
            .filter_map(|varbind| {
                let index = varbind.index_after(column)?;
                Some(SnmpTableRow {
                    index,
                    value: varbind.value,
                })
            })
            .collect()
    }

    /// Reads one index arc as a 32-bit value.
    pub fn index_u32(&self, position: usize) -> Option<u32> {
        self.index.get(position).and_then(|arc| u32::try_from(*arc).ok())
    }
}

/// Splits an OID into its numeric arcs.
pub fn oid_arcs(oid: &Oid<'_>) -> Result<Vec<u64>, SnmpClientError> {
    Ok(oid.iter().ok_or(SnmpClientError::OidParseError)?.collect())
}

/// Builds an OID from a column prefix followed by an index.
pub fn oid_from(prefix: &[u64], index: &[u64]) -> Result<Oid<'static>, SnmpClientError> {
    let arcs: Vec<u64> = prefix.iter().chain(index.iter()).copied().collect();
    Oid::from(&arcs).map_err(|_| SnmpClientError::OidParseError)
}

/// A request/response channel to one SNMP agent at a time.
///
/// The protocol engine only ever needs scalar GETs and column walks, so that is all a
/// transport has to provide. Each discovery worker owns its own transport.
#[async_trait]
pub trait SnmpTransport: Send {
    /// Binds the transport to a new agent. Any previous session is dropped.
    async fn open(&mut self, target: SocketAddr, community: &str) -> Result<(), SnmpClientError>;

    /// Fetches several scalars in one combined request. Values come back in request order.
    async fn get_many(&mut self, oids: &[Oid<'static>]) -> Result<Vec<Varbind>, SnmpClientError>;

    /// Returns every varbind below `column`, in lexicographic order.
    async fn walk(&mut self, column: &Oid<'static>) -> Result<Vec<Varbind>, SnmpClientError>;
}
