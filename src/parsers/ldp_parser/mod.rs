/*!
LDP adjacency resolution over SNMP.

This module defines:
- `LdpEngine`: a session bound to one router at a time, with scalar GET, column walk,
  hostname lookup and adjacency resolution.
- `Personality`: the vendor family found by the sysDescr lookup, which selects the
  resolution algorithm (`juniper` reads adjacencies straight from a table, `cisco`
  correlates four tables and routing data).
- `interfaces`: ifDescr/ifHighSpeed enrichment applied to resolved edges.
*/

mod cisco;
mod interfaces;
mod juniper;
pub mod oids;

use std::net::{Ipv4Addr, SocketAddr};

use snmp2::Oid;
use thiserror::Error;

use crate::{
    data_aquisition::{
        core::{SnmpTableRow, SnmpTransport, SnmpValue, Varbind, oid_from},
        snmp::SnmpClientError,
    },
    network::edge::Edge,
};

/// Vendor families with a known way of exposing LDP adjacencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// Hello adjacency table carries peer address and ifIndex directly.
    Juniper,
    /// Adjacencies must be correlated from session, entity and routing tables.
    Cisco,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Personality {
    Known(Vendor),
    /// sysDescr matched no known vendor; kept for logging.
    Unknown(String),
}

impl Personality {
    pub fn from_sys_descr(descr: &str) -> Self {
        if descr.starts_with(oids::CISCO_DESCR) {
            Personality::Known(Vendor::Cisco)
        } else if descr.starts_with(oids::JUNIPER_DESCR) {
            Personality::Known(Vendor::Juniper)
        } else {
            Personality::Unknown(descr.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum LdpError {
    #[error("{address} did not answer the sysDescr lookup: {source}")]
    Unreachable {
        address: Ipv4Addr,
        source: SnmpClientError,
    },
    #[error("{address} has unknown architecture ({descr})")]
    UnknownArchitecture { address: Ipv4Addr, descr: String },
    #[error("engine has no target")]
    NotTargeted,
    #[error("walking {table} failed: {source}")]
    WalkFailed {
        table: &'static str,
        source: SnmpClientError,
    },
    #[error("unexpected value {value} for {oid}")]
    UnexpectedValue { oid: String, value: SnmpValue },
    #[error(transparent)]
    Transport(#[from] SnmpClientError),
}

/// SNMP session to one router at a time, owned by a single discovery worker.
pub struct LdpEngine<T> {
    transport: T,
    port: u16,
    target: Option<Ipv4Addr>,
    community: String,
    personality: Option<Personality>,
}

impl<T: SnmpTransport> LdpEngine<T> {
    pub fn new(transport: T, port: u16) -> Self {
        Self {
            transport,
            port,
            target: None,
            community: String::new(),
            personality: None,
        }
    }

    pub fn target(&self) -> Option<Ipv4Addr> {
        self.target
    }

    pub fn community(&self) -> &str {
        &self.community
    }

    pub fn personality(&self) -> Option<&Personality> {
        self.personality.as_ref()
    }

    /// Points the session at a new router and classifies it.
    ///
    /// An unknown vendor is not an error here; only adjacency resolution refuses it.
    pub async fn retarget(&mut self, address: Ipv4Addr, community: &str) -> Result<&Personality, LdpError> {
        self.personality = None;
        self.target = Some(address);
        self.community = community.to_string();
        self.transport
            .open(SocketAddr::new(address.into(), self.port), community)
            .await?;

        let descr = match self.get_value(oids::SYS_DESCR).await {
            Ok(value) => value.as_text().unwrap_or_default().to_string(),
            Err(LdpError::Transport(source)) => {
                tracing::warn!(%address, error = %source, "sysDescr lookup timed out");
                return Err(LdpError::Unreachable { address, source });
            }
            Err(e) => return Err(e),
        };
        let personality = Personality::from_sys_descr(&descr);
        if let Personality::Unknown(_) = personality {
            tracing::warn!(%address, %descr, "Unknown hardware");
        }
        Ok(&*self.personality.insert(personality))
    }

    /// Combined GET of several scalars.
    pub async fn get_many(&mut self, oids: &[Oid<'static>]) -> Result<Vec<Varbind>, LdpError> {
        if self.target.is_none() {
            return Err(LdpError::NotTargeted);
        }
        Ok(self.transport.get_many(oids).await?)
    }

    pub async fn get_value(&mut self, arcs: &[u64]) -> Result<SnmpValue, LdpError> {
        let oid = oid_from(arcs, &[])?;
        let value = self
            .get_many(std::slice::from_ref(&oid))
            .await?
            .into_iter()
            .next()
            .map(|varbind| varbind.value)
            .unwrap_or(SnmpValue::Missing);
        Ok(value)
    }

    pub async fn get_string(&mut self, arcs: &[u64]) -> Result<String, LdpError> {
        match self.get_value(arcs).await? {
            SnmpValue::OctetString(s) => Ok(s),
            value => Err(unexpected(arcs, value)),
        }
    }

    pub async fn get_integer(&mut self, arcs: &[u64]) -> Result<i64, LdpError> {
        let value = self.get_value(arcs).await?;
        value.as_i64().ok_or_else(|| unexpected(arcs, value))
    }

    /// Walks a single column and returns its rows keyed by index.
    pub async fn walk(&mut self, column: &[u64], table: &'static str) -> Result<Vec<SnmpTableRow>, LdpError> {
        if self.target.is_none() {
            return Err(LdpError::NotTargeted);
        }
        let oid = oid_from(column, &[])?;
        let varbinds = self
            .transport
            .walk(&oid)
            .await
            .map_err(|source| LdpError::WalkFailed { table, source })?;
        Ok(SnmpTableRow::group_into_rows(varbinds, column))
    }

    /// sysName of the current target.
    pub async fn hostname(&mut self) -> Result<String, LdpError> {
        self.get_string(oids::SYS_NAME).await
    }

    /// Resolves the LDP adjacencies of the current target and enriches them with
    /// interface names and speeds.
    pub async fn adjacencies(&mut self) -> Result<Vec<Edge>, LdpError> {
        let address = self.target.ok_or(LdpError::NotTargeted)?;
        let vendor = match &self.personality {
            Some(Personality::Known(vendor)) => *vendor,
            Some(Personality::Unknown(descr)) => {
                return Err(LdpError::UnknownArchitecture {
                    address,
                    descr: descr.clone(),
                });
            }
            None => return Err(LdpError::NotTargeted),
        };

        tracing::debug!(%address, ?vendor, "Retrieving adjacencies");
        let mut edges = match vendor {
            Vendor::Juniper => juniper::direct_table_adjacencies(self).await?,
            Vendor::Cisco => cisco::correlated_adjacencies(self).await?,
        };

        if let Err(e) = interfaces::enrich(self, &mut edges).await {
            tracing::warn!(%address, error = %e, "Could not retrieve interface names");
        }
        Ok(edges)
    }
}

fn unexpected(arcs: &[u64], value: SnmpValue) -> LdpError {
    let oid = arcs.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
    LdpError::UnexpectedValue { oid, value }
}
