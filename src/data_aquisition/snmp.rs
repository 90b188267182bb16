use super::core::{SnmpTransport, SnmpValue, Varbind, oid_arcs};
use async_trait::async_trait;
use snmp2::{AsyncSession, MessageType, Oid, Version};
use std::{net::SocketAddr, time::Duration};
use thiserror::Error;

pub const DEFAULT_UDP_PORT: u16 = 161;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const BULK_REPETITIONS: u32 = 32;

/// SNMP client for retrieving data from one network device at a time.
pub struct SnmpClient {
    address: Option<SocketAddr>,
    community: String,
    snmp_version: Version,
    timeout: Duration,
    session: Option<AsyncSession>,
}

impl Default for SnmpClient {
    fn default() -> Self {
        Self::new("public", Version::V2C, DEFAULT_TIMEOUT)
    }
}

impl SnmpClient {
    /// Creates a client that is not yet bound to any agent.
    pub fn new(community: &str, snmp_version: Version, timeout: Duration) -> Self {
        Self {
            address: None,
            community: community.to_string(),
            snmp_version,
            timeout,
            session: None,
        }
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Retrieves the SNMP session for the current agent, opening it on first use.
    pub async fn get_session(&mut self) -> Result<&mut AsyncSession, SnmpClientError> {
        if self.session.is_none() {
            let address = self.address.ok_or(SnmpClientError::NoSession)?;
            let session = match self.snmp_version {
                Version::V1 => AsyncSession::new_v1(address, self.community.as_bytes(), 0).await,
                Version::V2C => AsyncSession::new_v2c(address, self.community.as_bytes(), 0).await,
                _ => return Err(SnmpClientError::UnsupportedVersion),
            };
            self.session = Some(session.map_err(SnmpClientError::IoError)?);
        }
        self.session.as_mut().ok_or(SnmpClientError::NoSession)
    }

    /// Start building a new query.
    pub async fn query(&mut self) -> Result<QueryBuilder<'_>, SnmpClientError> {
        let timeout = self.timeout;
        let session = self.get_session().await?;
        Ok(QueryBuilder {
            session,
            oids: Vec::new(),
            operation: None,
            timeout,
            non_repeaters: None,
            max_repetitions: None,
        })
    }
}

pub struct QueryBuilder<'a> {
    session: &'a mut AsyncSession,
    oids: Vec<Oid<'static>>,
    operation: Option<MessageType>,
    timeout: Duration,
    non_repeaters: Option<u32>,
    max_repetitions: Option<u32>,
}

impl QueryBuilder<'_> {
    pub fn get(mut self) -> Self {
        self.operation = Some(MessageType::GetRequest);
        self
    }

    pub fn get_next(mut self) -> Self {
        self.operation = Some(MessageType::GetNextRequest);
        self
    }

    pub fn get_bulk(mut self, non_repeaters: u32, max_repetitions: u32) -> Self {
        self.operation = Some(MessageType::GetBulkRequest);
        self.non_repeaters = Some(non_repeaters);
        self.max_repetitions = Some(max_repetitions);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn oid(mut self, oid: Oid<'static>) -> Self {
        self.oids.push(oid);
        self
    }

    pub fn oids(mut self, oids: impl IntoIterator<Item = Oid<'static>>) -> Self {
        self.oids.extend(oids);
        self
    }

    pub async fn execute(self) -> Result<Vec<Varbind>, SnmpClientError> {
        let operation = self.operation.ok_or(SnmpClientError::InvalidQuery)?;
        if self.oids.is_empty() {
            return Err(SnmpClientError::InvalidQuery);
        }
        let timeout = self.timeout;
        let session = self.session;

        match operation {
            MessageType::GetRequest => {
                let oid_refs: Vec<&Oid> = self.oids.iter().collect();
                let response = tokio::time::timeout(timeout, session.get_many(&oid_refs))
                    .await
                    .map_err(|_| SnmpClientError::Timeout)?
                    .map_err(SnmpClientError::Snmp2Error)?;
                if response.error_status != 0 {
                    return Err(SnmpClientError::ErrorStatus(response.error_status));
                }
                let varbinds = owned_varbinds(response.varbinds);
                if !answers_request(&self.oids, &varbinds) {
                    return Err(SnmpClientError::UnexpectedResponse);
                }
                Ok(varbinds)
            }
            MessageType::GetNextRequest => {
                if self.oids.len() != 1 {
                    return Err(SnmpClientError::MultipleOidsOnGet);
                }
                let response = tokio::time::timeout(timeout, session.getnext(&self.oids[0]))
                    .await
                    .map_err(|_| SnmpClientError::Timeout)?
                    .map_err(SnmpClientError::Snmp2Error)?;
                if response.error_status != 0 {
                    return Err(SnmpClientError::ErrorStatus(response.error_status));
                }
                Ok(owned_varbinds(response.varbinds))
            }
            MessageType::GetBulkRequest => {
                let oid_refs: Vec<&Oid> = self.oids.iter().collect();
                let non_repeaters = self.non_repeaters.unwrap_or(0);
                let max_repetitions = self.max_repetitions.unwrap_or(BULK_REPETITIONS);
                let response = tokio::time::timeout(
                    timeout,
                    session.getbulk(&oid_refs, non_repeaters, max_repetitions),
                )
                .await
                .map_err(|_| SnmpClientError::Timeout)?
                .map_err(SnmpClientError::Snmp2Error)?;
                if response.error_status != 0 {
                    return Err(SnmpClientError::ErrorStatus(response.error_status));
                }
                Ok(owned_varbinds(response.varbinds))
            }
            _ => Err(SnmpClientError::UnsupportedSnmpOperation),
        }
    }
}

/// A GET response must carry exactly the requested OIDs, in request order.
fn answers_request(requested: &[Oid<'static>], varbinds: &[Varbind]) -> bool {
    requested.len() == varbinds.len()
        && requested.iter().zip(varbinds).all(|(oid, varbind)| *oid == varbind.oid)
}

#[derive(Debug, PartialEq, Eq)]
enum WalkStep {
    Advance,
    Stop,
}

/// Decides whether a varbind returned by GETNEXT/GETBULK still belongs to the walked column.
///
/// The walk stops when the OID leaves the column, on noSuchObject/endOfMibView, and when the
/// agent returns an OID that does not sort after the cursor.
fn walk_step(column: &[u64], cursor: &[u64], arcs: &[u64], value: &SnmpValue) -> WalkStep {
    if value.is_missing() || !arcs.starts_with(column) || arcs <= cursor {
        WalkStep::Stop
    } else {
        WalkStep::Advance
    }
}

fn owned_varbinds<'a>(varbinds: impl IntoIterator<Item = (Oid<'a>, snmp2::Value<'a>)>) -> Vec<Varbind> {
    varbinds
        .into_iter()
        .map(|(oid, value)| Varbind::new(oid.to_owned(), SnmpValue::from(&value)))
        .collect()
}

impl SnmpClient {
    /// Drops the session after a timeout or a mismatched answer.
    ///
    /// snmp2 only advances the request id once a response arrives, so a late reply to an
    /// abandoned request would otherwise be accepted as the answer to the next one.
    fn discard_stale_session<V>(&mut self, result: Result<V, SnmpClientError>) -> Result<V, SnmpClientError> {
        if let Err(e @ (SnmpClientError::Timeout | SnmpClientError::UnexpectedResponse)) = &result {
            tracing::debug!(address = ?self.address, error = %e, "Dropping SNMP session");
            self.session = None;
        }
        result
    }
}

#[async_trait]
impl SnmpTransport for SnmpClient {
    async fn open(&mut self, target: SocketAddr, community: &str) -> Result<(), SnmpClientError> {
        self.address = Some(target);
        self.community = community.to_string();
        self.session = None;
        Ok(())
    }

    async fn get_many(&mut self, oids: &[Oid<'static>]) -> Result<Vec<Varbind>, SnmpClientError> {
        let result = self.query().await?.get().oids(oids.iter().cloned()).execute().await;
        self.discard_stale_session(result)
    }

    async fn walk(&mut self, column: &Oid<'static>) -> Result<Vec<Varbind>, SnmpClientError> {
        let prefix = oid_arcs(column)?;
        let version = self.snmp_version;
        let mut cursor = column.clone();
        let mut cursor_arcs = prefix.clone();
        let mut rows = Vec::new();

        loop {
            let query = self.query().await?.oid(cursor.clone());
            let batch = match version {
                Version::V1 => query.get_next().execute().await,
                _ => query.get_bulk(0, BULK_REPETITIONS).execute().await,
            };
            let batch = self.discard_stale_session(batch)?;
            if batch.is_empty() {
                return Ok(rows);
            }
            for varbind in batch {
                let arcs = oid_arcs(&varbind.oid)?;
                if walk_step(&prefix, &cursor_arcs, &arcs, &varbind.value) == WalkStep::Stop {
                    return Ok(rows);
                }
                cursor = varbind.oid.clone();
                cursor_arcs = arcs;
                rows.push(varbind);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SnmpClientError {
    #[error("OID could not be parsed")]
    OidParseError,
    #[error("I/O error: {0}")]
    IoError(std::io::Error),
    #[error("SNMP error: {0:?}")]
    Snmp2Error(snmp2::Error),
    #[error("request timed out")]
    Timeout,
    #[error("agent answered with OIDs that were not requested")]
    UnexpectedResponse,
    #[error("agent answered with error-status {0}")]
    ErrorStatus(u32),
    #[error("no agent has been opened")]
    NoSession,
    #[error("query has no operation or no OIDs")]
    InvalidQuery,
    #[error("GETNEXT takes exactly one OID")]
    MultipleOidsOnGet,
    #[error("unsupported SNMP operation")]
    UnsupportedSnmpOperation,
    #[error("only SNMP v1 and v2c are supported")]
    UnsupportedVersion,
}
