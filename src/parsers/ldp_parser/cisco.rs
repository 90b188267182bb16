//! Cisco LDP adjacency correlation.
//!
//! The hello adjacency table on these boxes does not tell link adjacencies apart from
//! targeted ones, so adjacencies are rebuilt from four sources:
//!
//! 1. operational LDP sessions (link address -> peer LDP id),
//! 2. entities that are not targeted (the known-direct links),
//! 3. the ifIndex configured on those entities,
//! 4. for the remaining, targeted sessions, the route towards the peer: per next hop,
//!    the peer with the lowest metric is taken as directly attached and promoted.
//!
//! Links that end up without an ifIndex are dropped.

use std::{collections::HashMap, net::Ipv4Addr};

use crate::{
    data_aquisition::core::{SnmpTableRow, SnmpTransport, oid_from},
    network::{
        edge::Edge,
        ip::{ipv4_arcs, ipv4_from_arcs, link_to_ipv4},
    },
};

use super::{LdpEngine, LdpError, oids};

/// Link address, as the 32-bit entity index the sessions are keyed by.
type LinkHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LdpSession {
    link: LinkHandle,
    peer: Ipv4Addr,
}

/// Promotion candidate for one next hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    next_hop: LinkHandle,
    peer: Ipv4Addr,
    metric: i64,
}

pub(super) async fn correlated_adjacencies<T: SnmpTransport>(
    engine: &mut LdpEngine<T>,
) -> Result<Vec<Edge>, LdpError> {
    let rows = engine.walk(oids::MPLS_LDP_SES_STATE, "mplsLdpSesState").await?;
    let mut sessions = operational_sessions(&rows);

    let rows = engine
        .walk(oids::MPLS_LDP_ENTITY_TARGETED_PEER, "mplsLdpEntityTargetedPeer")
        .await?;
    let mut direct = direct_links(&rows);

    let rows = engine
        .walk(oids::MPLS_LDP_ENTITY_CONF_IF_INDEX, "mplsLdpEntityConfGenIfIndxOrZero")
        .await?;
    attach_if_indexes(&rows, &mut direct);

    promote_targeted(engine, &mut sessions, &mut direct).await;

    Ok(resolved_edges(&sessions, &direct))
}

fn operational_sessions(rows: &[SnmpTableRow]) -> Vec<LdpSession> {
    let mut sessions: Vec<LdpSession> = Vec::new();
    for row in rows {
        if row.value.as_i64() != Some(oids::SES_STATE_OPERATIONAL) {
            continue;
        }
        let link = row.index_u32(oids::SES_STATE_LINK_INDEX);
        let peer = ipv4_from_arcs(&row.index, oids::SES_STATE_PEER_INDEX);
        let (Some(link), Some(peer)) = (link, peer) else {
            tracing::warn!(index = ?row.index, "LDP session with malformed index");
            continue;
        };
        tracing::debug!(%peer, link = %link_to_ipv4(link), "Operational LDP session");
        upsert_session(&mut sessions, LdpSession { link, peer });
    }
    sessions
}

fn upsert_session(sessions: &mut Vec<LdpSession>, session: LdpSession) {
    match sessions.iter_mut().find(|s| s.link == session.link) {
        Some(existing) => *existing = session,
        None => sessions.push(session),
    }
}

/// Links with a non-targeted entity; the ifIndex is filled in later, 0 means unknown.
fn direct_links(rows: &[SnmpTableRow]) -> HashMap<LinkHandle, u32> {
    rows.iter()
        .filter(|row| row.value.as_i64() == Some(oids::TRUTH_VALUE_FALSE))
        .filter_map(|row| row.index_u32(oids::TARGETED_PEER_LINK_INDEX))
        .inspect(|link| tracing::debug!(link = %link_to_ipv4(*link), "Non-targeted LDP entity"))
        .map(|link| (link, 0))
        .collect()
}

fn attach_if_indexes(rows: &[SnmpTableRow], direct: &mut HashMap<LinkHandle, u32>) {
    for row in rows {
        let if_index = row.value.as_i64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0);
        if if_index == 0 {
            continue;
        }
        let Some(link) = row.index_u32(oids::CONF_IF_INDEX_LINK_INDEX) else {
            continue;
        };
        if let Some(slot) = direct.get_mut(&link) {
            tracing::debug!(link = %link_to_ipv4(link), if_index, "Entity interface");
            *slot = if_index;
        }
    }
}

/// Step 4. A failed next-hop request promotes nothing. A failed metric or ifIndex lookup
/// drops only that candidate.
async fn promote_targeted<T: SnmpTransport>(
    engine: &mut LdpEngine<T>,
    sessions: &mut Vec<LdpSession>,
    direct: &mut HashMap<LinkHandle, u32>,
) {
    let targeted: Vec<Ipv4Addr> = sessions
        .iter()
        .filter(|s| !direct.contains_key(&s.link))
        .map(|s| s.peer)
        .collect();
    if targeted.is_empty() {
        return;
    }

    let mut request = Vec::with_capacity(targeted.len());
    for peer in &targeted {
        tracing::debug!(%peer, "Targeted LDP session may be adjacent");
        match oid_from(oids::IP_ROUTE_NEXT_HOP, &ipv4_arcs(*peer)) {
            Ok(oid) => request.push(oid),
            Err(e) => tracing::warn!(%peer, error = %e, "Skipping targeted session"),
        }
    }

    let replies = match engine.get_many(&request).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::warn!(error = %e, "ipRouteNextHop lookup failed, no targeted session promoted");
            return;
        }
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    for reply in replies {
        let Some(peer) = reply
            .index_after(oids::IP_ROUTE_NEXT_HOP)
            .and_then(|index| ipv4_from_arcs(&index, 0))
        else {
            continue;
        };
        let Some(next_hop) = reply.value.as_ipv4() else {
            tracing::debug!(%peer, value = %reply.value, "No route towards LDP peer");
            continue;
        };
        let next_hop = u32::from(next_hop);
        if direct.contains_key(&next_hop) {
            continue;
        }

        let metric = match engine.get_integer(&route_oid(oids::IP_ROUTE_METRIC1, peer)).await {
            Ok(metric) => metric,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "ipRouteMetric1 lookup failed, skipping candidate");
                continue;
            }
        };
        offer_candidate(&mut candidates, Candidate { next_hop, peer, metric });
    }

    for candidate in candidates {
        let peer = candidate.peer;
        let if_index = match engine.get_integer(&route_oid(oids::IP_ROUTE_IF_INDEX, peer)).await {
            Ok(if_index) => u32::try_from(if_index).unwrap_or(0),
            Err(e) => {
                tracing::warn!(%peer, error = %e, "ipRouteIfIndex lookup failed, not promoting");
                continue;
            }
        };
        tracing::debug!(%peer, next_hop = %link_to_ipv4(candidate.next_hop), metric = candidate.metric, if_index, "Promoted");
        upsert_session(sessions, LdpSession { link: candidate.next_hop, peer });
        direct.insert(candidate.next_hop, if_index);
    }
}

/// Keeps the lowest metric per next hop; on a tie the first offer stays.
fn offer_candidate(candidates: &mut Vec<Candidate>, offer: Candidate) {
    match candidates.iter_mut().find(|c| c.next_hop == offer.next_hop) {
        Some(current) if offer.metric < current.metric => *current = offer,
        Some(_) => {}
        None => candidates.push(offer),
    }
}

fn route_oid(column: &[u64], peer: Ipv4Addr) -> Vec<u64> {
    let mut arcs = column.to_vec();
    arcs.extend(ipv4_arcs(peer));
    arcs
}

fn resolved_edges(sessions: &[LdpSession], direct: &HashMap<LinkHandle, u32>) -> Vec<Edge> {
    sessions
        .iter()
        .filter_map(|session| match direct.get(&session.link) {
            Some(&if_index) if if_index != 0 => Some(Edge::new(session.peer, if_index)),
            Some(_) => {
                tracing::debug!(peer = %session.peer, "Direct link without ifIndex, dropped");
                None
            }
            None => None,
        })
        .collect()
}
