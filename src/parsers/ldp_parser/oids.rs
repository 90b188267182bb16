//! MIB objects queried during adjacency discovery, as raw arcs.

/// SNMPv2-MIB::sysDescr.0
pub const SYS_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
/// SNMPv2-MIB::sysName.0
pub const SYS_NAME: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

pub const JUNIPER_DESCR: &str = "Juniper";
pub const CISCO_DESCR: &str = "Cisco";

/// JUNIPER-MPLS-LDP-MIB::jnxMplsLdpHelloAdjType, 1 = link, 2 = targeted.
///
/// Index: local LDP id (4+2), entity index, peer LDP id (4+2), ifIndex.
pub const JNX_LDP_HELLO_ADJ_TYPE: &[u64] = &[1, 3, 6, 1, 4, 1, 2636, 3, 36, 1, 3, 5, 1, 1, 3];
pub const JNX_ADJ_PEER_INDEX: usize = 7;
pub const JNX_ADJ_IF_INDEX: usize = 13;
pub const HELLO_ADJ_LINK: i64 = 1;

/// MPLS-LDP-MIB::mplsLdpSesState (Cisco enterprise branch), 5 = operational.
///
/// Index: local LDP id (4+2), entity index (the link address), peer LDP id (4+2).
pub const MPLS_LDP_SES_STATE: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 10, 65, 1, 3, 4, 1, 1];
pub const SES_STATE_LINK_INDEX: usize = 6;
pub const SES_STATE_PEER_INDEX: usize = 7;
pub const SES_STATE_OPERATIONAL: i64 = 5;

/// MPLS-LDP-MIB::mplsLdpEntityTargetedPeer, a TruthValue where 2 = false.
pub const MPLS_LDP_ENTITY_TARGETED_PEER: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 10, 65, 1, 2, 2, 1, 17];
pub const TARGETED_PEER_LINK_INDEX: usize = 6;
pub const TRUTH_VALUE_FALSE: i64 = 2;

/// MPLS-LDP-MIB::mplsLdpEntityConfGenIfIndxOrZero
pub const MPLS_LDP_ENTITY_CONF_IF_INDEX: &[u64] = &[1, 3, 6, 1, 4, 1, 9, 10, 65, 1, 2, 3, 1, 1, 3];
pub const CONF_IF_INDEX_LINK_INDEX: usize = 6;

/// RFC1213-MIB::ipRouteIfIndex, indexed by destination address.
pub const IP_ROUTE_IF_INDEX: &[u64] = &[1, 3, 6, 1, 2, 1, 4, 21, 1, 2];
/// RFC1213-MIB::ipRouteMetric1
pub const IP_ROUTE_METRIC1: &[u64] = &[1, 3, 6, 1, 2, 1, 4, 21, 1, 3];
/// RFC1213-MIB::ipRouteNextHop
pub const IP_ROUTE_NEXT_HOP: &[u64] = &[1, 3, 6, 1, 2, 1, 4, 21, 1, 7];

/// IF-MIB::ifDescr
pub const IF_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
/// IF-MIB::ifHighSpeed, in Mb/s.
pub const IF_HIGH_SPEED: &[u64] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];
