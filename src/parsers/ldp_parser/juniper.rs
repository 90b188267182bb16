use crate::{
    data_aquisition::core::{SnmpTableRow, SnmpTransport},
    network::{edge::Edge, ip::ipv4_from_arcs},
};

use super::{LdpEngine, LdpError, oids};

/// Reads link-type hello adjacencies; the row index already holds the peer and the ifIndex.
pub(super) async fn direct_table_adjacencies<T: SnmpTransport>(
    engine: &mut LdpEngine<T>,
) -> Result<Vec<Edge>, LdpError> {
    let rows = engine
        .walk(oids::JNX_LDP_HELLO_ADJ_TYPE, "jnxMplsLdpHelloAdjType")
        .await?;
    Ok(edges_from_hello_adjacencies(&rows))
}

fn edges_from_hello_adjacencies(rows: &[SnmpTableRow]) -> Vec<Edge> {
    rows.iter()
        .filter(|row| row.value.as_i64() == Some(oids::HELLO_ADJ_LINK))
        .filter_map(|row| {
            let peer = ipv4_from_arcs(&row.index, oids::JNX_ADJ_PEER_INDEX);
            let if_index = row.index_u32(oids::JNX_ADJ_IF_INDEX);
            match (peer, if_index) {
                (Some(peer), Some(if_index)) => {
                    tracing::debug!(%peer, if_index, "Adjacency");
                    Some(Edge::new(peer, if_index))
                }
                _ => {
                    tracing::warn!(index = ?row.index, "Hello adjacency with malformed index");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::data_aquisition::{
        core::SnmpValue,
        mock::{MockDevice, MockNetwork},
    };

    const PE1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const P1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const P2: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);
    const RR: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);

    #[tokio::test]
    async fn keeps_link_adjacencies_only() {
        let device = MockDevice::juniper("pe1")
            .juniper_adjacency(PE1, P1, 16, 1)
            .juniper_adjacency(PE1, P2, 17, 1)
            .juniper_adjacency(PE1, RR, 0, 2);
        let network = MockNetwork::new().device(PE1, device).shared();
        let mut engine = LdpEngine::new(network.transport(), 161);
        engine.retarget(PE1, "public").await.unwrap();

        let mut edges = direct_table_adjacencies(&mut engine).await.unwrap();
        edges.sort_by_key(|edge| edge.remote);
        assert_eq!(edges, vec![Edge::new(P1, 16), Edge::new(P2, 17)]);
    }

    #[tokio::test]
    async fn walk_timeout_fails_resolution() {
        let device = MockDevice::juniper("pe1")
            .juniper_adjacency(PE1, P1, 16, 1)
            .silent_on(oids::JNX_LDP_HELLO_ADJ_TYPE);
        let network = MockNetwork::new().device(PE1, device).shared();
        let mut engine = LdpEngine::new(network.transport(), 161);
        engine.retarget(PE1, "public").await.unwrap();

        assert!(matches!(
            direct_table_adjacencies(&mut engine).await,
            Err(LdpError::WalkFailed { .. })
        ));
    }

    #[test]
    fn short_index_is_skipped() {
        let rows = vec![
            SnmpTableRow {
                index: vec![10, 0, 0, 1, 0, 0, 1, 10, 0, 0, 2],
                value: SnmpValue::Integer(1),
            },
            SnmpTableRow {
                index: vec![10, 0, 0, 1, 0, 0, 1, 10, 0, 0, 3, 0, 0, 21],
                value: SnmpValue::Integer(1),
            },
        ];
        assert_eq!(edges_from_hello_adjacencies(&rows), vec![Edge::new(P2, 21)]);
    }
}
