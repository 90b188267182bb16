use std::collections::BTreeSet;

use crate::{
    data_aquisition::core::{SnmpTransport, oid_from},
    network::edge::Edge,
};

use super::{LdpEngine, LdpError, oids};

/// Fills in interface name and speed for every edge with a single combined GET.
///
/// Edges sharing an ifIndex all receive the same values. Unanswered columns leave the
/// edge untouched.
pub(super) async fn enrich<T: SnmpTransport>(
    engine: &mut LdpEngine<T>,
    edges: &mut [Edge],
) -> Result<(), LdpError> {
    let if_indexes: BTreeSet<u32> = edges.iter().map(|edge| edge.if_index).collect();
    if if_indexes.is_empty() {
        return Ok(());
    }

    let mut request = Vec::with_capacity(if_indexes.len() * 2);
    for if_index in &if_indexes {
        let index = [u64::from(*if_index)];
        request.push(oid_from(oids::IF_DESCR, &index)?);
        request.push(oid_from(oids::IF_HIGH_SPEED, &index)?);
    }

    let mut names = Vec::new();
    let mut speeds = Vec::new();
    for varbind in engine.get_many(&request).await? {
        if let Some(index) = varbind.index_after(oids::IF_DESCR) {
            if let (Some(&if_index), Some(name)) = (index.first(), varbind.value.as_text()) {
                names.push((if_index, name.to_string()));
            }
        } else if let Some(index) = varbind.index_after(oids::IF_HIGH_SPEED) {
            if let (Some(&if_index), Some(speed)) = (index.first(), varbind.value.as_u64()) {
                speeds.push((if_index, speed));
            }
        }
    }

    for edge in edges.iter_mut() {
        let if_index = u64::from(edge.if_index);
        let name = names.iter().find(|(i, _)| *i == if_index).map(|(_, n)| n.clone());
        let speed = speeds.iter().find(|(i, _)| *i == if_index).map(|(_, s)| *s);
        match (name, speed) {
            (Some(name), speed) => edge.set_interface(name, speed.unwrap_or(0)),
            (None, Some(speed)) => edge.speed = speed,
            (None, None) => tracing::debug!(remote = %edge.remote, if_index, "No interface data"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, sync::atomic::Ordering};

    use super::*;
    use crate::data_aquisition::mock::{MockDevice, MockNetwork};

    const PE1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const P1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const P2: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);

    #[tokio::test]
    async fn shared_if_index_fans_out_from_one_request() {
        let device = MockDevice::juniper("pe1").interface(5, "xe-0/0/0", 10000);
        let network = MockNetwork::new().device(PE1, device).shared();
        let mut engine = LdpEngine::new(network.transport(), 161);
        engine.retarget(PE1, "public").await.unwrap();
        let before = network.get_requests.load(Ordering::SeqCst);

        let mut edges = vec![Edge::new(P1, 5), Edge::new(P2, 5)];
        enrich(&mut engine, &mut edges).await.unwrap();

        assert_eq!(network.get_requests.load(Ordering::SeqCst), before + 1);
        for edge in &edges {
            assert_eq!(edge.interface.as_deref(), Some("xe-0/0/0"));
            assert_eq!(edge.speed, 10000);
        }
    }

    #[tokio::test]
    async fn unknown_interface_is_left_alone() {
        let device = MockDevice::juniper("pe1").interface(5, "xe-0/0/0", 10000);
        let network = MockNetwork::new().device(PE1, device).shared();
        let mut engine = LdpEngine::new(network.transport(), 161);
        engine.retarget(PE1, "public").await.unwrap();

        let mut edges = vec![Edge::new(P1, 5), Edge::new(P2, 9)];
        enrich(&mut engine, &mut edges).await.unwrap();

        assert_eq!(edges[0].interface.as_deref(), Some("xe-0/0/0"));
        assert_eq!(edges[1], Edge::new(P2, 9));
    }

    #[tokio::test]
    async fn no_edges_sends_nothing() {
        let network = MockNetwork::new().device(PE1, MockDevice::cisco("pe1")).shared();
        let mut engine = LdpEngine::new(network.transport(), 161);
        engine.retarget(PE1, "public").await.unwrap();
        let before = network.get_requests.load(Ordering::SeqCst);

        enrich(&mut engine, &mut []).await.unwrap();
        assert_eq!(network.get_requests.load(Ordering::SeqCst), before);
    }
}
