use std::net::Ipv4Addr;

/// Reads an IPv4 address embedded as four arcs of an OID index, starting at `offset`.
pub fn ipv4_from_arcs(arcs: &[u64], offset: usize) -> Option<Ipv4Addr> {
    let octets = arcs.get(offset..offset + 4)?;
    let mut out = [0u8; 4];
    for (slot, arc) in out.iter_mut().zip(octets) {
        *slot = u8::try_from(*arc).ok()?;
    }
    Some(Ipv4Addr::from(out))
}

/// The four arcs used to index a table by IPv4 address.
pub fn ipv4_arcs(address: Ipv4Addr) -> [u64; 4] {
    address.octets().map(u64::from)
}

/// Link handles are 32-bit integers holding the local link address.
pub fn link_to_ipv4(link: u32) -> Ipv4Addr {
    Ipv4Addr::from(link)
}
