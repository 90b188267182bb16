/*!
The crawl frontier, shared by every discovery worker.

This module defines:
- `FrontierStore`: the set of known addresses, the FIFO of addresses still to be queried
  and the list of every node registered so far. All three move together under one lock,
  so an address is either fully registered or not at all, and it can be popped once only.
*/

use std::{
    collections::{HashMap, VecDeque},
    net::Ipv4Addr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::network::node::{Node, SharedNode};

#[derive(Debug, Default)]
struct Frontier {
    discovered: HashMap<Ipv4Addr, SharedNode>,
    pending: VecDeque<SharedNode>,
    data: Vec<SharedNode>,
    /// popped nodes whose worker has not called `settle` yet
    claimed: usize,
}

#[derive(Debug, Default)]
pub struct FrontierStore {
    inner: Mutex<Frontier>,
}

impl FrontierStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a node if its address has never been seen. Returns whether it was added.
    pub fn try_register(&self, node: SharedNode) -> bool {
        let address = match node.read() {
            Ok(node) => node.address(),
            Err(poisoned) => poisoned.into_inner().address(),
        };
        let mut frontier = self.lock();
        if frontier.discovered.contains_key(&address) {
            return false;
        }
        frontier.discovered.insert(address, node.clone());
        frontier.pending.push_back(node.clone());
        frontier.data.push(node);
        tracing::trace!(%address, "Registered");
        true
    }

    /// Claims the next address to query. The caller must `settle` it once done.
    pub fn pop_pending(&self) -> Option<SharedNode> {
        let mut frontier = self.lock();
        let node = frontier.pending.pop_front()?;
        frontier.claimed += 1;
        Some(node)
    }

    /// Releases a claim taken by `pop_pending`, after the node's neighbors were registered.
    pub fn settle(&self) {
        let mut frontier = self.lock();
        frontier.claimed = frontier.claimed.saturating_sub(1);
    }

    /// Nothing pending and nothing claimed: no further address can appear.
    pub fn is_exhausted(&self) -> bool {
        let frontier = self.lock();
        frontier.pending.is_empty() && frontier.claimed == 0
    }

    pub fn contains(&self, address: &Ipv4Addr) -> bool {
        self.lock().discovered.contains_key(address)
    }

    /// Every registered node, in registration order.
    pub fn snapshot_data(&self) -> Vec<Node> {
        let data: Vec<SharedNode> = self.lock().data.clone();
        data.iter()
            .map(|node| match node.read() {
                Ok(node) => node.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn node(last: u8) -> SharedNode {
        Node::new(Ipv4Addr::new(10, 0, 0, last)).shared()
    }

    #[test]
    fn repeated_address_is_registered_once() {
        let store = FrontierStore::new();
        assert!(store.is_empty());
        assert!(store.try_register(node(1)));
        assert!(!store.try_register(node(1)));
        assert!(store.try_register(node(2)));

        assert_eq!(store.len(), 2);
        assert_eq!(store.pending_len(), 2);
        assert!(store.contains(&Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn pending_is_fifo_and_data_keeps_everything() {
        let store = FrontierStore::new();
        for last in 1..=3 {
            store.try_register(node(last));
        }

        let first = store.pop_pending().unwrap();
        assert_eq!(first.read().unwrap().address(), Ipv4Addr::new(10, 0, 0, 1));
        store.settle();
        store.pop_pending().unwrap();
        store.settle();
        store.pop_pending().unwrap();
        store.settle();
        assert!(store.pop_pending().is_none());

        let addresses: Vec<_> = store.snapshot_data().iter().map(Node::address).collect();
        assert_eq!(
            addresses,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 3)
            ]
        );
    }

    #[test]
    fn claimed_node_keeps_frontier_open() {
        let store = FrontierStore::new();
        store.try_register(node(1));
        assert!(!store.is_exhausted());

        let _claimed = store.pop_pending().unwrap();
        assert_eq!(store.pending_len(), 0);
        assert!(!store.is_exhausted());

        store.try_register(node(2));
        store.settle();
        assert!(!store.is_exhausted());

        store.pop_pending().unwrap();
        store.settle();
        assert!(store.is_exhausted());
    }

    #[test]
    fn snapshot_sees_updates_through_shared_node() {
        let store = FrontierStore::new();
        let shared = node(1);
        store.try_register(shared.clone());
        shared.write().unwrap().set_hostname("pe1".to_string());

        assert_eq!(store.snapshot_data()[0].hostname(), Some("pe1"));
    }

    #[test]
    fn concurrent_registration_is_at_most_once() {
        let store = Arc::new(FrontierStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (1..=50u8).filter(|last| store.try_register(node(*last))).count()
                })
            })
            .collect();

        let registered: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(registered, 50);
        assert_eq!(store.len(), 50);

        let mut popped = Vec::new();
        while let Some(node) = store.pop_pending() {
            popped.push(node.read().unwrap().address());
            store.settle();
        }
        popped.sort();
        popped.dedup();
        assert_eq!(popped.len(), 50);
    }
}
