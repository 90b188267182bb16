use std::{sync::Arc, time::Duration};

use crate::{
    data_aquisition::core::SnmpTransport,
    network::node::Node,
};

use super::{
    discoverer::{Discoverer, Discovery},
    status::{DiscoveryListener, StopListener},
    store::FrontierStore,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One discovery task: pops the frontier, discovers the node and feeds new neighbors back.
pub struct Worker<T> {
    id: usize,
    discoverer: Discoverer<T>,
    frontier: Arc<FrontierStore>,
    listener: Arc<dyn DiscoveryListener>,
    stop: StopListener,
    community: String,
    poll_interval: Duration,
}

impl<T: SnmpTransport> Worker<T> {
    pub fn new(
        id: usize,
        discoverer: Discoverer<T>,
        frontier: Arc<FrontierStore>,
        listener: Arc<dyn DiscoveryListener>,
        stop: StopListener,
        community: &str,
    ) -> Self {
        Self {
            id,
            discoverer,
            frontier,
            listener,
            stop,
            community: community.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs until the stop signal is raised.
    pub async fn run(mut self) {
        self.listener.join();
        tracing::debug!(worker = self.id, "Joined");

        loop {
            if self.stop.is_raised() {
                break;
            }

            let Some(node) = self.frontier.pop_pending() else {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = self.stop.raised() => {}
                }
                continue;
            };

            self.listener.working();
            match self.discoverer.discover(&node).await {
                Ok(Discovery::Excluded) => {
                    self.frontier.settle();
                    self.listener.success_result();
                }
                Ok(Discovery::Expanded(remotes)) => {
                    // counted before the neighbors exist, so no neighbor result can precede it
                    self.listener.success_result();
                    let added = remotes
                        .into_iter()
                        .filter(|remote| {
                            self.frontier
                                .try_register(Node::with_community(*remote, &self.community).shared())
                        })
                        .count();
                    tracing::debug!(worker = self.id, added, "Frontier expanded");
                    self.frontier.settle();
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, error = %e, "Discovery failed");
                    self.frontier.settle();
                    self.listener.error_result();
                }
            }
        }

        self.listener.leave();
        tracing::debug!(worker = self.id, "Left");
    }
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, sync::Mutex};

    use super::*;
    use crate::{
        data_aquisition::mock::{MockDevice, MockNetwork},
        parsers::ldp_parser::LdpEngine,
        topology::{discoverer::ExclusionFilter, status::StopSignal},
    };

    const PE1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const P1: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingListener {
        fn record(&self, event: &'static str) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DiscoveryListener for RecordingListener {
        fn join(&self) {
            self.record("join");
        }
        fn leave(&self) {
            self.record("leave");
        }
        fn working(&self) {
            self.record("working");
        }
        fn success_result(&self) {
            self.record("success");
        }
        fn error_result(&self) {
            self.record("error");
        }
    }

    async fn run_until_drained(network: Arc<MockNetwork>, frontier: Arc<FrontierStore>) -> Vec<&'static str> {
        let listener = Arc::new(RecordingListener::default());
        let stop = StopSignal::new();
        let discoverer = Discoverer::new(LdpEngine::new(network.transport(), 161), ExclusionFilter::default());
        let worker = Worker::new(0, discoverer, Arc::clone(&frontier), listener.clone(), stop.subscribe(), "secret")
            .with_poll_interval(Duration::from_millis(5));
        let task = tokio::spawn(worker.run());

        while !frontier.is_exhausted() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stop.raise();
        task.await.unwrap();
        listener.events()
    }

    #[tokio::test]
    async fn worker_expands_frontier_with_crawl_community() {
        let network = MockNetwork::new()
            .device(PE1, MockDevice::juniper("pe1").juniper_adjacency(PE1, P1, 16, 1))
            .device(P1, MockDevice::juniper("p1").juniper_adjacency(P1, PE1, 3, 1))
            .shared();
        let frontier = Arc::new(FrontierStore::new());
        frontier.try_register(Node::new(PE1).shared());

        let events = run_until_drained(network, Arc::clone(&frontier)).await;

        assert_eq!(events, vec!["join", "working", "success", "working", "success", "leave"]);
        let nodes = frontier.snapshot_data();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].address(), P1);
        assert_eq!(nodes[1].community, "secret");
        assert_eq!(nodes[1].hostname(), Some("p1"));
    }

    #[tokio::test]
    async fn failed_node_reports_error_and_moves_on() {
        // P1 is known as neighbor but never answers
        let network = MockNetwork::new()
            .device(PE1, MockDevice::juniper("pe1").juniper_adjacency(PE1, P1, 16, 1))
            .shared();
        let frontier = Arc::new(FrontierStore::new());
        frontier.try_register(Node::new(PE1).shared());

        let events = run_until_drained(network, Arc::clone(&frontier)).await;

        assert_eq!(events, vec!["join", "working", "success", "working", "error", "leave"]);
        assert_eq!(frontier.len(), 2);
    }

    #[tokio::test]
    async fn raised_stop_wakes_idle_worker() {
        let network = MockNetwork::new().shared();
        let frontier = Arc::new(FrontierStore::new());
        let listener = Arc::new(RecordingListener::default());
        let stop = StopSignal::new();
        let discoverer = Discoverer::new(LdpEngine::new(network.transport(), 161), ExclusionFilter::none());
        let worker = Worker::new(0, discoverer, frontier, listener.clone(), stop.subscribe(), "public")
            .with_poll_interval(Duration::from_secs(3600));
        let task = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.raise();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(listener.events(), vec!["join", "leave"]);
    }
}
