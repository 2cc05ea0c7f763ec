use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cadence::Node;
use sequencer::conf::ClusterInfo;
use sequencer::transport::{Connection, MemHub};

/// An in-process cluster: every node of every replica, wired over one hub.
pub struct TestCluster {
    pub hub: Arc<MemHub>,
    pub nodes: Vec<Node>,
}

impl TestCluster {
    pub fn start(nodes_per_replica: u64, num_replicas: u32) -> TestCluster {
        let info = ClusterInfo {
            nodes_per_replica,
            num_replicas,
        };

        let hub = MemHub::new();
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        let mut nodes = Vec::new();
        for id in 0..info.total_nodes() {
            let node = Node::start(info.clone(), id, hub.node(id), logger.clone()).unwrap();
            nodes.push(node);
        }

        TestCluster { hub, nodes }
    }

    /// conn returns an extra transport handle for a node, for the test to
    /// observe or inject traffic with.
    pub fn conn(&self, node: u64) -> Arc<dyn Connection> {
        self.hub.node(node)
    }

    pub fn stop(&mut self) {
        for n in self.nodes.iter_mut() {
            n.stop();
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        self.stop();
    }
}

/// wait_for polls a condition until it yields or a deadline passes.
pub fn wait_for<F, T>(what: &str, mut f: F) -> T
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(v) = f() {
            return v;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}
