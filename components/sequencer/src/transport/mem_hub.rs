use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::message::Envelope;
use crate::transport::Connection;

#[cfg(test)]
#[path = "./tests/mem_hub_tests.rs"]
mod tests;

/// MemHub routes envelopes between the nodes of an in-process cluster.
/// Mailboxes are keyed by (node, channel) and created lazily on send, so a
/// broadcast arriving before the receiver registered its channel is queued
/// rather than dropped.
pub struct MemHub {
    queues: Mutex<HashMap<(u64, String), VecDeque<Envelope>>>,
}

impl MemHub {
    pub fn new() -> Arc<MemHub> {
        Arc::new(MemHub {
            queues: Mutex::new(HashMap::new()),
        })
    }

    /// node returns the Connection handle for one node id.
    pub fn node(self: &Arc<Self>, node_id: u64) -> Arc<dyn Connection> {
        Arc::new(NodeConnection {
            hub: self.clone(),
            node_id,
        })
    }
}

/// NodeConnection is one node's view of the hub.
pub struct NodeConnection {
    hub: Arc<MemHub>,
    node_id: u64,
}

impl Connection for NodeConnection {
    fn node_id(&self) -> u64 {
        self.node_id
    }

    fn new_channel(&self, channel: &str) {
        let mut queues = self.hub.queues.lock().unwrap();
        queues
            .entry((self.node_id, channel.into()))
            .or_insert_with(VecDeque::new);
    }

    fn close_channel(&self, channel: &str) {
        let mut queues = self.hub.queues.lock().unwrap();
        queues.remove(&(self.node_id, channel.into()));
    }

    fn send(&self, mut env: Envelope) {
        env.source_node = self.node_id;
        let mut queues = self.hub.queues.lock().unwrap();
        queues
            .entry((env.dest_node, env.channel.clone()))
            .or_insert_with(VecDeque::new)
            .push_back(env);
    }

    fn poll(&self, channel: &str) -> Option<Envelope> {
        let mut queues = self.hub.queues.lock().unwrap();
        let q = queues.get_mut(&(self.node_id, channel.into()))?;
        q.pop_front()
    }
}
