use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::errors::ConfError;

#[cfg(test)]
#[path = "./tests/conf_tests.rs"]
mod tests;

/// NodeId is the global identity of a node: replicas are laid out
/// contiguously, node ids `[r*nodes_per_replica, (r+1)*nodes_per_replica)`
/// belong to replica `r`.
pub type NodeId = u64;

/// ReplicaId identifies one replica group.
pub type ReplicaId = u32;

/// ClusterInfo is the static membership, loaded from yaml.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct ClusterInfo {
    pub nodes_per_replica: u64,
    pub num_replicas: u32,
}

impl ClusterInfo {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterInfo, ConfError> {
        let content = fs::read_to_string(path)?;
        let info: ClusterInfo = serde_yaml::from_str(content.as_str())?;
        info.check()?;
        Ok(info)
    }

    pub fn check(&self) -> Result<(), ConfError> {
        if self.nodes_per_replica == 0 {
            return Err(ConfError::BadClusterShape("nodes_per_replica is 0".into()));
        }
        if self.num_replicas == 0 {
            return Err(ConfError::BadClusterShape("num_replicas is 0".into()));
        }
        Ok(())
    }

    pub fn total_nodes(&self) -> u64 {
        self.nodes_per_replica * self.num_replicas as u64
    }
}

/// ClusterConfig is the topology oracle for one node: pure lookups over the
/// static membership, plus globally-unique id generation.
#[derive(Debug)]
pub struct ClusterConfig {
    info: ClusterInfo,
    local_node: NodeId,
    guid_counter: AtomicU64,
}

// batch numbers must be unique across the cluster; the node id occupies the
// high bits so two nodes can never collide.
const GUID_NODE_SHIFT: u32 = 40;

impl ClusterConfig {
    pub fn new(info: ClusterInfo, local_node: NodeId) -> Result<ClusterConfig, ConfError> {
        info.check()?;
        if local_node >= info.total_nodes() {
            return Err((local_node, info.total_nodes()).into());
        }

        Ok(ClusterConfig {
            info,
            local_node,
            guid_counter: AtomicU64::new(0),
        })
    }

    pub fn info(&self) -> &ClusterInfo {
        &self.info
    }

    pub fn local_node(&self) -> NodeId {
        self.local_node
    }

    pub fn nodes_per_replica(&self) -> u64 {
        self.info.nodes_per_replica
    }

    pub fn num_replicas(&self) -> u32 {
        self.info.num_replicas
    }

    /// local_replica returns the replica group this node belongs to.
    pub fn local_replica(&self) -> ReplicaId {
        (self.local_node / self.info.nodes_per_replica) as ReplicaId
    }

    /// relative_node returns this node's offset inside its replica.
    /// Reader/writer lists and partition owners are expressed in these.
    pub fn relative_node(&self) -> u64 {
        self.local_node % self.info.nodes_per_replica
    }

    /// replica_of returns the replica a node belongs to.
    pub fn replica_of(&self, node: NodeId) -> ReplicaId {
        (node / self.info.nodes_per_replica) as ReplicaId
    }

    /// leader_of returns the consensus leader of a replica.
    /// By convention the lowest node id of the group; fixed for the whole
    /// lifetime of a sequencer instance.
    pub fn leader_of(&self, replica: ReplicaId) -> NodeId {
        replica as u64 * self.info.nodes_per_replica
    }

    /// node_in_replica maps a relative node offset into replica `replica`.
    pub fn node_in_replica(&self, relative: u64, replica: ReplicaId) -> NodeId {
        replica as u64 * self.info.nodes_per_replica + relative % self.info.nodes_per_replica
    }

    /// participants returns the nodes of the local replica, leader first.
    pub fn participants(&self) -> Vec<NodeId> {
        let first = self.leader_of(self.local_replica());
        (first..first + self.info.nodes_per_replica).collect()
    }

    pub fn is_leader(&self) -> bool {
        self.local_node == self.leader_of(self.local_replica())
    }

    /// partition_for returns the relative node id owning a key.
    /// Every replica partitions the key space identically.
    pub fn partition_for(&self, key: &[u8]) -> u64 {
        fnv1a64(key) % self.info.nodes_per_replica
    }

    /// hash_batch_id spreads batch numbers over a replica's nodes.
    pub fn hash_batch_id(&self, batch_id: u64) -> u64 {
        batch_id % self.info.nodes_per_replica
    }

    /// lookup_machine returns the node of `replica` matching a batch hash.
    pub fn lookup_machine(&self, hash: u64, replica: ReplicaId) -> NodeId {
        self.node_in_replica(hash, replica)
    }

    /// next_guid generates a cluster-wide unique id.
    pub fn next_guid(&self) -> u64 {
        let n = self.guid_counter.fetch_add(1, Ordering::Relaxed);
        (self.local_node << GUID_NODE_SHIFT) | (n + 1)
    }
}

fn fnv1a64(buf: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in buf {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}
