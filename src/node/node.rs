use std::sync::Arc;

use slog::Logger;

use sequencer::conf::{ClusterConfig, ClusterInfo, NodeId};
use sequencer::coordinator::{CoordinatorError, StorageCoordinator};
use sequencer::message::Txn;
use sequencer::paxos::{ReplicatedSequencer, SCHEDULER_CHANNEL, SEQUENCER_CHANNEL};
use sequencer::transport::Connection;
use storage::{MemEngine, Storage};

use crate::NodeError;

#[cfg(test)]
#[path = "./tests/node_tests.rs"]
mod tests;

/// Node wires one cluster member together: the topology oracle, the
/// physical store, the transport handle and the replicated sequencer.
pub struct Node {
    pub config: Arc<ClusterConfig>,
    pub storage: Storage,
    pub conn: Arc<dyn Connection>,
    pub logger: Logger,

    sequencer: ReplicatedSequencer,
}

impl Node {
    /// start builds a node from the static membership and brings its
    /// consensus loop up.
    pub fn start(
        info: ClusterInfo,
        node_id: NodeId,
        conn: Arc<dyn Connection>,
        logger: Logger,
    ) -> Result<Node, NodeError> {
        let config = Arc::new(ClusterConfig::new(info, node_id)?);
        let storage: Storage = Arc::new(MemEngine::new()?);

        conn.new_channel(SCHEDULER_CHANNEL);
        conn.new_channel(SEQUENCER_CHANNEL);

        let sequencer = ReplicatedSequencer::start(config.clone(), conn.clone(), logger.clone());

        info!(logger, "node started";
              "node" => node_id,
              "replica" => config.local_replica(),
              "leader" => config.is_leader());

        Ok(Node {
            config,
            storage,
            conn,
            logger,
            sequencer,
        })
    }

    /// append_batch submits a batch id to the replicated order.
    pub fn append_batch(&self, batch_id: u64) {
        self.sequencer.append(batch_id);
    }

    pub fn sequencer(&self) -> &ReplicatedSequencer {
        &self.sequencer
    }

    /// coordinator_for starts read resolution for one admitted transaction.
    pub fn coordinator_for(&self, txn: Txn) -> Result<StorageCoordinator, CoordinatorError> {
        StorageCoordinator::new(
            self.config.clone(),
            self.conn.clone(),
            self.storage.clone(),
            txn,
        )
    }

    /// stop signals the consensus loop and joins it.
    pub fn stop(&mut self) {
        self.sequencer.stop();
    }
}
