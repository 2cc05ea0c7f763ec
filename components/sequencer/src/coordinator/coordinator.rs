use std::collections::HashMap;
use std::sync::Arc;

use storage::{Storage, StorageError};

use crate::conf::ClusterConfig;
use crate::coordinator::CoordinatorError;
use crate::message::{Envelope, MsgType, Txn};
use crate::transport::Connection;

#[cfg(test)]
#[path = "./tests/coordinator_tests.rs"]
mod tests;

/// Where a resolved Record came from, which decides who owns it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordOrigin {
    /// read from the local physical store; the store owns it and the
    /// coordinator never releases it.
    Local,
    /// received via READ_RESULT; owned by this coordinator and released
    /// exactly once when the transaction completes.
    Remote,
}

/// Record is a resolved key value plus its ownership metadata.
/// An empty value encodes a key that is declared but absent; callers tell
/// "absent" from "not yet resolved" only through the readiness count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    value: Vec<u8>,
    origin: RecordOrigin,
}

impl Record {
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_empty()
    }

    pub fn origin(&self) -> RecordOrigin {
        self.origin
    }
}

/// StorageCoordinator resolves one transaction's declared key sets across
/// partitions, combining local reads with broadcast remote reads, and gates
/// execution until every declared key is resolved.
///
/// One coordinator exists per admitted transaction and lives only for its
/// read-resolution-and-execution window.
pub struct StorageCoordinator {
    config: Arc<ClusterConfig>,
    conn: Arc<dyn Connection>,
    storage: Storage,
    txn: Txn,
    relative_node: u64,

    objects: HashMap<Vec<u8>, Record>,
    /// keys of remote-origin records, tracked for release
    remote_reads: Vec<Vec<u8>>,
    writer: bool,
}

impl StorageCoordinator {
    /// new performs the local reads this node is responsible for and
    /// broadcasts them to every other writer of the transaction, addressed
    /// by the transaction id used as the channel name.
    pub fn new(
        config: Arc<ClusterConfig>,
        conn: Arc<dyn Connection>,
        storage: Storage,
        txn: Txn,
    ) -> Result<StorageCoordinator, CoordinatorError> {
        let relative_node = config.relative_node();

        let mut sc = StorageCoordinator {
            config,
            conn,
            storage,
            txn,
            relative_node,
            objects: HashMap::new(),
            remote_reads: Vec::new(),
            writer: false,
        };

        sc.writer = sc.txn.writers.contains(&relative_node);

        let reader = sc.txn.readers.contains(&relative_node);
        if reader {
            sc.local_reads_and_broadcast()?;
        }

        Ok(sc)
    }

    fn local_reads_and_broadcast(&mut self) -> Result<(), CoordinatorError> {
        let mut msg = Envelope::of(MsgType::ReadResult, &self.txn.txn_id.to_string());

        let declared: Vec<Vec<u8>> = self
            .txn
            .read_set
            .iter()
            .chain(self.txn.read_write_set.iter())
            .cloned()
            .collect();

        for key in declared {
            if self.config.partition_for(&key) != self.relative_node {
                continue;
            }

            // absence is an empty value, not an error
            let val = self.storage.get_kv(&key)?.unwrap_or_default();
            self.objects.insert(
                key.clone(),
                Record {
                    value: val.clone(),
                    origin: RecordOrigin::Local,
                },
            );
            msg.keys.push(key);
            msg.values.push(val);
        }

        let local_replica = self.config.local_replica();
        for &w in self.txn.writers.iter() {
            if w == self.relative_node {
                continue;
            }
            msg.dest_node = self.config.node_in_replica(w, local_replica);
            self.conn.send(msg.clone());
        }

        Ok(())
    }

    /// is_writer reports whether this node executes the txn's writes; the
    /// scheduler consults it to decide whether to run the transaction here.
    pub fn is_writer(&self) -> bool {
        self.writer
    }

    /// handle_read_result absorbs one remote reader's broadcast.
    /// Idempotent per distinct key; callable any number of times before
    /// readiness.
    pub fn handle_read_result(&mut self, env: &Envelope) -> Result<(), CoordinatorError> {
        if !env.is(MsgType::ReadResult) {
            return Err(CoordinatorError::UnexpectedMessage(env.msg_type));
        }

        for (key, val) in env.keys.iter().zip(env.values.iter()) {
            if self.objects.contains_key(key) {
                continue;
            }
            self.objects.insert(
                key.clone(),
                Record {
                    value: val.clone(),
                    origin: RecordOrigin::Remote,
                },
            );
            self.remote_reads.push(key.clone());
        }

        Ok(())
    }

    /// ready_to_execute is true exactly when every declared read key is
    /// resolved; vacuously true for a transaction with empty read sets.
    pub fn ready_to_execute(&self) -> bool {
        self.objects.len() == self.txn.read_set.len() + self.txn.read_write_set.len()
    }

    /// read_object returns the resolved record for a declared key.
    pub fn read_object(&self, key: &[u8]) -> Option<&Record> {
        self.objects.get(key)
    }

    /// put_object writes through to the physical store if the key's
    /// partition is local; otherwise the owning partition's coordinator
    /// applies it independently and this call succeeds trivially.
    pub fn put_object(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        if self.config.partition_for(key) == self.relative_node {
            self.storage.set_kv(key, value)
        } else {
            Ok(())
        }
    }

    /// delete_object deletes from the physical store if the key's partition
    /// is local.
    pub fn delete_object(&self, key: &[u8]) -> Result<(), StorageError> {
        if self.config.partition_for(key) == self.relative_node {
            self.storage.delete_kv(key)
        } else {
            Ok(())
        }
    }

    /// release_remote_reads drops every record obtained via READ_RESULT.
    /// Returns how many were released; records from local reads are left to
    /// the physical store. Idempotent; also run on drop.
    pub fn release_remote_reads(&mut self) -> usize {
        let mut released = 0;
        for key in self.remote_reads.drain(..) {
            if self.objects.remove(&key).is_some() {
                released += 1;
            }
        }
        released
    }

    pub fn txn(&self) -> &Txn {
        &self.txn
    }
}

impl Drop for StorageCoordinator {
    fn drop(&mut self) {
        self.release_remote_reads();
    }
}
