use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;

use prost::Message;

use crate::conf::ReplicaId;
use crate::log::LogReader;
use crate::message::{encode_to_vec, Envelope, MsgType, Sequence, SequenceBatch, Txn};
use crate::paxos::sequencer::{
    misc, SequencerShared, PAXOS_LOG_CHANNEL, POLL_INTERVAL, SCHEDULER_CHANNEL, SEQUENCER_CHANNEL,
};
use crate::paxos::{quorum, SequencerError};

#[cfg(test)]
#[path = "./tests/leader_tests.rs"]
mod tests;

/// Per-replica credit state for backlog shipping.
/// At most one shipment to a replica is outstanding at a time; the credit
/// comes back with NEW_SEQUENCE_ACK once the peer has processed everything
/// it received.
struct ReplicaFlow {
    received_version: u64,
    processed_version: u64,
    can_ship: bool,
}

/// Leader drives quorum rounds for the local replica group.
///
/// All leader-only state lives here and is touched only by the leader loop;
/// the producer side reaches it solely through `SequencerShared`.
pub struct Leader {
    shared: Arc<SequencerShared>,

    local_version: u64,
    global_version: u64,

    /// one replayable cursor over the local log per other replica
    backlog_readers: HashMap<ReplicaId, LogReader>,
    flow: HashMap<ReplicaId, ReplicaFlow>,

    /// multi-replica batch payloads, keyed by batch id
    mr_txn_batches: HashMap<u64, Envelope>,
    /// sequences shipped by other replicas, awaiting a merge round
    remote_sequences: VecDeque<(Sequence, ReplicaId)>,
}

impl Leader {
    pub fn new(shared: Arc<SequencerShared>) -> Leader {
        let mut backlog_readers = HashMap::new();
        let mut flow = HashMap::new();

        let local_replica = shared.config.local_replica();
        for r in 0..shared.config.num_replicas() {
            if r == local_replica {
                continue;
            }
            backlog_readers.insert(r, shared.local_log.reader());
            flow.insert(
                r,
                ReplicaFlow {
                    received_version: 0,
                    processed_version: 0,
                    can_ship: true,
                },
            );
        }

        Leader {
            shared,
            local_version: 0,
            global_version: 0,
            backlog_readers,
            flow,
            mr_txn_batches: HashMap::new(),
            remote_sequences: VecDeque::new(),
        }
    }

    pub fn run(&mut self) -> Result<(), SequencerError> {
        info!(self.shared.logger, "leader loop started";
              "node" => self.shared.config.local_node(),
              "replica" => self.shared.config.local_replica());

        loop {
            if self.shared.stopped() {
                return Ok(());
            }

            match self.one_round() {
                Ok(true) => {}
                Ok(false) => {
                    // idle iteration
                    self.drain_inbound()?;
                    thread::sleep(POLL_INTERVAL);
                }
                Err(SequencerError::Stopped) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// one_round runs a single consensus round if there is work.
    /// Returns Ok(false) when neither local batches nor remote sequences are
    /// pending.
    pub fn one_round(&mut self) -> Result<bool, SequencerError> {
        let (seq, origin) = if self.shared.has_pending() {
            let seq = self.shared.take_pending();
            self.local_version += 1;
            self.global_version += 1;
            (seq, None)
        } else if let Some((seq, from)) = self.remote_sequences.pop_front() {
            self.global_version += 1;
            self.merge_remote(&seq, from)?;
            (seq, Some(from))
        } else {
            return Ok(false);
        };

        let is_local = origin.is_none();
        let encoded = encode_to_vec(&seq);

        self.propose(&encoded, is_local);
        self.collect_acks()?;
        self.publish_order(&encoded, is_local);
        self.commit_notice();

        self.shared
            .global_log
            .append(self.global_version, encoded.clone());

        if is_local {
            self.shared.local_log.append(self.local_version, encoded);
            self.ship_backlogs()?;
        } else if let Some(from) = origin {
            self.credit_remote(from);
        }

        self.drain_inbound()?;
        Ok(true)
    }

    /// propose broadcasts the round's sequence to the other participants.
    fn propose(&self, encoded: &[u8], is_local: bool) {
        let mut env = Envelope::of(MsgType::PaxosData, PAXOS_LOG_CHANNEL);
        env.data.push(encoded.to_vec());
        env.misc_int.push(self.global_version);
        if is_local {
            env.misc_int.push(self.local_version);
        }

        for &p in &self.shared.config.participants()[1..] {
            env.dest_node = p;
            self.shared.conn.send(env.clone());
        }
    }

    /// collect_acks blocks until a quorum of distinct participants has acked
    /// the current global version. Acks for any other version are discarded;
    /// non-ack control messages arriving meanwhile are handled normally.
    fn collect_acks(&mut self) -> Result<(), SequencerError> {
        let need = quorum(self.shared.config.nodes_per_replica() as usize);

        let mut acked: HashSet<u64> = HashSet::new();
        acked.insert(self.shared.config.local_node());

        while acked.len() < need {
            if self.shared.stopped() {
                return Err(SequencerError::Stopped);
            }

            let env = match self.shared.conn.poll(PAXOS_LOG_CHANNEL) {
                Some(env) => env,
                None => {
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
            };

            if !env.is(MsgType::PaxosDataAck) {
                self.handle_control(env)?;
                continue;
            }

            let v = misc(&env, 0)?;
            if v == self.global_version {
                acked.insert(env.source_node);
            } else {
                debug!(self.shared.logger, "discarding stale ack";
                       "acked" => v, "current" => self.global_version);
            }
        }

        Ok(())
    }

    /// publish_order forwards the committed order to the scheduler of every
    /// node in the local replica.
    fn publish_order(&self, encoded: &[u8], is_local: bool) {
        let mut env = Envelope::of(MsgType::PaxosBatchOrder, SCHEDULER_CHANNEL);
        env.data.push(encoded.to_vec());
        env.misc_int.push(self.global_version);
        if is_local {
            env.misc_int.push(self.local_version);
        }

        for p in self.shared.config.participants() {
            env.dest_node = p;
            self.shared.conn.send(env.clone());
        }
    }

    /// commit_notice tells the followers to apply their oldest uncommitted
    /// proposal. The payload is cleared; followers pair commits with
    /// proposals by FIFO order.
    fn commit_notice(&self) {
        let mut env = Envelope::of(MsgType::PaxosCommit, PAXOS_LOG_CHANNEL);
        for &p in &self.shared.config.participants()[1..] {
            env.dest_node = p;
            self.shared.conn.send(env.clone());
        }
    }

    /// merge_remote re-stamps the multi-replica batches named by a remote
    /// sequence and forwards them, treating the sequence as an atomic unit:
    /// every contained batch's payload must have arrived before the round
    /// proceeds, in order, never skipping ahead.
    fn merge_remote(&mut self, seq: &Sequence, from: ReplicaId) -> Result<(), SequencerError> {
        let config = self.shared.config.clone();
        let local_replica = config.local_replica();

        for i in 0..seq.batch_ids.len() {
            let batch_id = seq.batch_ids[i];
            let payload = self.wait_for_payload(batch_id)?;
            if payload.data.is_empty() {
                continue;
            }

            let mut batch = Envelope::of(MsgType::TxnBatch, SEQUENCER_CHANNEL);
            for buf in payload.data.iter() {
                let mut txn = Txn::decode(buf.as_slice())?;
                txn.restamp(local_replica);
                batch.data.push(encode_to_vec(&txn));
            }

            let batch_number = config.next_guid();
            batch.batch_number = batch_number;

            // the merged batch enters the local order like any admitted one
            self.shared.append(batch_number);

            for r in 0..config.num_replicas() {
                batch.dest_node = config.lookup_machine(config.hash_batch_id(batch_number), r);
                self.shared.conn.send(batch.clone());
            }

            debug!(self.shared.logger, "merged remote batch";
                   "from" => from, "batch_id" => batch_id, "renumbered" => batch_number);
        }

        Ok(())
    }

    /// wait_for_payload blocks until the payload for a batch id arrives,
    /// draining inbound control messages while polling so that the awaited
    /// payload can actually be received.
    fn wait_for_payload(&mut self, batch_id: u64) -> Result<Envelope, SequencerError> {
        loop {
            if let Some(payload) = self.mr_txn_batches.remove(&batch_id) {
                return Ok(payload);
            }
            if self.shared.stopped() {
                return Err(SequencerError::Stopped);
            }
            self.drain_inbound()?;
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// ship_backlogs sends the local-log backlog to every replica holding a
    /// shipment credit.
    fn ship_backlogs(&mut self) -> Result<(), SequencerError> {
        let others: Vec<ReplicaId> = self.flow.keys().copied().collect();
        for r in others {
            if self.flow[&r].can_ship {
                self.ship_backlog(r)?;
            }
        }
        Ok(())
    }

    /// ship_backlog reads everything the replica has not seen yet off this
    /// replica's cursor and ships it as one SequenceBatch. An empty backlog
    /// keeps the credit.
    fn ship_backlog(&mut self, to: ReplicaId) -> Result<(), SequencerError> {
        let reader = match self.backlog_readers.get_mut(&to) {
            Some(r) => r,
            None => return Ok(()),
        };

        let mut batch = SequenceBatch::default();
        let mut latest_version = 0;

        while reader.next() {
            latest_version = reader.version();
            let seq = Sequence::decode(reader.entry())?;
            batch.sequences.push(seq);
        }

        if batch.sequences.is_empty() {
            return Ok(());
        }

        let mut env = Envelope::of(MsgType::NewSequence, PAXOS_LOG_CHANNEL);
        env.data.push(encode_to_vec(&batch));
        env.misc_int.push(self.shared.config.local_replica() as u64);
        env.misc_int.push(latest_version);
        env.dest_node = self.shared.config.leader_of(to);
        self.shared.conn.send(env);

        if let Some(f) = self.flow.get_mut(&to) {
            f.can_ship = false;
        }

        Ok(())
    }

    /// credit_remote accounts one processed remote round and returns the
    /// shipment credit to the origin once its whole shipment is processed.
    fn credit_remote(&mut self, from: ReplicaId) {
        let f = match self.flow.get_mut(&from) {
            Some(f) => f,
            None => return,
        };

        f.processed_version += 1;
        if f.processed_version != f.received_version {
            return;
        }

        let mut env = Envelope::of(MsgType::NewSequenceAck, PAXOS_LOG_CHANNEL);
        env.misc_int.push(self.shared.config.local_replica() as u64);
        env.dest_node = self.shared.config.leader_of(from);
        self.shared.conn.send(env);
    }

    /// drain_inbound handles all queued control messages without blocking.
    pub fn drain_inbound(&mut self) -> Result<(), SequencerError> {
        while let Some(env) = self.shared.conn.poll(PAXOS_LOG_CHANNEL) {
            self.handle_control(env)?;
        }
        Ok(())
    }

    /// handle_control dispatches one inbound control message.
    pub fn handle_control(&mut self, env: Envelope) -> Result<(), SequencerError> {
        if env.is(MsgType::MrTxnsBatch) {
            let batch_id = misc(&env, 0)?;
            self.mr_txn_batches.insert(batch_id, env);
        } else if env.is(MsgType::NewSequence) {
            let from = misc(&env, 0)? as ReplicaId;
            let latest_version = misc(&env, 1)?;

            if let Some(f) = self.flow.get_mut(&from) {
                f.received_version = latest_version;
            }

            let buf = env
                .data
                .get(0)
                .ok_or_else(|| SequencerError::BadEnvelope("NEW_SEQUENCE without data".into()))?;
            let batch = SequenceBatch::decode(buf.as_slice())?;
            for seq in batch.sequences {
                self.remote_sequences.push_back((seq, from));
            }
        } else if env.is(MsgType::NewSequenceAck) {
            let from = misc(&env, 0)? as ReplicaId;
            if let Some(f) = self.flow.get_mut(&from) {
                f.can_ship = true;
            }
            self.ship_backlog(from)?;
        } else if env.is(MsgType::PaxosDataAck) {
            // a quorum already formed without it; stale by definition
            debug!(self.shared.logger, "late ack discarded";
                   "from" => env.source_node);
        } else {
            warn!(self.shared.logger, "unexpected message on paxos channel";
                  "type" => env.msg_type, "from" => env.source_node);
        }

        Ok(())
    }
}
