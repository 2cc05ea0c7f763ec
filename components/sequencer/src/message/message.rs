//! all protocol payloads are serialized with prost.
//! `Envelope` is the transmission wrapper: the meaning of `data` and
//! `misc_int` entries is positional and differs per message type.

use prost::Message;

#[cfg(test)]
#[path = "./tests/message_tests.rs"]
mod tests;

/// MsgType tags an Envelope with its protocol role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MsgType {
    /// leader proposal: data[0]=encoded sequence, misc_int[0]=global version,
    /// misc_int[1]=local version when the round is of local origin.
    PaxosData = 0,
    /// follower acknowledgement: misc_int[0]=acked global version.
    PaxosDataAck = 1,
    /// leader commit notice, payload cleared.
    PaxosCommit = 2,
    /// leader to scheduler: committed order, same payload as the proposal.
    PaxosBatchOrder = 3,
    /// replica backlog shipment: data[0]=encoded SequenceBatch,
    /// misc_int[0]=origin replica, misc_int[1]=latest shipped local version.
    NewSequence = 4,
    /// backlog shipment credit return: misc_int[0]=origin replica.
    NewSequenceAck = 5,
    /// multi-replica batch payload: misc_int[0]=batch id, data=txns.
    MrTxnsBatch = 6,
    /// re-stamped merged batch: data=txns, batch_number set.
    TxnBatch = 7,
    /// cross-partition read broadcast: parallel keys/values lists.
    ReadResult = 8,
}

/// Envelope wraps one protocol message for transmission on a named channel.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(enumeration = "MsgType", tag = "1")]
    pub msg_type: i32,
    #[prost(string, tag = "2")]
    pub channel: String,
    #[prost(uint64, tag = "3")]
    pub dest_node: u64,
    #[prost(uint64, tag = "4")]
    pub source_node: u64,
    #[prost(bytes, repeated, tag = "5")]
    pub data: Vec<Vec<u8>>,
    #[prost(uint64, repeated, tag = "6")]
    pub misc_int: Vec<u64>,
    #[prost(bool, repeated, tag = "7")]
    pub misc_bool: Vec<bool>,
    #[prost(bytes, repeated, tag = "8")]
    pub keys: Vec<Vec<u8>>,
    #[prost(bytes, repeated, tag = "9")]
    pub values: Vec<Vec<u8>>,
    #[prost(uint64, tag = "10")]
    pub batch_number: u64,
}

impl Envelope {
    pub fn of(msg_type: MsgType, channel: &str) -> Envelope {
        Envelope {
            msg_type: msg_type as i32,
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn is(&self, msg_type: MsgType) -> bool {
        self.msg_type == msg_type as i32
    }
}

/// Sequence is one consensus round's agreed ordered list of batch ids.
#[derive(Clone, PartialEq, Message)]
pub struct Sequence {
    #[prost(uint64, repeated, tag = "1")]
    pub batch_ids: Vec<u64>,
}

impl From<&[u64]> for Sequence {
    fn from(ids: &[u64]) -> Sequence {
        Sequence {
            batch_ids: ids.to_vec(),
        }
    }
}

/// SequenceBatch ships a replica's backlog of sequences to another replica.
#[derive(Clone, PartialEq, Message)]
pub struct SequenceBatch {
    #[prost(message, repeated, tag = "1")]
    pub sequences: Vec<Sequence>,
}

/// Txn is the transaction descriptor as admitted by the sequencing layer.
/// It is immutable once admitted, except for the one-time re-stamping when a
/// batch crosses from another replica's order into the local one.
#[derive(Clone, PartialEq, Message)]
pub struct Txn {
    #[prost(uint64, tag = "1")]
    pub txn_id: u64,
    #[prost(bytes, repeated, tag = "2")]
    pub read_set: Vec<Vec<u8>>,
    #[prost(bytes, repeated, tag = "3")]
    pub write_set: Vec<Vec<u8>>,
    #[prost(bytes, repeated, tag = "4")]
    pub read_write_set: Vec<Vec<u8>>,
    #[prost(uint64, repeated, tag = "5")]
    pub readers: Vec<u64>,
    #[prost(uint64, repeated, tag = "6")]
    pub writers: Vec<u64>,
    #[prost(uint32, tag = "7")]
    pub origin_replica: u32,
    /// placeholder stand-in generated for a multi-replica transaction;
    /// cleared when the real order is merged in.
    #[prost(bool, tag = "8")]
    pub fake_txn: bool,
    #[prost(bool, tag = "9")]
    pub new_generated: bool,
}

impl Txn {
    /// re-stamp marks a txn as merged into the local replica's order.
    /// Called exactly once, by the leader of the absorbing replica.
    pub fn restamp(&mut self, local_replica: u32) {
        if self.fake_txn {
            self.fake_txn = false;
        }
        self.new_generated = true;
        self.origin_replica = local_replica;
    }
}

pub fn encode_to_vec<M: Message>(m: &M) -> Vec<u8> {
    let mut buf = Vec::with_capacity(m.encoded_len());
    // encoding into a Vec only fails on insufficient capacity
    m.encode(&mut buf).unwrap();
    buf
}
