use crate::message::Envelope;

/// Connection is one node's handle onto the message transport: named,
/// asynchronous, per-destination mailboxes with non-blocking poll.
/// Delivery is reliable and order-preserving per sender/destination pair;
/// the consensus protocol assumes this and does not re-derive it.
pub trait Connection: Send + Sync {
    /// node_id this connection sends from.
    fn node_id(&self) -> u64;

    /// new_channel registers a named mailbox on the local node.
    fn new_channel(&self, channel: &str);

    /// close_channel drops a named mailbox and its queued messages.
    fn close_channel(&self, channel: &str);

    /// send routes an envelope to (env.dest_node, env.channel).
    fn send(&self, env: Envelope);

    /// poll takes the oldest queued envelope off a local mailbox, if any.
    fn poll(&self, channel: &str) -> Option<Envelope>;
}
