use std::collections::VecDeque;
use std::sync::Arc;

use crate::message::{Envelope, MsgType};
use crate::paxos::sequencer::{misc, wait_poll, SequencerShared, PAXOS_LOG_CHANNEL};
use crate::paxos::SequencerError;

#[cfg(test)]
#[path = "./tests/follower_tests.rs"]
mod tests;

/// Follower acknowledges proposals and applies commits in receipt order.
///
/// Commit order must exactly match proposal-receipt order: proposals and
/// commit notices are paired FIFO, and a commit without a pending proposal
/// is fatal.
pub struct Follower {
    shared: Arc<SequencerShared>,
    uncommitted: VecDeque<Envelope>,
}

impl Follower {
    pub fn new(shared: Arc<SequencerShared>) -> Follower {
        Follower {
            shared,
            uncommitted: VecDeque::new(),
        }
    }

    pub fn run(&mut self) -> Result<(), SequencerError> {
        info!(self.shared.logger, "follower loop started";
              "node" => self.shared.config.local_node(),
              "replica" => self.shared.config.local_replica());

        loop {
            let env = match wait_poll(&self.shared, PAXOS_LOG_CHANNEL) {
                Ok(env) => env,
                Err(SequencerError::Stopped) => return Ok(()),
                Err(e) => return Err(e),
            };

            self.handle(env)?;
        }
    }

    /// handle applies one inbound message from the leader.
    pub fn handle(&mut self, env: Envelope) -> Result<(), SequencerError> {
        if env.is(MsgType::PaxosData) {
            let version = misc(&env, 0)?;
            self.uncommitted.push_back(env);

            let mut ack = Envelope::of(MsgType::PaxosDataAck, PAXOS_LOG_CHANNEL);
            ack.misc_int.push(version);
            ack.dest_node = self.shared.config.participants()[0];
            self.shared.conn.send(ack);
        } else if env.is(MsgType::PaxosCommit) {
            let proposal = self
                .uncommitted
                .pop_front()
                .ok_or(SequencerError::CommitWithoutProposal)?;

            let global_version = misc(&proposal, 0)?;
            let data = proposal.data.get(0).cloned().unwrap_or_default();

            self.shared.global_log.append(global_version, data.clone());
            if proposal.misc_int.len() > 1 {
                self.shared.local_log.append(proposal.misc_int[1], data);
            }
        } else {
            warn!(self.shared.logger, "unexpected message on paxos channel";
                  "type" => env.msg_type, "from" => env.source_node);
        }

        Ok(())
    }

    /// uncommitted_len reports the depth of the proposal queue.
    pub fn uncommitted_len(&self) -> usize {
        self.uncommitted.len()
    }
}
