use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use slog::Logger;

use crate::conf::ClusterConfig;
use crate::log::MemLog;
use crate::message::{Envelope, Sequence};
use crate::paxos::{Follower, Leader, SequencerError};
use crate::transport::Connection;

/// channel carrying consensus traffic between the participants of a replica.
pub const PAXOS_LOG_CHANNEL: &str = "paxos_log";
/// channel the committed order is forwarded on, one copy per replica node.
pub const SCHEDULER_CHANNEL: &str = "scheduler";
/// channel merged multi-replica batches are forwarded on.
pub const SEQUENCER_CHANNEL: &str = "sequencer";

/// interval of the bounded polling used at every wait point.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_micros(20);

/// State shared between the producer-side `append` and the consensus loop.
pub struct SequencerShared {
    pub config: Arc<ClusterConfig>,
    pub conn: Arc<dyn Connection>,
    pub local_log: Arc<MemLog>,
    pub global_log: Arc<MemLog>,
    pub logger: Logger,

    pending: Mutex<Sequence>,
    pending_count: AtomicU64,
    stop: AtomicBool,
}

impl SequencerShared {
    pub fn new(config: Arc<ClusterConfig>, conn: Arc<dyn Connection>, logger: Logger) -> Self {
        SequencerShared {
            config,
            conn,
            local_log: MemLog::new(),
            global_log: MemLog::new(),
            logger,
            pending: Mutex::new(Sequence::default()),
            pending_count: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        }
    }

    /// append adds a batch id to the pending local sequence.
    /// Callable from any thread; the drain in the leader loop is atomic with
    /// respect to concurrent appenders.
    pub fn append(&self, batch_id: u64) {
        let mut pending = self.pending.lock().unwrap();
        pending.batch_ids.push(batch_id);
        self.pending_count.fetch_add(1, Ordering::Release);
    }

    /// has_pending is the lock-free fast path of the leader's round choice.
    pub fn has_pending(&self) -> bool {
        self.pending_count.load(Ordering::Acquire) > 0
    }

    /// take_pending snapshots and clears the pending sequence in one step.
    pub(crate) fn take_pending(&self) -> Sequence {
        let mut pending = self.pending.lock().unwrap();
        self.pending_count.store(0, Ordering::Release);
        mem::take(&mut *pending)
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn set_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// ReplicatedSequencer establishes one globally agreed order of batch ids
/// within the local replica group and merges orders from other replicas.
///
/// Exactly one participant per group runs the leader loop (the lowest node
/// id), the rest run follower loops; the role never changes for the lifetime
/// of the instance.
pub struct ReplicatedSequencer {
    shared: Arc<SequencerShared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReplicatedSequencer {
    /// start spawns the consensus loop for this node's role.
    pub fn start(
        config: Arc<ClusterConfig>,
        conn: Arc<dyn Connection>,
        logger: Logger,
    ) -> ReplicatedSequencer {
        conn.new_channel(PAXOS_LOG_CHANNEL);

        let shared = Arc::new(SequencerShared::new(config, conn, logger));

        let is_leader = shared.config.is_leader();
        let name = if is_leader {
            "paxos-leader"
        } else {
            "paxos-follower"
        };

        let sh = shared.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let rst = if is_leader {
                    Leader::new(sh.clone()).run()
                } else {
                    Follower::new(sh.clone()).run()
                };

                if let Err(e) = rst {
                    crit!(sh.logger, "consensus loop failed"; "err" => format!("{}", e));
                    panic!("consensus loop failed: {}", e);
                }
            })
            .unwrap();

        ReplicatedSequencer {
            shared,
            handle: Some(handle),
        }
    }

    /// append submits a batch id for ordering.
    pub fn append(&self, batch_id: u64) {
        self.shared.append(batch_id);
    }

    pub fn is_leader(&self) -> bool {
        self.shared.config.is_leader()
    }

    pub fn local_log(&self) -> Arc<MemLog> {
        self.shared.local_log.clone()
    }

    pub fn global_log(&self) -> Arc<MemLog> {
        self.shared.global_log.clone()
    }

    /// stop signals the loop and joins it.
    /// The flag is observed at the next wait point; cancellation is
    /// cooperative only.
    pub fn stop(&mut self) {
        self.shared.set_stop();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                crit!(self.shared.logger, "consensus thread panicked");
            }
        }
    }
}

impl Drop for ReplicatedSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// wait_poll polls a channel until a message or the stop flag shows up.
pub(crate) fn wait_poll(
    shared: &SequencerShared,
    channel: &str,
) -> Result<Envelope, SequencerError> {
    loop {
        if shared.stopped() {
            return Err(SequencerError::Stopped);
        }
        match shared.conn.poll(channel) {
            Some(env) => return Ok(env),
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

/// misc reads a positional side-field, faulting on absence.
pub(crate) fn misc(env: &Envelope, at: usize) -> Result<u64, SequencerError> {
    env.misc_int
        .get(at)
        .copied()
        .ok_or_else(|| SequencerError::BadEnvelope(format!("missing misc_int[{}]", at)))
}
