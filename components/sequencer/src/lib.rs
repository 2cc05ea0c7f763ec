#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate slog;

pub mod conf;
pub mod coordinator;
pub mod log;
pub mod message;
pub mod paxos;
pub mod transport;
