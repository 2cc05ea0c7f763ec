mod errors;
pub use errors::*;

mod quorums;
pub use quorums::*;

mod sequencer;
pub use sequencer::*;

mod leader;
pub use leader::*;

mod follower;
pub use follower::*;

#[cfg(test)]
mod test_quorums;
