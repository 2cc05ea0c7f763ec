/// quorum is the minimum acknowledging participant count, leader included,
/// for a round to commit.
pub fn quorum(n: usize) -> usize {
    n / 2 + 1
}
