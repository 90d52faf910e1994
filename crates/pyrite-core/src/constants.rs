//! Protocol constants. Amounts are whole coins; there are no sub-units.

/// Reward paid to the miner by the coinbase transaction of each block.
pub const MINER_REWARD: u64 = 50;

/// Difficulty of the genesis block and the floor for an empty chain.
pub const DEFAULT_DIFFICULTY: u64 = 2;

/// Recalculate difficulty every this many blocks.
pub const DIFFICULTY_INTERVAL: u64 = 5;

/// Target block interval in minutes.
pub const EXPECTED_MINS_PER_BLOCK: i64 = 2;

/// Tolerance band, in minutes, around the expected window duration.
pub const ALLOWED_WINDOW_MINS: i64 = 2;

/// Sentinel signature marking a coinbase input.
pub const COINBASE_SIGNATURE: &str = "COINBASE";

/// Sentinel output index for a coinbase input.
pub const COINBASE_INPUT_INDEX: i64 = -1;

/// Default HTTP/gossip listen port.
pub const DEFAULT_PORT: u16 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_window_is_ten_minutes() {
        assert_eq!(DIFFICULTY_INTERVAL as i64 * EXPECTED_MINS_PER_BLOCK, 10);
    }
}
