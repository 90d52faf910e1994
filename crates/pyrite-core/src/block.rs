//! Block layout and proof-of-work mining.

use serde::{Deserialize, Serialize};

use crate::codec::{self, now_unix};
use crate::error::CodecError;
use crate::transaction::Tx;

/// A proof-of-work block.
///
/// `hash` is the hex SHA-256 of the block's binary encoding with the hash
/// field cleared, and must start with `difficulty` hex zeros. `prev_hash` is
/// empty for the genesis block; `height` is 1-indexed.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Block {
    pub hash: String,
    pub prev_hash: String,
    pub height: u64,
    pub difficulty: u64,
    pub nonce: u64,
    /// Unix seconds; refreshed on every mining iteration.
    pub timestamp: i64,
    pub transactions: Vec<Tx>,
}

impl Block {
    /// Create an unmined block ready for [`Block::mine`].
    pub fn new(prev_hash: String, height: u64, difficulty: u64, transactions: Vec<Tx>) -> Self {
        Self {
            hash: String::new(),
            prev_hash,
            height,
            difficulty,
            nonce: 0,
            timestamp: 0,
            transactions,
        }
    }

    /// Hash of this block with its hash field cleared.
    pub fn compute_hash(&self) -> Result<String, CodecError> {
        let mut cleared = self.clone();
        cleared.hash.clear();
        codec::hash_of(&cleared)
    }

    /// Find a nonce whose hash carries `difficulty` leading hex zeros.
    ///
    /// Tight spinloop; the timestamp is refreshed every iteration so two
    /// honest miners working on the same parent still diverge.
    pub fn mine(&mut self) -> Result<(), CodecError> {
        let target = "0".repeat(self.difficulty as usize);
        loop {
            self.timestamp = now_unix();
            let hash = self.compute_hash()?;
            if hash.starts_with(&target) {
                self.hash = hash;
                return Ok(());
            }
            self.nonce += 1;
        }
    }

    /// Check that the recorded hash matches the block's contents and carries
    /// the required leading zeros.
    pub fn verify_pow(&self) -> Result<bool, CodecError> {
        let target = "0".repeat(self.difficulty as usize);
        Ok(self.hash.starts_with(&target) && self.compute_hash()? == self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_bytes, to_bytes};

    fn mined_block(difficulty: u64) -> Block {
        let mut block = Block::new(String::new(), 1, difficulty, vec![]);
        block.mine().unwrap();
        block
    }

    #[test]
    fn mine_satisfies_difficulty() {
        let block = mined_block(2);
        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash.len(), 64);
    }

    #[test]
    fn mined_hash_matches_contents() {
        let block = mined_block(1);
        assert_eq!(block.compute_hash().unwrap(), block.hash);
        assert!(block.verify_pow().unwrap());
    }

    #[test]
    fn tampered_block_fails_pow() {
        let mut block = mined_block(1);
        block.nonce += 1;
        assert!(!block.verify_pow().unwrap());
    }

    #[test]
    fn zero_difficulty_accepts_first_hash() {
        let mut block = Block::new("ff".into(), 2, 0, vec![]);
        block.mine().unwrap();
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn bincode_round_trip() {
        let block = mined_block(1);
        let back: Block = from_bytes(&to_bytes(&block).unwrap()).unwrap();
        assert_eq!(block, back);
    }

    #[test]
    fn json_field_names() {
        let block = mined_block(0);
        let json = serde_json::to_value(&block).unwrap();
        assert!(json.get("prev_hash").is_some());
        assert!(json.get("transactions").is_some());
    }
}
