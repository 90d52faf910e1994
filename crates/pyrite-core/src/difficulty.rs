//! Difficulty adjustment.
//!
//! Every [`DIFFICULTY_INTERVAL`] blocks the chain compares how long the last
//! interval actually took (whole minutes, integer division) against the
//! expected ten minutes and moves the difficulty one step if the elapsed time
//! falls outside the ±[`ALLOWED_WINDOW_MINS`] band. Heights in between keep
//! the current difficulty unchanged.

use crate::block::Block;
use crate::chain::ChainHead;
use crate::constants::{
    ALLOWED_WINDOW_MINS, DEFAULT_DIFFICULTY, DIFFICULTY_INTERVAL, EXPECTED_MINS_PER_BLOCK,
};
use crate::error::ChainError;

/// Difficulty for the next block to be mined on `head`.
///
/// `recent_blocks` supplies the chain newest-first and is only invoked when
/// the head height lands on a recalculation boundary.
pub fn next_difficulty(
    head: &ChainHead,
    recent_blocks: impl FnOnce() -> Result<Vec<Block>, ChainError>,
) -> Result<u64, ChainError> {
    if head.height == 0 {
        return Ok(DEFAULT_DIFFICULTY);
    }
    if head.height % DIFFICULTY_INTERVAL != 0 {
        return Ok(head.curr_difficulty);
    }
    Ok(recalculate(head.curr_difficulty, &recent_blocks()?))
}

/// Recalculate using the newest block and the block one interval back.
fn recalculate(curr_difficulty: u64, blocks: &[Block]) -> u64 {
    let Some(newest) = blocks.first() else {
        return curr_difficulty;
    };
    let Some(last_update) = blocks.get(DIFFICULTY_INTERVAL as usize - 1) else {
        return curr_difficulty;
    };

    let actual_mins = (newest.timestamp - last_update.timestamp) / 60;
    let expected_mins = DIFFICULTY_INTERVAL as i64 * EXPECTED_MINS_PER_BLOCK;

    if actual_mins < expected_mins - ALLOWED_WINDOW_MINS {
        curr_difficulty + 1
    } else if actual_mins > expected_mins + ALLOWED_WINDOW_MINS {
        curr_difficulty.saturating_sub(1)
    } else {
        curr_difficulty
    }
}
