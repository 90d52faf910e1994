//! Chain state: the singleton head, block append paths, and UTXO derivation.
//!
//! The chain is a singly-linked list keyed by hash through the storage
//! adapter; only the head metadata lives outside the blocks bucket. The head
//! is guarded by an exclusive lock held for the duration of every operation,
//! including the proof-of-work search in [`Chain::add_block`] (local mining
//! therefore serializes against block acceptance from peers).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::block::Block;
use crate::codec;
use crate::constants::{COINBASE_SIGNATURE, DEFAULT_DIFFICULTY};
use crate::difficulty;
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::storage::Storage;
use crate::traits::Signer;
use crate::transaction::{self, Tx, UTxOut};

/// Persisted chain head metadata. Doubles as the `/status` payload.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct ChainHead {
    pub last_hash: String,
    pub height: u64,
    pub curr_difficulty: u64,
}

/// The blockchain singleton.
pub struct Chain {
    store: Arc<dyn Storage>,
    head: Mutex<ChainHead>,
}

impl Chain {
    /// Load the persisted chain head, or mine the genesis block on first
    /// boot. Genesis goes through the internal append directly rather than
    /// any singleton accessor, so initialization cannot recurse.
    pub fn load_or_create(
        store: Arc<dyn Storage>,
        mempool: &Mempool,
        signer: &dyn Signer,
    ) -> Result<Self, ChainError> {
        if let Some(bytes) = store.load_chain()? {
            let head: ChainHead = codec::from_bytes(&bytes)?;
            info!(height = head.height, "loaded existing chain");
            return Ok(Self { store, head: Mutex::new(head) });
        }

        let chain = Self {
            store,
            head: Mutex::new(ChainHead {
                last_hash: String::new(),
                height: 0,
                curr_difficulty: DEFAULT_DIFFICULTY,
            }),
        };
        chain.add_block(mempool, signer)?;
        info!("mined genesis block");
        Ok(chain)
    }

    /// Mine and commit the next block.
    ///
    /// Holds the chain lock for the whole proof-of-work search; the mempool
    /// lock is taken after it, inside [`Mempool::confirm_txs`]. Returns the
    /// new block so the caller can broadcast it.
    pub fn add_block(&self, mempool: &Mempool, signer: &dyn Signer) -> Result<Block, ChainError> {
        let mut head = self.head.lock();
        let next_difficulty =
            difficulty::next_difficulty(&head, || self.walk(&head.last_hash))?;
        let transactions = mempool.confirm_txs(signer)?;

        let mut block = Block::new(
            head.last_hash.clone(),
            head.height + 1,
            next_difficulty,
            transactions,
        );
        block.mine()?;
        self.commit(&mut head, &block)?;
        info!(height = block.height, hash = %block.hash, "mined block");
        Ok(block)
    }

    /// Accept a block announced by a peer.
    ///
    /// Bumps the height by one and adopts the block's hash and difficulty as
    /// the new head without validating linkage or proof-of-work, then drops
    /// every transaction the block confirmed from the mempool. Never mines,
    /// never re-broadcasts.
    pub fn add_block_from_peer(&self, mempool: &Mempool, block: &Block) -> Result<(), ChainError> {
        let mut head = self.head.lock();
        self.store.save_block(&block.hash, &codec::to_bytes(block)?)?;
        head.height += 1;
        head.last_hash = block.hash.clone();
        head.curr_difficulty = block.difficulty;
        self.store.save_chain(&codec::to_bytes(&*head)?)?;
        mempool.remove_confirmed(block);
        info!(height = head.height, hash = %block.hash, "accepted block from peer");
        Ok(())
    }

    /// Replace the whole chain with a peer's copy (newest-first).
    ///
    /// Adopts the incoming head, wipes the blocks bucket, and rewrites every
    /// block. The incoming chain is not verified. An empty list is rejected
    /// as malformed.
    pub fn replace(&self, blocks: &[Block]) -> Result<(), ChainError> {
        let newest = blocks.first().ok_or(ChainError::EmptyChain)?;
        let mut head = self.head.lock();
        head.last_hash = newest.hash.clone();
        head.height = blocks.len() as u64;
        head.curr_difficulty = newest.difficulty;
        self.store.save_chain(&codec::to_bytes(&*head)?)?;
        self.store.empty_blocks()?;
        for block in blocks {
            self.store.save_block(&block.hash, &codec::to_bytes(block)?)?;
        }
        info!(height = head.height, "replaced chain from peer");
        Ok(())
    }

    /// All blocks, head to genesis.
    pub fn blocks(&self) -> Result<Vec<Block>, ChainError> {
        let head = self.head.lock();
        self.walk(&head.last_hash)
    }

    /// Snapshot of the chain head.
    pub fn status(&self) -> ChainHead {
        self.head.lock().clone()
    }

    /// Fetch a block by hash.
    pub fn find_block(&self, hash: &str) -> Result<Block, ChainError> {
        self.read_block(hash)?.ok_or(ChainError::BlockNotFound)
    }

    /// The block at the head of the chain.
    pub fn newest_block(&self) -> Result<Block, ChainError> {
        let last_hash = self.head.lock().last_hash.clone();
        self.find_block(&last_hash)
    }

    /// First transaction with the given id, searching from the head.
    pub fn find_tx(&self, id: &str) -> Result<Option<Tx>, ChainError> {
        for block in self.blocks()? {
            if let Some(tx) = block.transactions.into_iter().find(|tx| tx.id == id) {
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    /// Unspent outputs addressed to `address`, in derivation order.
    ///
    /// Walks head to genesis keeping a set of transactions whose outputs for
    /// this address have been consumed by a later input; an output is yielded
    /// only if its creating transaction is not in that set and no pending
    /// transaction in `pending` already spends it. The spent-set is keyed by
    /// whole transaction, so sibling outputs of a partially spent transaction
    /// are dropped together.
    pub fn utxouts_by_address(
        &self,
        address: &str,
        pending: &[Tx],
    ) -> Result<Vec<UTxOut>, ChainError> {
        let blocks = self.blocks()?;

        // Head-first index so input resolution keeps first-match semantics.
        let mut txs_by_id: HashMap<&str, &Tx> = HashMap::new();
        for block in &blocks {
            for tx in &block.transactions {
                txs_by_id.entry(tx.id.as_str()).or_insert(tx);
            }
        }

        let mut spent_creator_txs: HashSet<&str> = HashSet::new();
        let mut utxos = Vec::new();
        for block in &blocks {
            for tx in &block.transactions {
                for input in &tx.tx_ins {
                    if input.signature == COINBASE_SIGNATURE {
                        continue;
                    }
                    let Some(prev) = txs_by_id.get(input.tx_id.as_str()) else {
                        continue;
                    };
                    let referenced = usize::try_from(input.index)
                        .ok()
                        .and_then(|i| prev.tx_outs.get(i));
                    if referenced.is_some_and(|out| out.address == address) {
                        spent_creator_txs.insert(input.tx_id.as_str());
                    }
                }
                for (index, output) in tx.tx_outs.iter().enumerate() {
                    if output.address != address || spent_creator_txs.contains(tx.id.as_str()) {
                        continue;
                    }
                    let utxo = UTxOut {
                        tx_id: tx.id.clone(),
                        index: index as i64,
                        amount: output.amount,
                    };
                    if !transaction::is_on_mempool(pending, &utxo) {
                        utxos.push(utxo);
                    }
                }
            }
        }
        Ok(utxos)
    }

    /// Total unspent amount addressed to `address`.
    pub fn balance_by_address(&self, address: &str, pending: &[Tx]) -> Result<u64, ChainError> {
        Ok(self
            .utxouts_by_address(address, pending)?
            .iter()
            .map(|utxo| utxo.amount)
            .sum())
    }

    /// Commit a block and advance the head. Caller holds the head lock.
    fn commit(&self, head: &mut ChainHead, block: &Block) -> Result<(), ChainError> {
        self.store.save_block(&block.hash, &codec::to_bytes(block)?)?;
        head.last_hash = block.hash.clone();
        head.height = block.height;
        head.curr_difficulty = block.difficulty;
        self.store.save_chain(&codec::to_bytes(&*head)?)?;
        Ok(())
    }

    /// Follow `prev_hash` links from `from` down to genesis.
    fn walk(&self, from: &str) -> Result<Vec<Block>, ChainError> {
        let mut blocks = Vec::new();
        let mut hash = from.to_string();
        while !hash.is_empty() {
            let block = self.read_block(&hash)?.ok_or(ChainError::BlockNotFound)?;
            hash = block.prev_hash.clone();
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn read_block(&self, hash: &str) -> Result<Option<Block>, ChainError> {
        match self.store.find_block(hash)? {
            Some(bytes) => Ok(Some(codec::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}
