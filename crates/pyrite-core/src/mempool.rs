//! Pool of accepted-but-unconfirmed transactions.
//!
//! Insertion order is preserved and becomes block order (coinbase last).
//! The pool never re-broadcasts; gossip fan-out belongs to whichever entry
//! point first accepted the transaction from a local user.
//!
//! Lock discipline: candidate transactions are built and validated *before*
//! the pool lock is taken, so the chain lock is never requested while the
//! pool lock is held. Code that takes both locks (block acceptance) goes
//! chain first, then pool.

use parking_lot::Mutex;
use tracing::debug;

use crate::block::Block;
use crate::chain::Chain;
use crate::error::{CodecError, TxError};
use crate::traits::Signer;
use crate::transaction::{self, Tx};

/// Unconfirmed transactions keyed by id, in insertion order.
pub struct Mempool {
    txs: Mutex<Vec<Tx>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self { txs: Mutex::new(Vec::new()) }
    }

    /// Copy of the current pool contents.
    pub fn snapshot(&self) -> Vec<Tx> {
        self.txs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.txs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.lock().is_empty()
    }

    /// Build a transaction from the local wallet and admit it to the pool.
    ///
    /// Fails with [`TxError::InsufficientFunds`] when the wallet balance
    /// (net of outputs already spoken for by the pool) cannot cover `amount`,
    /// or with a validation error if assembly produced an unverifiable
    /// transaction.
    pub fn add_tx(
        &self,
        chain: &Chain,
        signer: &dyn Signer,
        to: &str,
        amount: u64,
    ) -> Result<Tx, TxError> {
        let pending = self.snapshot();
        let tx = transaction::make_tx(chain, &pending, signer, to, amount)?;
        self.txs.lock().push(tx.clone());
        debug!(id = %tx.id, "transaction admitted to mempool");
        Ok(tx)
    }

    /// Admit a transaction received over gossip.
    ///
    /// Re-validates against the current chain and inserts unless a
    /// transaction with the same id is already pooled. Returns whether the
    /// transaction was inserted. Never re-broadcasts.
    pub fn add_tx_from_peer(&self, chain: &Chain, tx: Tx) -> Result<bool, TxError> {
        transaction::validate(chain, &tx)?;
        let mut pool = self.txs.lock();
        if pool.iter().any(|pooled| pooled.id == tx.id) {
            return Ok(false);
        }
        debug!(id = %tx.id, "transaction admitted from peer");
        pool.push(tx);
        Ok(true)
    }

    /// Drain the pool for block inclusion: every pooled transaction in
    /// insertion order, then a fresh coinbase paying `signer`.
    ///
    /// Called exactly once per locally mined block, under the chain lock.
    pub fn confirm_txs(&self, signer: &dyn Signer) -> Result<Vec<Tx>, CodecError> {
        let coinbase = Tx::coinbase(&signer.address())?;
        let mut pool = self.txs.lock();
        let mut txs: Vec<Tx> = pool.drain(..).collect();
        txs.push(coinbase);
        Ok(txs)
    }

    /// Drop every pooled transaction that appears in the given block.
    pub fn remove_confirmed(&self, block: &Block) {
        let mut pool = self.txs.lock();
        pool.retain(|pooled| !block.transactions.iter().any(|tx| tx.id == pooled.id));
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::constants::{COINBASE_SIGNATURE, MINER_REWARD};
    use crate::testing::TestSigner;

    fn dummy_tx(id: &str) -> Tx {
        Tx { id: id.into(), timestamp: 0, tx_ins: vec![], tx_outs: vec![] }
    }

    #[test]
    fn confirm_appends_coinbase_last_and_empties() {
        let mempool = Mempool::new();
        let signer = TestSigner::new();
        mempool.txs.lock().push(dummy_tx("a"));
        mempool.txs.lock().push(dummy_tx("b"));

        let txs = mempool.confirm_txs(&signer).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].id, "a");
        assert_eq!(txs[1].id, "b");
        let coinbase = &txs[2];
        assert_eq!(coinbase.tx_ins[0].signature, COINBASE_SIGNATURE);
        assert_eq!(coinbase.tx_outs[0].amount, MINER_REWARD);
        assert_eq!(coinbase.tx_outs[0].address, signer.address());
        assert!(mempool.is_empty());
    }

    #[test]
    fn confirm_on_empty_pool_is_coinbase_only() {
        let mempool = Mempool::new();
        let signer = TestSigner::new();
        let txs = mempool.confirm_txs(&signer).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_ins[0].signature, COINBASE_SIGNATURE);
    }

    #[test]
    fn remove_confirmed_drops_only_included() {
        let mempool = Mempool::new();
        mempool.txs.lock().push(dummy_tx("keep"));
        mempool.txs.lock().push(dummy_tx("gone"));

        let mut block = Block::new(String::new(), 1, 0, vec![dummy_tx("gone")]);
        block.mine().unwrap();
        mempool.remove_confirmed(&block);

        let rest = mempool.snapshot();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "keep");
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mempool = Mempool::new();
        mempool.txs.lock().push(dummy_tx("a"));
        let snap = mempool.snapshot();
        mempool.txs.lock().clear();
        assert_eq!(snap.len(), 1);
    }
}
