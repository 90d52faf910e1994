//! Transactions, UTXO views, assembly, and validation.

use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::codec::{self, now_unix};
use crate::constants::{COINBASE_INPUT_INDEX, COINBASE_SIGNATURE, MINER_REWARD};
use crate::crypto;
use crate::error::{CodecError, TxError};
use crate::traits::Signer;

/// A pay-to-address transaction.
///
/// `id` is the hex SHA-256 of the transaction's binary encoding with the id
/// field cleared. Inputs are signed over `id`, so the id is fixed at
/// assembly time and never recomputed afterwards.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Tx {
    pub id: String,
    pub timestamp: i64,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

/// A reference to a prior transaction output being spent.
///
/// A coinbase input carries `tx_id = ""`, `index = -1`, and the literal
/// `COINBASE` signature.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxIn {
    pub tx_id: String,
    pub index: i64,
    pub signature: String,
}

/// A newly created output paying `amount` to `address`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOut {
    pub address: String,
    pub amount: u64,
}

/// Derived view of a spendable output, used during balance lookups and coin
/// selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UTxOut {
    pub tx_id: String,
    pub index: i64,
    pub amount: u64,
}

impl Tx {
    /// Hash of this transaction with its id field cleared.
    pub fn compute_id(&self) -> Result<String, CodecError> {
        let mut cleared = self.clone();
        cleared.id.clear();
        codec::hash_of(&cleared)
    }

    /// Build the block-reward transaction paying the miner.
    pub fn coinbase(miner_address: &str) -> Result<Self, CodecError> {
        let mut tx = Self {
            id: String::new(),
            timestamp: now_unix(),
            tx_ins: vec![TxIn {
                tx_id: String::new(),
                index: COINBASE_INPUT_INDEX,
                signature: COINBASE_SIGNATURE.to_string(),
            }],
            tx_outs: vec![TxOut {
                address: miner_address.to_string(),
                amount: MINER_REWARD,
            }],
        };
        tx.id = tx.compute_id()?;
        Ok(tx)
    }
}

/// Is any input of a pending transaction already spending this output?
pub fn is_on_mempool(pending: &[Tx], utxo: &UTxOut) -> bool {
    pending.iter().any(|tx| {
        tx.tx_ins
            .iter()
            .any(|input| input.tx_id == utxo.tx_id && input.index == utxo.index)
    })
}

/// Assemble, sign, and validate a transaction from the local wallet.
///
/// Consumes the sender's unspent outputs in derivation order until the
/// requested amount is covered; change (if any) precedes the payment output.
/// Every input's signature starts as the sender address placeholder, so the
/// id commits to the input set before the real signatures are written.
pub fn make_tx(
    chain: &Chain,
    pending: &[Tx],
    signer: &dyn Signer,
    to: &str,
    amount: u64,
) -> Result<Tx, TxError> {
    let from = signer.address();
    let utxos = chain.utxouts_by_address(&from, pending)?;
    let balance: u64 = utxos.iter().map(|u| u.amount).sum();
    if balance < amount {
        return Err(TxError::InsufficientFunds);
    }

    let mut total = 0u64;
    let mut tx_ins = Vec::new();
    for utxo in utxos {
        if total >= amount {
            break;
        }
        total += utxo.amount;
        tx_ins.push(TxIn {
            tx_id: utxo.tx_id,
            index: utxo.index,
            signature: from.clone(),
        });
    }

    let mut tx_outs = Vec::new();
    let change = total - amount;
    if change != 0 {
        tx_outs.push(TxOut { address: from.clone(), amount: change });
    }
    tx_outs.push(TxOut { address: to.to_string(), amount });

    let mut tx = Tx {
        id: String::new(),
        timestamp: now_unix(),
        tx_ins,
        tx_outs,
    };
    tx.id = tx.compute_id()?;

    let signature = signer.sign(&tx.id)?;
    for input in &mut tx.tx_ins {
        input.signature = signature.clone();
    }

    validate(chain, &tx)?;
    Ok(tx)
}

/// Validate a transaction against the current chain.
///
/// Each input must reference an existing output whose address verifies the
/// input's signature over the transaction id. The `COINBASE` marker
/// short-circuits to accept (only the miner of a block creates one).
pub fn validate(chain: &Chain, tx: &Tx) -> Result<(), TxError> {
    for (index, input) in tx.tx_ins.iter().enumerate() {
        if input.signature == COINBASE_SIGNATURE {
            continue;
        }
        let unknown = || TxError::UnknownInput {
            tx_id: input.tx_id.clone(),
            index: input.index,
        };
        let prev = chain.find_tx(&input.tx_id)?.ok_or_else(unknown)?;
        let out = usize::try_from(input.index)
            .ok()
            .and_then(|i| prev.tx_outs.get(i))
            .ok_or_else(unknown)?;
        if !crypto::verify(&tx.id, &input.signature, &out.address) {
            return Err(TxError::InvalidSignature { index });
        }
    }
    Ok(())
}
