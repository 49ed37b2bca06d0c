//! The inbound transaction record and the sealed batches the [`crate::batcher::Batcher`]
//! groups them into.
use ethers::types::{Address, Bytes, H256, U256};
use std::time::Instant;

/// A pending transaction as observed by the mempool subscriber.
///
/// Immutable once constructed; `observed_at` is assigned once, at the moment
/// [`crate::mempool::MempoolSource`] yields the record, and never revised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: H256,
    pub from: Address,
    pub to: Address,
    pub input_data: Bytes,
    pub gas_price: U256,
    pub value: U256,
    pub nonce: U256,
    pub observed_at: Instant,
}

impl Transaction {
    /// First 4 bytes of `input_data`, the ABI method selector. `None` for
    /// transactions with fewer than 4 bytes of calldata (plain transfers).
    pub fn method_selector(&self) -> Option<[u8; 4]> {
        let data = self.input_data.as_ref();
        if data.len() < 4 {
            return None;
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        Some(selector)
    }
}

/// An immutable, arrival-ordered window of transactions sealed by the batcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    transactions: Vec<Transaction>,
    /// Unix-seconds timestamp assigned at seal time; carried into every
    /// [`crate::finding::Finding`] the detector derives from this batch so
    /// that `detect` stays a pure function of its `Batch` argument.
    pub sealed_at: u64,
}

impl Batch {
    pub fn new(transactions: Vec<Transaction>, sealed_at: u64) -> Self {
        Self {
            transactions,
            sealed_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Transactions in arrival order; index is `position_in_batch`.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}
