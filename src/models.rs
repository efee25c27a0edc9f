pub use alloy_primitives::{Address, B256};
use serde::Serialize;

/// Confirmation of a mined transaction. Forwarded to the caller, never stored.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
}

/// Summary of the latest block.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BlockInfo {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub transactions: usize,
}

/// Snapshot of the contract's tally, re-read on every query.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteTally {
    pub yes_votes: u64,
    pub no_votes: u64,
    pub total_votes: u64,
}

/// EIP-55 form, as the node and the UI show addresses.
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}
