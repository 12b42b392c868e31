//! Canonical signing codec for sequencer transactions.
//!
//! Sequencers sign a 32-byte digest built from the transaction hash and the
//! global sequence number:
//!
//! ```text
//! preimage := "SEQUENCER_TX|" || tx_hash (32) || "|" || sequence_number (u64 BE)
//! digest   := SHA-256(preimage)
//! ```
//!
//! The layout must stay bit-exact so signatures produced by sequencers in
//! other languages verify here.

use crate::{KeyPair, TxHash};
use sha2::{Digest, Sha256};

/// Domain tag for sequencer transaction signatures.
pub const DOMAIN_SEQUENCER_TX: &[u8] = b"SEQUENCER_TX|";

/// Separator between the transaction hash and the sequence number.
pub const FIELD_SEPARATOR: u8 = b'|';

/// Build the signing preimage for a sequencer transaction.
pub fn sequencer_tx_preimage(tx_hash: &TxHash, sequence_number: u64) -> Vec<u8> {
    // 13 (tag) + 32 (hash) + 1 (separator) + 8 (sequence) = 54 bytes
    let mut message = Vec::with_capacity(54);
    message.extend_from_slice(DOMAIN_SEQUENCER_TX);
    message.extend_from_slice(tx_hash.as_bytes());
    message.push(FIELD_SEPARATOR);
    message.extend_from_slice(&sequence_number.to_be_bytes());
    message
}

/// Compute the 32-byte digest sequencers sign and verifiers check.
pub fn sequencer_tx_digest(tx_hash: &TxHash, sequence_number: u64) -> [u8; 32] {
    Sha256::digest(sequencer_tx_preimage(tx_hash, sequence_number)).into()
}

/// Sign a `(tx_hash, sequence_number)` pair as a sequencer would.
pub fn sign_sequencer_tx(tx_hash: &TxHash, sequence_number: u64, key: &KeyPair) -> Vec<u8> {
    key.sign(&sequencer_tx_digest(tx_hash, sequence_number))
}
