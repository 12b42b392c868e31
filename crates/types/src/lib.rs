//! Core types for the execution book.
//!
//! - [`TxHash`]: 32-byte transaction digest
//! - [`KeyPair`] / [`PublicKey`]: sequencer key material (ED25519, secp256k1)
//! - [`sequencer_tx_digest`]: canonical signing codec
//! - [`SequencerTransaction`]: an admitted book entry

mod crypto;
mod hash;
mod signing;
mod transaction;

pub use crypto::{KeyError, KeyPair, KeyType, PublicKey};
pub use hash::{HexError, TxHash};
pub use signing::{
    sequencer_tx_digest, sequencer_tx_preimage, sign_sequencer_tx, DOMAIN_SEQUENCER_TX,
    FIELD_SEPARATOR,
};
pub use transaction::{SequencerTransaction, MAX_SIGNATURE_LEN};
