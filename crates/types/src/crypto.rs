//! Sequencer key pairs and signature verification.
//!
//! Supports:
//! - ED25519: signs the message bytes directly (64-byte signatures)
//! - secp256k1: ECDSA over SHA-256 of the message, 64-byte compact `r || s`
//!   (a trailing recovery byte is tolerated, giving the 65-byte form)

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Supported key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// ED25519.
    Ed25519,
    /// secp256k1 ECDSA.
    Secp256k1,
}

impl KeyType {
    /// Canonical lowercase tag, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Secp256k1 => "secp256k1",
        }
    }

    /// Length of a secret key in bytes.
    pub fn secret_len(&self) -> usize {
        32
    }
}

impl FromStr for KeyType {
    type Err = KeyError;

    /// Parse a key type tag. An empty tag selects ED25519.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "ed25519" => Ok(KeyType::Ed25519),
            "secp256k1" => Ok(KeyType::Secp256k1),
            other => Err(KeyError::UnsupportedKeyType(other.to_string())),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sequencer signing key.
#[derive(Clone)]
pub enum KeyPair {
    /// ED25519 signing key.
    Ed25519(ed25519_dalek::SigningKey),
    /// secp256k1 secret key.
    Secp256k1(secp256k1::SecretKey),
}

impl KeyPair {
    /// Generate a new random keypair of the given type.
    pub fn generate(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => Self::generate_ed25519(),
            KeyType::Secp256k1 => Self::generate_secp256k1(),
        }
    }

    /// Generate a new random Ed25519 keypair.
    pub fn generate_ed25519() -> Self {
        let mut csprng = rand::rngs::OsRng;
        KeyPair::Ed25519(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Generate a new random secp256k1 keypair.
    pub fn generate_secp256k1() -> Self {
        loop {
            let mut candidate = [0u8; 32];
            rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut candidate);
            if let Ok(sk) = secp256k1::SecretKey::from_slice(&candidate) {
                return KeyPair::Secp256k1(sk);
            }
        }
    }

    /// Generate a keypair from a seed (for testing).
    ///
    /// For secp256k1 a seed outside the curve order is re-hashed until it
    /// yields a valid scalar, so every seed maps to exactly one key.
    pub fn from_seed(key_type: KeyType, seed: &[u8; 32]) -> Self {
        match key_type {
            KeyType::Ed25519 => KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(seed)),
            KeyType::Secp256k1 => {
                let mut candidate = *seed;
                loop {
                    if let Ok(sk) = secp256k1::SecretKey::from_slice(&candidate) {
                        return KeyPair::Secp256k1(sk);
                    }
                    candidate = Sha256::digest(candidate).into();
                }
            }
        }
    }

    /// Load a keypair from raw 32-byte secret material.
    ///
    /// `key_type` is a tag such as `"ed25519"` or `"secp256k1"`; an empty tag
    /// selects ED25519.
    pub fn from_bytes(bytes: &[u8], key_type: &str) -> Result<Self, KeyError> {
        let key_type: KeyType = key_type.parse()?;
        let secret: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            key_type,
            expected: key_type.secret_len(),
            actual: bytes.len(),
        })?;

        match key_type {
            KeyType::Ed25519 => Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(
                &secret,
            ))),
            KeyType::Secp256k1 => secp256k1::SecretKey::from_slice(&secret)
                .map(KeyPair::Secp256k1)
                .map_err(|_| KeyError::InvalidKey(key_type)),
        }
    }

    /// Load a keypair from hex-encoded secret material.
    pub fn from_hex(hex_key: &str, key_type: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes, key_type)
    }

    /// The type of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Ed25519(_) => KeyType::Ed25519,
            KeyPair::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Raw secret bytes (for key files).
    pub fn secret_bytes(&self) -> [u8; 32] {
        match self {
            KeyPair::Ed25519(signing_key) => signing_key.to_bytes(),
            KeyPair::Secp256k1(sk) => sk.secret_bytes(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            KeyPair::Ed25519(signing_key) => {
                use ed25519_dalek::Signer;
                signing_key.sign(message).to_bytes().to_vec()
            }
            KeyPair::Secp256k1(sk) => {
                let secp = secp256k1::Secp256k1::signing_only();
                let msg = secp256k1::Message::from_digest(Sha256::digest(message).into());
                secp.sign_ecdsa(&msg, sk).serialize_compact().to_vec()
            }
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Ed25519(signing_key) => {
                PublicKey::Ed25519(signing_key.verifying_key().to_bytes())
            }
            KeyPair::Secp256k1(sk) => {
                let secp = secp256k1::Secp256k1::signing_only();
                PublicKey::Secp256k1(sk.public_key(&secp).serialize())
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// A sequencer public key used for signature verification.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublicKey {
    /// ED25519 public key (32 bytes).
    Ed25519([u8; 32]),
    /// secp256k1 public key (33 bytes compressed).
    Secp256k1([u8; 33]),
}

impl PublicKey {
    /// Decode a public key of the given type.
    ///
    /// secp256k1 keys may be given compressed (33 bytes) or uncompressed
    /// (65 bytes); they are stored compressed.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, KeyError> {
        match key_type {
            KeyType::Ed25519 => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
                    key_type,
                    expected: 32,
                    actual: bytes.len(),
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&arr)
                    .map_err(|_| KeyError::InvalidKey(key_type))?;
                Ok(PublicKey::Ed25519(arr))
            }
            KeyType::Secp256k1 => {
                if bytes.len() != 33 && bytes.len() != 65 {
                    return Err(KeyError::InvalidLength {
                        key_type,
                        expected: 33,
                        actual: bytes.len(),
                    });
                }
                let pk = secp256k1::PublicKey::from_slice(bytes)
                    .map_err(|_| KeyError::InvalidKey(key_type))?;
                Ok(PublicKey::Secp256k1(pk.serialize()))
            }
        }
    }

    /// Decode a hex-encoded public key of the given type.
    pub fn from_hex(key_type: KeyType, hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(key_type, &bytes)
    }

    /// The type of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Ed25519(_) => KeyType::Ed25519,
            PublicKey::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Key type tag (`"ed25519"` or `"secp256k1"`), used in logs.
    pub fn key_type_tag(&self) -> &'static str {
        self.key_type().as_str()
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes.as_slice(),
            PublicKey::Secp256k1(bytes) => bytes.as_slice(),
        }
    }

    /// Lowercase hex encoding of the key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Verify a signature over `message`.
    ///
    /// Never panics; malformed keys or signatures simply fail verification.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(pk_bytes) => {
                use ed25519_dalek::Verifier;
                let pk = match ed25519_dalek::VerifyingKey::from_bytes(pk_bytes) {
                    Ok(pk) => pk,
                    Err(_) => return false,
                };
                let sig_array: [u8; 64] = match signature.try_into() {
                    Ok(arr) => arr,
                    Err(_) => return false,
                };
                let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
                pk.verify(message, &sig).is_ok()
            }
            PublicKey::Secp256k1(pk_bytes) => {
                // 64-byte compact form, optionally followed by a recovery id.
                let compact = match signature.len() {
                    64 | 65 => &signature[..64],
                    _ => return false,
                };
                let pk = match secp256k1::PublicKey::from_slice(pk_bytes) {
                    Ok(pk) => pk,
                    Err(_) => return false,
                };
                let sig = match secp256k1::ecdsa::Signature::from_compact(compact) {
                    Ok(sig) => sig,
                    Err(_) => return false,
                };
                let msg = secp256k1::Message::from_digest(Sha256::digest(message).into());
                secp256k1::Secp256k1::verification_only()
                    .verify_ecdsa(&msg, &sig, &pk)
                    .is_ok()
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Ed25519(bytes) => {
                write!(f, "PublicKey::Ed25519({})", hex::encode(bytes))
            }
            PublicKey::Secp256k1(bytes) => {
                write!(f, "PublicKey::Secp256k1({})", hex::encode(bytes))
            }
        }
    }
}

/// Errors that can occur when loading keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Key type tag is not recognised.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Key material has the wrong length.
    #[error("invalid {key_type} key length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Key type being decoded.
        key_type: KeyType,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Key material is not a valid point/scalar.
    #[error("invalid {0} key material")]
    InvalidKey(KeyType),

    /// Key was not valid hex.
    #[error("invalid hex key: {0}")]
    InvalidHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_sign_verify() {
        let keypair = KeyPair::generate_ed25519();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert_eq!(signature.len(), 64);
        assert!(keypair.public_key().verify(message, &signature));
        assert!(!keypair.public_key().verify(b"wrong message", &signature));
    }

    #[test]
    fn test_secp256k1_sign_verify() {
        let keypair = KeyPair::generate_secp256k1();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert_eq!(signature.len(), 64);
        assert!(keypair.public_key().verify(message, &signature));
        assert!(!keypair.public_key().verify(b"wrong message", &signature));
    }

    #[test]
    fn test_secp256k1_accepts_trailing_recovery_byte() {
        let keypair = KeyPair::generate_secp256k1();
        let mut signature = keypair.sign(b"msg");
        signature.push(1);
        assert_eq!(signature.len(), 65);
        assert!(keypair.public_key().verify(b"msg", &signature));
    }

    #[test]
    fn test_mismatched_key_types_do_not_verify() {
        let ed = KeyPair::generate_ed25519();
        let secp = KeyPair::generate_secp256k1();
        let sig = ed.sign(b"msg");
        assert!(!secp.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn test_truncated_signature_fails() {
        let keypair = KeyPair::generate_ed25519();
        let sig = keypair.sign(b"msg");
        assert!(!keypair.public_key().verify(b"msg", &sig[..63]));
        assert!(!keypair.public_key().verify(b"msg", &[]));
    }

    #[test]
    fn test_keypair_from_seed_deterministic() {
        let seed = [42u8; 32];
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let kp1 = KeyPair::from_seed(key_type, &seed);
            let kp2 = KeyPair::from_seed(key_type, &seed);
            assert_eq!(kp1.public_key(), kp2.public_key());
            assert_eq!(kp1.key_type(), key_type);
        }
    }

    #[test]
    fn test_load_from_bytes() {
        let ed_bytes: Vec<u8> = (0..32).collect();
        let kp = KeyPair::from_bytes(&ed_bytes, "ed25519").unwrap();
        assert_eq!(kp.key_type(), KeyType::Ed25519);
        assert_eq!(kp.secret_bytes().to_vec(), ed_bytes);

        // Empty tag defaults to ed25519.
        let kp = KeyPair::from_bytes(&ed_bytes, "").unwrap();
        assert_eq!(kp.key_type(), KeyType::Ed25519);

        let secp_bytes: Vec<u8> = (100..132).collect();
        let kp = KeyPair::from_bytes(&secp_bytes, "secp256k1").unwrap();
        assert_eq!(kp.key_type(), KeyType::Secp256k1);
        assert_eq!(kp.public_key().as_bytes().len(), 33);
    }

    #[test]
    fn test_load_rejects_bad_input() {
        let err = KeyPair::from_bytes(&[0u8; 16], "ed25519").unwrap_err();
        assert!(err.to_string().contains("invalid"));

        let err = KeyPair::from_bytes(&[1u8; 32], "rsa").unwrap_err();
        assert!(err.to_string().contains("unsupported key type"));

        let err = KeyPair::from_hex("not-valid-hex", "ed25519").unwrap_err();
        assert!(err.to_string().contains("invalid hex key"));

        // Zero is not a valid secp256k1 scalar.
        assert_eq!(
            KeyPair::from_bytes(&[0u8; 32], "secp256k1").unwrap_err(),
            KeyError::InvalidKey(KeyType::Secp256k1)
        );
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let pk = KeyPair::generate(key_type).public_key();
            let parsed = PublicKey::from_hex(key_type, &pk.to_hex()).unwrap();
            assert_eq!(parsed, pk);
            assert_eq!(parsed.key_type_tag(), key_type.as_str());
        }
    }
}
