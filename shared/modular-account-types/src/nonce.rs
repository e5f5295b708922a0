//! Structured ERC-4337 nonce keys for modular accounts.
//!
//! Key layout (24 bytes, big-endian):
//! - `bytes3`  sequence namespace
//! - `bytes1`  validation mode
//! - `bytes20` validator module address
//!
//! The full 256-bit nonce is `key << 64 | sequence`.

use alloy_primitives::{aliases::U192, Address, U256};
use thiserror::Error;

/// Size of an encoded nonce key in bytes.
pub const NONCE_KEY_LEN: usize = 24;

/// Namespaces wrap at 2^24.
pub const NAMESPACE_MODULUS: u64 = 1 << 24;

/// Errors while decoding a nonce key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    /// Raw key bytes were not exactly 24 bytes long.
    #[error("nonce key must be {NONCE_KEY_LEN} bytes, got {len}")]
    InvalidRange { len: usize },
    /// A 256-bit value carried bits above the 192-bit key range.
    #[error("nonce key overflows 192 bits")]
    KeyOverflow,
}

/// Validation mode byte of a nonce key.
///
/// Only `0x00` and `0x01` are defined by the account; anything else is
/// carried verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    #[default]
    Validate,
    ModuleEnable,
    Other(u8),
}

impl From<u8> for ValidationMode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ValidationMode::Validate,
            0x01 => ValidationMode::ModuleEnable,
            other => ValidationMode::Other(other),
        }
    }
}

impl From<ValidationMode> for u8 {
    fn from(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Validate => 0x00,
            ValidationMode::ModuleEnable => 0x01,
            ValidationMode::Other(b) => b,
        }
    }
}

/// Decoded nonce key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonceKey {
    /// Sequence namespace, always `< 2^24`.
    pub namespace: u32,
    pub mode: ValidationMode,
    pub module: Address,
}

impl NonceKey {
    /// Build a key; `namespace` is reduced modulo 2^24.
    pub fn new(namespace: u64, mode: ValidationMode, module: Address) -> Self {
        Self {
            namespace: (namespace % NAMESPACE_MODULUS) as u32,
            mode,
            module,
        }
    }

    /// Default-namespace key for `module` in validate mode.
    pub fn for_module(module: Address) -> Self {
        Self::new(0, ValidationMode::Validate, module)
    }

    pub fn to_bytes(&self) -> [u8; NONCE_KEY_LEN] {
        let mut buf = [0u8; NONCE_KEY_LEN];
        buf[0..3].copy_from_slice(&self.namespace.to_be_bytes()[1..4]);
        buf[3] = self.mode.into();
        buf[4..24].copy_from_slice(self.module.as_slice());
        buf
    }

    pub fn encode(&self) -> U192 {
        U192::from_be_slice(&self.to_bytes())
    }

    pub fn decode(key: U192) -> Self {
        Self::from_array(key.to_be_bytes::<NONCE_KEY_LEN>())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, NonceError> {
        let buf: [u8; NONCE_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| NonceError::InvalidRange { len: bytes.len() })?;
        Ok(Self::from_array(buf))
    }

    /// Decode a key held in a 256-bit word (as returned by RPC).
    pub fn from_u256(key: U256) -> Result<Self, NonceError> {
        let word = key.to_be_bytes::<32>();
        if word[..8].iter().any(|b| *b != 0) {
            return Err(NonceError::KeyOverflow);
        }
        Self::from_slice(&word[8..])
    }

    /// Full ERC-4337 nonce for this key at `sequence`.
    pub fn nonce(&self, sequence: u64) -> U256 {
        join_nonce(self.encode(), sequence)
    }

    fn from_array(buf: [u8; NONCE_KEY_LEN]) -> Self {
        let namespace = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]);
        Self {
            namespace,
            mode: ValidationMode::from(buf[3]),
            module: Address::from_slice(&buf[4..24]),
        }
    }
}

/// `key << 64 | sequence`.
pub fn join_nonce(key: U192, sequence: u64) -> U256 {
    let mut word = [0u8; 32];
    word[..24].copy_from_slice(&key.to_be_bytes::<NONCE_KEY_LEN>());
    word[24..].copy_from_slice(&sequence.to_be_bytes());
    U256::from_be_bytes(word)
}

/// Split a full nonce into `(key, sequence)`.
pub fn split_nonce(nonce: U256) -> (U192, u64) {
    let word = nonce.to_be_bytes::<32>();
    let mut seq = [0u8; 8];
    seq.copy_from_slice(&word[24..]);
    (U192::from_be_slice(&word[..24]), u64::from_be_bytes(seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const MODULE: Address = address!("00000000d12897ddadc2044614a9677b191a2d95");

    #[test]
    fn encodes_big_endian_layout() {
        let key = NonceKey::new(0x0a0b0c, ValidationMode::ModuleEnable, MODULE);
        let bytes = key.to_bytes();
        assert_eq!(&bytes[0..3], &[0x0a, 0x0b, 0x0c]);
        assert_eq!(bytes[3], 0x01);
        assert_eq!(&bytes[4..], MODULE.as_slice());
    }

    #[test]
    fn namespace_wraps_instead_of_erroring() {
        let key = NonceKey::new(NAMESPACE_MODULUS + 5, ValidationMode::Validate, MODULE);
        assert_eq!(key.namespace, 5);
        let key = NonceKey::new(u64::MAX, ValidationMode::Validate, MODULE);
        assert_eq!(key.namespace, 0x00ff_ffff);
    }

    #[test]
    fn round_trip_keeps_fields() {
        for (ns, mode) in [
            (0u64, 0x00u8),
            (1, 0x01),
            (0x00ff_ffff, 0x7f),
            (0x0100_0002, 0xff),
        ] {
            let key = NonceKey::new(ns, ValidationMode::from(mode), MODULE);
            let decoded = NonceKey::decode(key.encode());
            assert_eq!(decoded.namespace as u64, ns % NAMESPACE_MODULUS);
            assert_eq!(u8::from(decoded.mode), mode);
            assert_eq!(decoded.module, MODULE);
        }
    }

    #[test]
    fn undocumented_mode_is_passthrough() {
        assert_eq!(ValidationMode::from(0x42), ValidationMode::Other(0x42));
        assert_eq!(u8::from(ValidationMode::Other(0x42)), 0x42);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(
            NonceKey::from_slice(&[0u8; 23]),
            Err(NonceError::InvalidRange { len: 23 })
        );
        assert_eq!(NonceKey::from_u256(U256::MAX), Err(NonceError::KeyOverflow));
        let key = NonceKey::for_module(MODULE);
        let word = U256::from_be_slice(&key.to_bytes());
        assert_eq!(NonceKey::from_u256(word), Ok(key));
    }

    #[test]
    fn nonce_joins_key_and_sequence() {
        let key = NonceKey::new(7, ValidationMode::Validate, MODULE);
        let nonce = key.nonce(42);
        let (k, seq) = split_nonce(nonce);
        assert_eq!(k, key.encode());
        assert_eq!(seq, 42);
        assert_eq!(nonce & U256::from(u64::MAX), U256::from(42u64));
    }

    #[test]
    fn key_fills_exactly_192_bits() {
        let key = NonceKey::new(0x00ff_ffff, ValidationMode::Other(0xff), Address::repeat_byte(0xff));
        assert_eq!(key.encode(), U192::MAX);
        assert_eq!(NonceKey::decode(U192::MAX), key);
        assert_eq!(join_nonce(U192::MAX, u64::MAX), U256::MAX);
    }
}
