//! In-process secp256k1 owner signer.

use alloy_primitives::{eip191_hash_message, Address, Bytes, FixedBytes};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use modular_account_types::{AccountSigner, SignerError};

use crate::utils::{crypto::address_from_verifying_key, typed_data::typed_data_digest};

/// Owner signer backed by a raw private key held in memory.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignerError> {
        let key = SigningKey::from_slice(bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self::from_signing_key(key))
    }

    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let raw = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Self::from_slice(&raw)
    }

    /// Sign a 32-byte digest as-is. Returns `r ∥ s ∥ v` with `v ∈ {27, 28}`.
    pub fn sign_digest(&self, digest: FixedBytes<32>) -> Result<Bytes, SignerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        let mut sig_bytes = Vec::with_capacity(65);
        sig_bytes.extend_from_slice(&signature.to_bytes());
        sig_bytes.push(27 + recovery_id.to_byte());
        Ok(sig_bytes.into())
    }
}

#[async_trait]
impl AccountSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        self.sign_digest(eip191_hash_message(message))
    }

    async fn sign_typed_data(
        &self,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes, SignerError> {
        self.sign_digest(typed_data_digest(domain_separator, struct_hash))
    }
}
