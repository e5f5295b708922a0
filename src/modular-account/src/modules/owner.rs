//! Single-owner ECDSA validator.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, FixedBytes};

use modular_account_types::AccountSigner;

use crate::{errors::Result, modules::dummy_ecdsa_signature, utils::crypto::normalize_v};

/// One EOA owner authorizes everything.
///
/// Install payload is `abi.encodePacked(owner)`.
#[derive(Clone)]
pub struct OwnerValidator {
    signer: Arc<dyn AccountSigner>,
}

impl OwnerValidator {
    pub fn new(signer: Arc<dyn AccountSigner>) -> Self {
        Self { signer }
    }

    pub fn owner(&self) -> Address {
        self.signer.address()
    }

    pub fn init_data(&self) -> Bytes {
        Bytes::copy_from_slice(self.owner().as_slice())
    }

    pub fn stub_signature(&self) -> Bytes {
        dummy_ecdsa_signature()
    }

    /// EIP-191 signature over the raw 32-byte digest.
    pub async fn sign_hash(&self, hash: FixedBytes<32>) -> Result<Bytes> {
        let sig = self.signer.sign_message(hash.as_slice()).await?;
        Ok(normalize_v(sig))
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let sig = self.signer.sign_message(message).await?;
        Ok(normalize_v(sig))
    }

    pub async fn sign_typed_data(
        &self,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        let sig = self.signer.sign_typed_data(domain_separator, struct_hash).await?;
        Ok(normalize_v(sig))
    }
}

impl std::fmt::Debug for OwnerValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerValidator").field("owner", &self.owner()).finish()
    }
}
