//! Session-scoped validator (permission-bound delegated signing).
//!
//! Signature layout:
//! - `USE`:    `0x00 ∥ permissionId ∥ signature`
//! - `ENABLE`: `0x01 ∥ permissionId ∥ abi.encode(bytes enableProof, bytes signature)`
//!
//! Policy payloads inside `init_data` and the enable proof are opaque here.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_sol_types::SolValue;

use modular_account_types::AccountSigner;

use crate::{
    errors::{AccountError, Result},
    modules::dummy_ecdsa_signature,
    utils::crypto::normalize_v,
};

/// How the session permission is presented on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionMode {
    /// The permission is already enabled on the account.
    Use = 0x00,
    /// Enable the permission in the same operation, backed by an enable proof.
    Enable = 0x01,
}

#[derive(Clone)]
pub struct SessionValidator {
    permission_id: FixedBytes<32>,
    mode: SessionMode,
    enable_proof: Option<Bytes>,
    signer: Arc<dyn AccountSigner>,
    init_data: Bytes,
}

impl SessionValidator {
    /// Session over an already enabled permission.
    pub fn using(permission_id: FixedBytes<32>, signer: Arc<dyn AccountSigner>) -> Self {
        Self {
            permission_id,
            mode: SessionMode::Use,
            enable_proof: None,
            signer,
            init_data: Bytes::new(),
        }
    }

    /// Session that enables its permission on first use.
    ///
    /// A missing proof is accepted here and reported when signing.
    pub fn enabling(
        permission_id: FixedBytes<32>,
        signer: Arc<dyn AccountSigner>,
        enable_proof: Option<Bytes>,
    ) -> Self {
        Self {
            permission_id,
            mode: SessionMode::Enable,
            enable_proof,
            signer,
            init_data: Bytes::new(),
        }
    }

    /// Opaque install payload (policy and session definitions).
    pub fn with_init_data(mut self, init_data: Bytes) -> Self {
        self.init_data = init_data;
        self
    }

    /// Same session once the permission is live on chain.
    pub fn into_use_mode(self) -> Self {
        Self {
            mode: SessionMode::Use,
            enable_proof: None,
            ..self
        }
    }

    pub fn permission_id(&self) -> FixedBytes<32> {
        self.permission_id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn session_key(&self) -> Address {
        self.signer.address()
    }

    pub fn init_data(&self) -> Bytes {
        self.init_data.clone()
    }

    fn wrap(&self, signature: &[u8], enable_proof: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(1 + 32 + signature.len());
        out.push(self.mode as u8);
        out.extend_from_slice(self.permission_id.as_slice());
        match self.mode {
            SessionMode::Use => out.extend_from_slice(signature),
            SessionMode::Enable => out.extend_from_slice(
                &(Bytes::copy_from_slice(enable_proof), Bytes::copy_from_slice(signature))
                    .abi_encode_params(),
            ),
        }
        out.into()
    }

    fn require_proof(&self, module: Address) -> Result<&[u8]> {
        match (self.mode, &self.enable_proof) {
            (SessionMode::Use, _) => Ok(&[]),
            (SessionMode::Enable, Some(proof)) => Ok(proof.as_ref()),
            (SessionMode::Enable, None) => Err(AccountError::MissingEnableProof {
                module,
                permission_id: self.permission_id,
            }),
        }
    }

    pub fn stub_signature(&self) -> Bytes {
        let proof = self.enable_proof.clone().unwrap_or_default();
        self.wrap(&dummy_ecdsa_signature(), &proof)
    }

    pub async fn sign_hash(&self, module: Address, hash: FixedBytes<32>) -> Result<Bytes> {
        let proof = self.require_proof(module)?;
        let sig = normalize_v(self.signer.sign_message(hash.as_slice()).await?);
        Ok(self.wrap(&sig, proof))
    }

    pub async fn sign_message(&self, module: Address, message: &[u8]) -> Result<Bytes> {
        let proof = self.require_proof(module)?;
        let sig = normalize_v(self.signer.sign_message(message).await?);
        Ok(self.wrap(&sig, proof))
    }

    pub async fn sign_typed_data(
        &self,
        module: Address,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        let proof = self.require_proof(module)?;
        let sig = self.signer.sign_typed_data(domain_separator, struct_hash).await?;
        Ok(self.wrap(&normalize_v(sig), proof))
    }
}

impl std::fmt::Debug for SessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionValidator")
            .field("permission_id", &self.permission_id)
            .field("mode", &self.mode)
            .field("has_enable_proof", &self.enable_proof.is_some())
            .field("session_key", &self.session_key())
            .finish()
    }
}
