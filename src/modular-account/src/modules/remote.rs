//! Delegated-external validator: a remote threshold-signing service returns
//! the signature.

use std::sync::Arc;

use alloy_primitives::{eip191_hash_message, Address, Bytes, FixedBytes};

use modular_account_types::RemoteSigningService;

use crate::{
    errors::{AccountError, Result},
    modules::dummy_ecdsa_signature,
    utils::{crypto::normalize_v, typed_data::typed_data_digest},
};

#[derive(Clone)]
pub struct RemoteValidator {
    service: Arc<dyn RemoteSigningService>,
    init_data: Bytes,
    stub_len: usize,
}

impl RemoteValidator {
    pub fn new(service: Arc<dyn RemoteSigningService>, init_data: Bytes) -> Self {
        Self {
            service,
            init_data,
            stub_len: 65,
        }
    }

    /// Override the stub length when the service returns non-ECDSA blobs.
    pub fn with_stub_len(mut self, len: usize) -> Self {
        self.stub_len = len;
        self
    }

    pub fn init_data(&self) -> Bytes {
        self.init_data.clone()
    }

    pub fn stub_signature(&self) -> Bytes {
        let dummy = dummy_ecdsa_signature();
        if self.stub_len == dummy.len() {
            return dummy;
        }
        let mut out = vec![0xaa; self.stub_len];
        if let Some(last) = out.last_mut() {
            *last = 0x1c;
        }
        out.into()
    }

    fn bound(module: Address, account: Option<Address>) -> Result<Address> {
        account.ok_or(AccountError::AccountNotFound { module })
    }

    pub async fn sign_hash(
        &self,
        module: Address,
        account: Option<Address>,
        hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        let account = Self::bound(module, account)?;
        Ok(self.service.request_signature(account, module, hash).await?)
    }

    pub async fn sign_message(
        &self,
        module: Address,
        account: Option<Address>,
        message: &[u8],
    ) -> Result<Bytes> {
        let account = Self::bound(module, account)?;
        let sig = self
            .service
            .request_signature(account, module, eip191_hash_message(message))
            .await?;
        Ok(normalize_v(sig))
    }

    pub async fn sign_typed_data(
        &self,
        module: Address,
        account: Option<Address>,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        let account = Self::bound(module, account)?;
        let digest = typed_data_digest(domain_separator, struct_hash);
        let sig = self.service.request_signature(account, module, digest).await?;
        Ok(normalize_v(sig))
    }
}

impl std::fmt::Debug for RemoteValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteValidator")
            .field("stub_len", &self.stub_len)
            .finish_non_exhaustive()
    }
}
