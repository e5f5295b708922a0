use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by signing collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The signer (user, device, remote party) declined the request.
    #[error("signing request rejected: {0}")]
    Rejected(String),
    /// The signer cannot produce this kind of signature.
    #[error("signer does not support {0}")]
    Unsupported(&'static str),
    /// Key material could not be loaded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Any other backend failure (hardware, remote service, ...).
    #[error("signer backend failure: {0}")]
    Backend(String),
}

/// Owner signing capability.
///
/// Implementations may prompt a user, talk to hardware, or call a remote
/// service; every method is a suspension point.
#[async_trait]
pub trait AccountSigner: Send + Sync {
    /// Address the produced signatures recover to.
    fn address(&self) -> Address;

    /// EIP-191 `personal_sign` over raw message bytes. Returns `r ∥ s ∥ v`.
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;

    /// EIP-712 signature over `keccak256(0x1901 ∥ domain_separator ∥ struct_hash)`.
    async fn sign_typed_data(
        &self,
        domain_separator: B256,
        struct_hash: B256,
    ) -> Result<Bytes, SignerError>;
}

/// Remote threshold-signing service backing a delegated validator.
#[async_trait]
pub trait RemoteSigningService: Send + Sync {
    /// Ask the service to authorize `hash` on behalf of `account` through `module`.
    async fn request_signature(
        &self,
        account: Address,
        module: Address,
        hash: B256,
    ) -> Result<Bytes, SignerError>;
}
