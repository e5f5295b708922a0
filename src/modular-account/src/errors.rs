use alloy_primitives::{Address, B256};
use thiserror::Error;

pub use modular_account_types::{ChainError, NonceError, SignerError};

/// Errors raised by the account engine.
///
/// Every variant is terminal for the operation that produced it; the engine
/// never retries.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Neither the factory view call nor the entrypoint simulation produced an address.
    #[error(
        "could not resolve account address via factory {factory} or entrypoint {entrypoint} \
         on chain {chain_id}: factory: {factory_reason}; entrypoint: {entrypoint_reason}"
    )]
    AddressResolution {
        factory: Address,
        entrypoint: Address,
        chain_id: u64,
        factory_reason: String,
        entrypoint_reason: String,
    },

    /// The operation needs a bound account and none was supplied.
    #[error("module {module} is not bound to an account")]
    AccountNotFound { module: Address },

    /// The module used for signing is not the account's active module.
    #[error("module {module} is not active on account {account}")]
    ModuleNotActive { module: Address, account: Address },

    /// Session `ENABLE` mode was requested without an enable proof.
    #[error("session module {module} needs an enable proof for permission {permission_id}")]
    MissingEnableProof { module: Address, permission_id: B256 },

    #[error("invalid nonce key: {0}")]
    InvalidNonceRange(#[from] NonceError),

    /// A recovered signer differs from the expected owner.
    #[error("signature recovered to {recovered}, expected {expected}")]
    SignerMismatch { expected: Address, recovered: Address },

    /// A threshold module got fewer owner signatures than its threshold.
    #[error("module {module} needs {threshold} signatures, got {provided}")]
    InsufficientSignatures {
        module: Address,
        threshold: usize,
        provided: usize,
    },

    /// A signature came from an address that is not a registered owner.
    #[error("{signer} is not an owner of module {module}")]
    UnknownOwner { module: Address, signer: Address },

    /// A gas or fee field does not fit the packed 128-bit slot.
    #[error("gas field `{field}` exceeds 128 bits")]
    GasFieldOverflow { field: &'static str },

    #[error("cannot encode an empty call batch")]
    EmptyCallBatch,

    /// A signature or payload had an unexpected shape.
    #[error("malformed {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A value does not fit the on-chain layout it must be packed into.
    #[error("cannot encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl AccountError {
    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        AccountError::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(what: &'static str, reason: impl ToString) -> Self {
        AccountError::Encode {
            what,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = AccountError> = std::result::Result<T, E>;
