use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use thiserror::Error;

use crate::user_op::UserOperation;

/// Errors surfaced by chain collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Used by off-chain mocks or partially implemented readers.
    #[error("chain reader does not implement this request")]
    NotImplemented,
    /// The view call reverted; `data` is the raw revert payload.
    #[error("call to {target} reverted ({} bytes of revert data)", .data.len())]
    Reverted { target: Address, data: Bytes },
    /// The return data could not be decoded.
    #[error("malformed return data from {target}")]
    MalformedReturn { target: Address },
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChainError {
    /// Raw revert payload, when the failure was a revert.
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            ChainError::Reverted { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Read-only chain access, implemented by RPC clients and by test mocks.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against `to` with the given calldata at the latest block.
    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Err(ChainError::NotImplemented)
    }

    /// `eth_getCode` at the latest block. Empty bytes mean no code.
    async fn get_code(&self, _address: Address) -> Result<Bytes, ChainError> {
        Err(ChainError::NotImplemented)
    }
}

/// Accepts a fully signed intent (bundler client, relay, ...).
#[async_trait]
pub trait IntentSubmitter: Send + Sync {
    /// Submit the intent and return the hash the submitter tracks it by.
    async fn submit(&self, intent: &UserOperation, entrypoint: Address) -> Result<B256, ChainError>;
}
