//! Modular smart-account signing engine.
//!
//! Derives the counterfactual account address, hashes ERC-4337 v0.7 intents,
//! and produces the signature envelopes an ERC-7579 account verifies on chain
//! through a swappable validator module.

pub mod account;
pub mod address;
pub mod config;
pub mod envelope;
pub mod erc7579;
pub mod errors;
pub mod execution;
pub mod hasher;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod modules;
pub mod signer;
pub mod utils;

#[cfg(test)]
mod tests;

pub use account::Account;
pub use address::{AddressResolver, AddressState, FactoryArgs};
pub use config::AccountConfig;
pub use envelope::SignatureEnvelope;
pub use errors::{AccountError, Result};
pub use execution::{decode_calls, encode_calls};
pub use hasher::user_operation_hash;
pub use modules::{
    MultisigValidator, OwnerValidator, RemoteValidator, SessionMode, SessionValidator,
    ValidatorKind, ValidatorModule,
};
pub use signer::LocalSigner;
pub use utils::typed_data::{AccountDomain, TypedDataRequest};

pub use modular_account_types::{
    join_nonce, split_nonce, AccountSigner, Call, ChainReader, GasSettings, IntentSubmitter,
    NonceKey, RemoteSigningService, UserOperation, ValidationMode,
};
