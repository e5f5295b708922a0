//! Shared types for the modular account engine: calls, intents, nonce keys and
//! the collaborator interfaces (chain reader, signer, submitter).

pub mod call;
pub mod chain;
pub mod nonce;
pub mod signer;
pub mod user_op;

pub use call::Call;
pub use chain::{ChainError, ChainReader, IntentSubmitter};
pub use nonce::{join_nonce, split_nonce, NonceError, NonceKey, ValidationMode};
pub use signer::{AccountSigner, RemoteSigningService, SignerError};
pub use user_op::{GasSettings, PaymasterFields, UserOperation};
