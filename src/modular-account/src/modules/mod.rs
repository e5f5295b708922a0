//! Validator modules: the pluggable signing strategies of a modular account.
//!
//! The strategy set is closed ([`ValidatorKind`]); every capability is
//! dispatched with a `match`. A [`ValidatorModule`] pairs a strategy with its
//! on-chain module address, the account it is bound to and its install
//! payloads.

pub mod multisig;
pub mod owner;
pub mod remote;
pub mod session;

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_sol_types::SolCall;
use tracing::debug;

use modular_account_types::{AccountSigner, NonceKey, RemoteSigningService, ValidationMode};

use crate::{
    erc7579::{
        constants::MODULE_TYPE_VALIDATOR,
        interfaces::IERC7579Account,
    },
    errors::Result,
};

pub use multisig::MultisigValidator;
pub use owner::OwnerValidator;
pub use remote::RemoteValidator;
pub use session::{SessionMode, SessionValidator};

/// Syntactically valid ECDSA signature that no key produces, for gas estimation.
pub fn dummy_ecdsa_signature() -> Bytes {
    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(&[0xff; 15]);
    sig.push(0xf0);
    sig.extend_from_slice(&[0x00; 16]);
    sig.push(0x7a);
    sig.extend_from_slice(&[0xaa; 31]);
    sig.push(0x1c);
    sig.into()
}

#[derive(Clone, Debug)]
pub enum ValidatorKind {
    Owner(OwnerValidator),
    Multisig(MultisigValidator),
    Session(SessionValidator),
    Remote(RemoteValidator),
}

impl ValidatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValidatorKind::Owner(_) => "owner",
            ValidatorKind::Multisig(_) => "multisig",
            ValidatorKind::Session(_) => "session",
            ValidatorKind::Remote(_) => "remote",
        }
    }
}

/// A validator installed (or to be installed) on an account.
#[derive(Clone, Debug)]
pub struct ValidatorModule {
    address: Address,
    account: Option<Address>,
    deinit_data: Bytes,
    kind: ValidatorKind,
}

impl ValidatorModule {
    pub fn new(address: Address, kind: ValidatorKind) -> Self {
        Self {
            address,
            account: None,
            deinit_data: Bytes::new(),
            kind,
        }
    }

    pub fn owner(address: Address, signer: Arc<dyn AccountSigner>) -> Self {
        Self::new(address, ValidatorKind::Owner(OwnerValidator::new(signer)))
    }

    pub fn multisig(address: Address, validator: MultisigValidator) -> Self {
        Self::new(address, ValidatorKind::Multisig(validator))
    }

    pub fn session(address: Address, validator: SessionValidator) -> Self {
        Self::new(address, ValidatorKind::Session(validator))
    }

    pub fn remote(address: Address, service: Arc<dyn RemoteSigningService>, init_data: Bytes) -> Self {
        Self::new(
            address,
            ValidatorKind::Remote(RemoteValidator::new(service, init_data)),
        )
    }

    /// Bind to `account`.
    pub fn bind(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_deinit_data(mut self, deinit_data: Bytes) -> Self {
        self.deinit_data = deinit_data;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn kind(&self) -> &ValidatorKind {
        &self.kind
    }

    pub fn module_type(&self) -> alloy_primitives::U256 {
        MODULE_TYPE_VALIDATOR
    }

    /// ERC-7579 `onInstall` payload.
    pub fn init_data(&self) -> Bytes {
        match &self.kind {
            ValidatorKind::Owner(v) => v.init_data(),
            ValidatorKind::Multisig(v) => v.init_data(),
            ValidatorKind::Session(v) => v.init_data(),
            ValidatorKind::Remote(v) => v.init_data(),
        }
    }

    /// ERC-7579 `onUninstall` payload.
    pub fn deinit_data(&self) -> Bytes {
        self.deinit_data.clone()
    }

    /// `installModule(1, module, initData)` calldata for the account.
    pub fn install_call_data(&self) -> Bytes {
        IERC7579Account::installModuleCall {
            moduleTypeId: MODULE_TYPE_VALIDATOR,
            module: self.address,
            initData: self.init_data(),
        }
        .abi_encode()
        .into()
    }

    /// `uninstallModule(1, module, deInitData)` calldata for the account.
    pub fn uninstall_call_data(&self) -> Bytes {
        IERC7579Account::uninstallModuleCall {
            moduleTypeId: MODULE_TYPE_VALIDATOR,
            module: self.address,
            deInitData: self.deinit_data(),
        }
        .abi_encode()
        .into()
    }

    /// Nonce key routing validation to this module.
    pub fn nonce_key(&self, namespace: u64) -> NonceKey {
        NonceKey::new(namespace, ValidationMode::Validate, self.address)
    }

    /// Placeholder of the right shape for gas estimation only.
    pub fn stub_signature(&self) -> Bytes {
        match &self.kind {
            ValidatorKind::Owner(v) => v.stub_signature(),
            ValidatorKind::Multisig(v) => v.stub_signature(),
            ValidatorKind::Session(v) => v.stub_signature(),
            ValidatorKind::Remote(v) => v.stub_signature(),
        }
    }

    /// Authorize an already computed 32-byte digest.
    pub async fn sign_hash(&self, hash: FixedBytes<32>) -> Result<Bytes> {
        debug!(module = %self.address, kind = self.kind.name(), "signing hash");
        match &self.kind {
            ValidatorKind::Owner(v) => v.sign_hash(hash).await,
            ValidatorKind::Multisig(v) => v.sign_hash(self.address, hash).await,
            ValidatorKind::Session(v) => v.sign_hash(self.address, hash).await,
            ValidatorKind::Remote(v) => v.sign_hash(self.address, self.account, hash).await,
        }
    }

    /// Sign an arbitrary message; the recovery byte is normalized to 27/28.
    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        debug!(module = %self.address, kind = self.kind.name(), len = message.len(), "signing message");
        match &self.kind {
            ValidatorKind::Owner(v) => v.sign_message(message).await,
            ValidatorKind::Multisig(v) => v.sign_message(self.address, message).await,
            ValidatorKind::Session(v) => v.sign_message(self.address, message).await,
            ValidatorKind::Remote(v) => v.sign_message(self.address, self.account, message).await,
        }
    }

    /// EIP-712 signature over `domain_separator` / `struct_hash`.
    pub async fn sign_typed_data(
        &self,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        debug!(module = %self.address, kind = self.kind.name(), "signing typed data");
        match &self.kind {
            ValidatorKind::Owner(v) => v.sign_typed_data(domain_separator, struct_hash).await,
            ValidatorKind::Multisig(v) => {
                v.sign_typed_data(self.address, domain_separator, struct_hash)
                    .await
            }
            ValidatorKind::Session(v) => {
                v.sign_typed_data(self.address, domain_separator, struct_hash)
                    .await
            }
            ValidatorKind::Remote(v) => {
                v.sign_typed_data(self.address, self.account, domain_separator, struct_hash)
                    .await
            }
        }
    }
}
