//! The account: address resolution, intent construction and signing through
//! the active validator module.
//!
//! Exactly one module is active at a time. Every signing call snapshots the
//! active module (an `Arc`) when it starts, so a concurrent
//! [`Account::set_active`] never affects a signature already in flight.

use std::sync::{Arc, RwLock};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, instrument};

use modular_account_types::{
    AccountSigner, Call, ChainError, ChainReader, GasSettings, IntentSubmitter, NonceKey, UserOperation,
};

use crate::{
    address::{AddressResolver, AddressState},
    config::AccountConfig,
    envelope::SignatureEnvelope,
    erc7579::{
        constants::ERC1271_MAGIC_VALUE,
        interfaces::{IEntryPoint, IERC1271},
    },
    errors::{AccountError, Result},
    execution::encode_calls,
    hasher::user_operation_hash,
    modules::ValidatorModule,
    utils::{
        crypto::recover_address,
        typed_data::{typed_data_sign_struct_hash, AccountDomain, TypedDataRequest},
    },
};

pub struct Account {
    config: AccountConfig,
    chain: Arc<dyn ChainReader>,
    owner: Arc<dyn AccountSigner>,
    resolver: AddressResolver,
    active: RwLock<Arc<ValidatorModule>>,
    nonce_namespace: u64,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("owner", &self.owner.address())
            .field("chain_id", &self.config.chain_id)
            .field("address", &self.resolver.state())
            .field("active", &self.get_active().address())
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Create an account owned by `owner` with `module` active.
    pub fn new(
        config: AccountConfig,
        chain: Arc<dyn ChainReader>,
        owner: Arc<dyn AccountSigner>,
        module: ValidatorModule,
    ) -> Result<Self> {
        config.validate()?;
        let mut resolver = AddressResolver::new(
            config.factory,
            config.entrypoint,
            config.chain_id,
            config.factory_args(owner.address()),
        );
        if let Some(address) = config.address {
            resolver = resolver.with_override(address);
        }
        Ok(Self {
            config,
            chain,
            owner,
            resolver,
            active: RwLock::new(Arc::new(module)),
            nonce_namespace: 0,
        })
    }

    /// Namespace used for the nonce key of built intents. Defaults to 0.
    pub fn with_nonce_namespace(mut self, namespace: u64) -> Self {
        self.nonce_namespace = namespace;
        self
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn owner(&self) -> Address {
        self.owner.address()
    }

    pub fn address_state(&self) -> AddressState {
        self.resolver.state()
    }

    /// Replace the active module, returning the previous one.
    pub fn set_active(&self, module: ValidatorModule) -> Arc<ValidatorModule> {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        debug!(from = %active.address(), to = %module.address(), kind = module.kind().name(), "switching active module");
        std::mem::replace(&mut *active, Arc::new(module))
    }

    /// Snapshot of the active module.
    pub fn get_active(&self) -> Arc<ValidatorModule> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn address(&self) -> Result<Address> {
        self.resolver.resolve(self.chain.as_ref()).await
    }

    pub async fn is_deployed(&self) -> Result<bool> {
        self.resolver.is_deployed(self.chain.as_ref()).await
    }

    /// `(factory, factoryData)` while undeployed, `None` afterwards.
    pub async fn factory_args(&self) -> Result<Option<(Address, Bytes)>> {
        if self.is_deployed().await? {
            return Ok(None);
        }
        Ok(Some((self.resolver.factory(), self.resolver.factory_data())))
    }

    /// `factory ∥ factoryData` while undeployed, empty afterwards.
    pub async fn init_code(&self) -> Result<Bytes> {
        if self.is_deployed().await? {
            return Ok(Bytes::new());
        }
        Ok(self.resolver.init_code())
    }

    /// Full nonce (`key ∥ sequence`) the entrypoint expects next for `key`.
    pub async fn nonce(&self, key: NonceKey) -> Result<U256> {
        let sender = self.address().await?;
        let call = IEntryPoint::getNonceCall {
            sender,
            key: key.encode(),
        };
        let out = self
            .chain
            .call(self.config.entrypoint, call.abi_encode().into())
            .await?;
        let decoded = IEntryPoint::getNonceCall::abi_decode_returns(&out, true)
            .map_err(|e| AccountError::decode("getNonce return", e))?;
        Ok(decoded.nonce)
    }

    /// Unsigned intent executing `calls`, keyed to the active module.
    #[instrument(skip_all, fields(calls = calls.len()))]
    pub async fn build_intent(&self, calls: &[Call], gas: GasSettings) -> Result<UserOperation> {
        let module = self.get_active();
        let call_data = encode_calls(calls)?;
        let sender = self.address().await?;
        let nonce = self.nonce(module.nonce_key(self.nonce_namespace)).await?;
        let (factory, factory_data) = match self.factory_args().await? {
            Some((factory, data)) => (Some(factory), Some(data)),
            None => (None, None),
        };
        Ok(UserOperation {
            sender,
            nonce,
            factory,
            factory_data,
            call_data,
            gas,
            paymaster: None,
            signature: Bytes::new(),
        })
    }

    pub fn intent_hash(&self, intent: &UserOperation) -> Result<B256> {
        user_operation_hash(intent, self.config.entrypoint, self.config.chain_id)
    }

    /// Sign `intent` with the active module and store the signature.
    ///
    /// Returns the hash that was signed.
    #[instrument(skip_all, fields(sender = %intent.sender))]
    pub async fn sign_intent(&self, intent: &mut UserOperation) -> Result<B256> {
        let (_, module) = self.signing_module().await?;
        let hash = self.intent_hash(intent)?;
        intent.signature = module.sign_hash(hash).await?;
        debug!(%hash, module = %module.address(), "intent signed");
        Ok(hash)
    }

    /// Stub of the active module, for gas estimation.
    pub fn stub_intent_signature(&self) -> Bytes {
        self.get_active().stub_signature()
    }

    /// ERC-1271 signature over `message`, wrapped for ERC-6492 while undeployed.
    #[instrument(skip_all, fields(len = message.len()))]
    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let (_, module) = self.signing_module().await?;
        let raw = module.sign_message(message).await?;
        let plain = SignatureEnvelope::Plain {
            module: Some(module.address()),
            signature: raw,
        }
        .encode()?;
        self.wrap_for_deployment(plain).await
    }

    /// ERC-7739 nested signature over an application's typed data.
    #[instrument(skip_all)]
    pub async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Bytes> {
        let (address, module) = self.signing_module().await?;
        let domain = AccountDomain {
            name: self.config.domain_name.clone(),
            version: self.config.domain_version.clone(),
            chain_id: self.config.chain_id,
            verifying_contract: address,
            salt: B256::ZERO,
        };
        let struct_hash = typed_data_sign_struct_hash(request, &domain)?;
        let raw = module
            .sign_typed_data(request.app_domain_separator, struct_hash)
            .await?;
        let nested = SignatureEnvelope::NestedTypedData {
            signature: raw,
            app_domain_separator: request.app_domain_separator,
            contents_hash: request.contents_hash,
            contents_descr: request.contents_type.clone(),
        }
        .encode()?;
        let plain = SignatureEnvelope::Plain {
            module: Some(module.address()),
            signature: nested,
        }
        .encode()?;
        self.wrap_for_deployment(plain).await
    }

    /// Check that `signature` over `hash` recovers to `expected`.
    pub fn verify_owner_signature(&self, hash: B256, signature: &[u8], expected: Address) -> Result<()> {
        let recovered = recover_address(hash, signature)
            .ok_or_else(|| AccountError::decode("owner signature", "not a recoverable ECDSA signature"))?;
        if recovered != expected {
            return Err(AccountError::SignerMismatch { expected, recovered });
        }
        Ok(())
    }

    /// Ask the deployed account whether `signature` is valid for `hash`
    /// (ERC-1271). An undeployed account has nothing to ask and answers `false`.
    pub async fn is_valid_signature(&self, hash: B256, signature: Bytes) -> Result<bool> {
        if !self.is_deployed().await? {
            return Ok(false);
        }
        let address = self.address().await?;
        let call = IERC1271::isValidSignatureCall { hash, signature };
        let out = match self.chain.call(address, call.abi_encode().into()).await {
            Ok(out) => out,
            Err(ChainError::Reverted { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let decoded = IERC1271::isValidSignatureCall::abi_decode_returns(&out, true)
            .map_err(|e| AccountError::decode("isValidSignature return", e))?;
        Ok(decoded.magicValue.0 == ERC1271_MAGIC_VALUE)
    }

    /// Account call installing `module` as a validator.
    pub async fn install_module_call(&self, module: &ValidatorModule) -> Result<Call> {
        Ok(Call::new(self.address().await?, U256::ZERO, module.install_call_data()))
    }

    /// Account call uninstalling `module`.
    pub async fn uninstall_module_call(&self, module: &ValidatorModule) -> Result<Call> {
        Ok(Call::new(self.address().await?, U256::ZERO, module.uninstall_call_data()))
    }

    /// Hand a signed intent to `submitter`.
    pub async fn submit(&self, submitter: &dyn IntentSubmitter, intent: &UserOperation) -> Result<B256> {
        let tracked = submitter.submit(intent, self.config.entrypoint).await?;
        debug!(%tracked, sender = %intent.sender, "intent submitted");
        Ok(tracked)
    }

    /// Snapshot the active module and bind it to this account.
    async fn signing_module(&self) -> Result<(Address, Arc<ValidatorModule>)> {
        let module = self.get_active();
        let address = self.address().await?;
        match module.account() {
            Some(bound) if bound != address => Err(AccountError::ModuleNotActive {
                module: module.address(),
                account: address,
            }),
            Some(_) => Ok((address, module)),
            None => Ok((address, Arc::new((*module).clone().bind(address)))),
        }
    }

    async fn wrap_for_deployment(&self, signature: Bytes) -> Result<Bytes> {
        let deployed = self.is_deployed().await?;
        debug!(deployed, "selecting signature envelope");
        SignatureEnvelope::for_deployment_state(
            deployed,
            self.resolver.factory(),
            self.resolver.factory_data(),
            signature,
        )
        .encode()
    }
}
