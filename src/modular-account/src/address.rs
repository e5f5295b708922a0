//! Counterfactual account address resolution.
//!
//! Strategy order:
//! 1. explicit override, returned without touching the chain;
//! 2. factory `computeAccountAddress(owner, index, attesters, threshold)`;
//! 3. entrypoint `getSenderAddress(initCode)`, decoding the
//!    `SenderAddressResult(address)` revert.
//!
//! The first success is memoized for the lifetime of the resolver. Concurrent
//! callers that find the address unresolved queue behind one in-flight
//! resolution instead of each querying the chain.

use std::sync::RwLock;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use modular_account_types::{ChainError, ChainReader};

use crate::{
    erc7579::interfaces::{IAccountFactory, IEntryPoint},
    errors::{AccountError, Result},
};

/// Memoization state of the account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressState {
    Unresolved,
    Resolved(Address),
}

/// Factory inputs that determine the counterfactual address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryArgs {
    pub owner: Address,
    #[serde(default)]
    pub index: U256,
    #[serde(default)]
    pub attesters: Vec<Address>,
    #[serde(default)]
    pub attester_threshold: u8,
}

impl FactoryArgs {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            index: U256::ZERO,
            attesters: Vec::new(),
            attester_threshold: 0,
        }
    }
}

#[derive(Debug)]
pub struct AddressResolver {
    factory: Address,
    entrypoint: Address,
    chain_id: u64,
    args: FactoryArgs,
    state: RwLock<AddressState>,
    resolving: Mutex<()>,
}

impl AddressResolver {
    pub fn new(factory: Address, entrypoint: Address, chain_id: u64, args: FactoryArgs) -> Self {
        Self {
            factory,
            entrypoint,
            chain_id,
            args,
            state: RwLock::new(AddressState::Unresolved),
            resolving: Mutex::new(()),
        }
    }

    /// Skip resolution entirely and always answer `address`.
    pub fn with_override(self, address: Address) -> Self {
        Self {
            state: RwLock::new(AddressState::Resolved(address)),
            ..self
        }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn args(&self) -> &FactoryArgs {
        &self.args
    }

    pub fn state(&self) -> AddressState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// `createAccount(owner, index, attesters, threshold)` calldata.
    pub fn factory_data(&self) -> Bytes {
        IAccountFactory::createAccountCall {
            eoaOwner: self.args.owner,
            index: self.args.index,
            attesters: self.args.attesters.clone(),
            threshold: self.args.attester_threshold,
        }
        .abi_encode()
        .into()
    }

    /// `factory ∥ factoryData`.
    pub fn init_code(&self) -> Bytes {
        let data = self.factory_data();
        let mut out = Vec::with_capacity(20 + data.len());
        out.extend_from_slice(self.factory.as_slice());
        out.extend_from_slice(&data);
        out.into()
    }

    /// Resolve (or return the memoized) account address.
    #[instrument(skip_all, fields(factory = %self.factory, chain_id = self.chain_id))]
    pub async fn resolve(&self, chain: &dyn ChainReader) -> Result<Address> {
        if let AddressState::Resolved(address) = self.state() {
            return Ok(address);
        }
        let _in_flight = self.resolving.lock().await;
        if let AddressState::Resolved(address) = self.state() {
            return Ok(address);
        }

        let factory_err = match self.via_factory(chain).await {
            Ok(address) => return Ok(self.memoize(address)),
            Err(reason) => reason,
        };
        debug!(reason = %factory_err, "factory address computation failed, simulating via entrypoint");

        match self.via_entrypoint(chain).await {
            Ok(address) => Ok(self.memoize(address)),
            Err(entrypoint_err) => Err(AccountError::AddressResolution {
                factory: self.factory,
                entrypoint: self.entrypoint,
                chain_id: self.chain_id,
                factory_reason: factory_err,
                entrypoint_reason: entrypoint_err,
            }),
        }
    }

    /// Whether code exists at the resolved address. Never memoized.
    pub async fn is_deployed(&self, chain: &dyn ChainReader) -> Result<bool> {
        let address = self.resolve(chain).await?;
        let code = chain.get_code(address).await?;
        Ok(!code.is_empty())
    }

    fn memoize(&self, address: Address) -> Address {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match *state {
            AddressState::Unresolved => {
                debug!(%address, "account address resolved");
                *state = AddressState::Resolved(address);
                address
            }
            AddressState::Resolved(existing) => {
                if existing != address {
                    warn!(%existing, %address, "concurrent resolution disagreed, keeping first");
                }
                existing
            }
        }
    }

    async fn via_factory(&self, chain: &dyn ChainReader) -> Result<Address, String> {
        let call = IAccountFactory::computeAccountAddressCall {
            eoaOwner: self.args.owner,
            index: self.args.index,
            attesters: self.args.attesters.clone(),
            threshold: self.args.attester_threshold,
        };
        let out = chain
            .call(self.factory, call.abi_encode().into())
            .await
            .map_err(|e| e.to_string())?;
        let decoded = IAccountFactory::computeAccountAddressCall::abi_decode_returns(&out, true)
            .map_err(|e| format!("undecodable return: {e}"))?;
        if decoded.expectedAddress == Address::ZERO {
            return Err("factory returned the zero address".to_string());
        }
        Ok(decoded.expectedAddress)
    }

    async fn via_entrypoint(&self, chain: &dyn ChainReader) -> Result<Address, String> {
        let call = IEntryPoint::getSenderAddressCall {
            initCode: self.init_code(),
        };
        match chain.call(self.entrypoint, call.abi_encode().into()).await {
            Ok(_) => Err("getSenderAddress returned without reverting".to_string()),
            Err(ChainError::Reverted { data, .. }) => {
                IEntryPoint::SenderAddressResult::abi_decode(&data, true)
                    .map(|r| r.sender)
                    .map_err(|e| format!("unexpected revert payload: {e}"))
            }
            Err(other) => Err(other.to_string()),
        }
    }
}
