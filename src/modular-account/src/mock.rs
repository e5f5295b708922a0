//! Mock collaborators for off-chain testing.
//!
//! These let the resolver, nonce lookup and remote validator run without an
//! RPC endpoint or a signing service.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolError, SolValue};
use async_trait::async_trait;

use modular_account_types::{
    ChainError, ChainReader, IntentSubmitter, RemoteSigningService, SignerError, UserOperation,
};

use crate::erc7579::interfaces::{IAccountFactory, IEntryPoint};

/// First default anvil/hardhat development key. Never holds real funds.
pub const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

type Selector = [u8; 4];

/// Canned chain state keyed by `(target, selector)`.
///
/// Unknown calls succeed with empty return data, which is what an `eth_call`
/// against an address without code yields.
#[derive(Debug, Default)]
pub struct MockChainReader {
    responses: Mutex<HashMap<(Address, Selector), Result<Bytes, ChainError>>>,
    code: Mutex<HashMap<Address, Bytes>>,
    calls: AtomicUsize,
}

impl MockChainReader {
    pub fn with_response(self, target: Address, selector: Selector, response: Result<Bytes, ChainError>) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((target, selector), response);
        self
    }

    /// Factory answers `computeAccountAddress` with `account`.
    pub fn with_factory_address(self, factory: Address, account: Address) -> Self {
        self.with_response(
            factory,
            IAccountFactory::computeAccountAddressCall::SELECTOR,
            Ok(account.abi_encode().into()),
        )
    }

    /// Entrypoint reverts `getSenderAddress` with `SenderAddressResult(account)`.
    pub fn with_sender_address_result(self, entrypoint: Address, account: Address) -> Self {
        let data = IEntryPoint::SenderAddressResult { sender: account }.abi_encode();
        self.with_response(
            entrypoint,
            IEntryPoint::getSenderAddressCall::SELECTOR,
            Err(ChainError::Reverted {
                target: entrypoint,
                data: data.into(),
            }),
        )
    }

    /// Entrypoint answers `getNonce` with `nonce` for every key.
    pub fn with_nonce(self, entrypoint: Address, nonce: U256) -> Self {
        self.with_response(
            entrypoint,
            IEntryPoint::getNonceCall::SELECTOR,
            Ok(nonce.abi_encode().into()),
        )
    }

    /// Deploy (or, with empty bytes, remove) code at `address`.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.code
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address, code);
    }

    /// Number of `call` requests served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if data.len() < 4 {
            return Ok(Bytes::new());
        }
        let selector: Selector = [data[0], data[1], data[2], data[3]];
        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(match responses.get(&(to, selector)) {
            Some(response) => response.clone()?,
            None => Bytes::new(),
        })
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ChainError> {
        let code = self.code.lock().unwrap_or_else(|e| e.into_inner());
        Ok(code.get(&address).cloned().unwrap_or_default())
    }
}

/// Remote signing service that answers every request with fixed bytes.
#[derive(Debug)]
pub struct MockRemoteSigner {
    signature: Bytes,
    requests: Mutex<Vec<(Address, Address, B256)>>,
}

impl MockRemoteSigner {
    pub fn new(signature: Vec<u8>) -> Self {
        Self {
            signature: signature.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(account, module, hash)` of every request received.
    pub fn requests(&self) -> Vec<(Address, Address, B256)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RemoteSigningService for MockRemoteSigner {
    async fn request_signature(
        &self,
        account: Address,
        module: Address,
        hash: B256,
    ) -> Result<Bytes, SignerError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((account, module, hash));
        Ok(self.signature.clone())
    }
}

/// Submitter that records intents and answers with a fixed hash.
#[derive(Debug, Default)]
pub struct MockSubmitter {
    submitted: Mutex<Vec<UserOperation>>,
}

impl MockSubmitter {
    pub fn submitted(&self) -> Vec<UserOperation> {
        self.submitted.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl IntentSubmitter for MockSubmitter {
    async fn submit(&self, intent: &UserOperation, _entrypoint: Address) -> Result<B256, ChainError> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(intent.clone());
        Ok(B256::repeat_byte(0x44))
    }
}
