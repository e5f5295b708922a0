use std::sync::Arc;

use alloy_primitives::{address, eip191_hash_message, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use tokio::sync::Notify;

use modular_account_types::{AccountSigner, Call, GasSettings, SignerError};

use crate::{
    account::Account,
    config::AccountConfig,
    envelope::SignatureEnvelope,
    erc7579::{constants::ENTRYPOINT_V07, interfaces::IERC7579Account},
    errors::AccountError,
    mock::{MockChainReader, MockRemoteSigner, MockSubmitter, ANVIL_KEY_0},
    modules::{MultisigValidator, SessionValidator, ValidatorModule},
    signer::LocalSigner,
    utils::{
        crypto::recover_address,
        typed_data::{
            domain_separator, typed_data_digest, typed_data_sign_struct_hash, AccountDomain, TypedDataRequest,
        },
    },
};

const ANVIL_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

const FACTORY: Address = address!("887ca6fade60d0ef4a3e58e8b6bb7fc9d1864778");
const ACCOUNT: Address = address!("5f2a6e7c1d0b9a8e3c4f5d6b7a8e9f0c1d2e3f40");
const K1_MODULE: Address = address!("00000000d12897ddadc2044614a9677b191a2d95");
const MULTISIG_MODULE: Address = address!("7777777777777777777777777777777777777777");
const SESSION_MODULE: Address = address!("00000000008bdaba73cd9815d79069c247eb4bda");
const REMOTE_MODULE: Address = address!("6666666666666666666666666666666666666666");

fn owner() -> Arc<LocalSigner> {
    Arc::new(LocalSigner::from_hex(ANVIL_KEY_0).unwrap())
}

fn config() -> AccountConfig {
    AccountConfig::new(11155111, FACTORY)
}

fn chain() -> MockChainReader {
    MockChainReader::default().with_factory_address(FACTORY, ACCOUNT)
}

fn account_on(chain: Arc<MockChainReader>) -> Account {
    let owner = owner();
    Account::new(config(), chain, owner.clone(), ValidatorModule::owner(K1_MODULE, owner)).unwrap()
}

fn mail_request() -> TypedDataRequest {
    TypedDataRequest {
        app_domain_separator: domain_separator("Ether Mail", "1", 11155111, Address::repeat_byte(0xcc)),
        contents_hash: FixedBytes::repeat_byte(0x32),
        contents_type: "Mail(address to,string contents)".into(),
    }
}

fn nexus_domain() -> AccountDomain {
    AccountDomain {
        name: "Nexus".into(),
        version: "1.2.0".into(),
        chain_id: 11155111,
        verifying_contract: ACCOUNT,
        salt: B256::ZERO,
    }
}

fn gas() -> GasSettings {
    GasSettings {
        call_gas_limit: U256::from(80_000u64),
        verification_gas_limit: U256::from(150_000u64),
        pre_verification_gas: U256::from(45_000u64),
        max_fee_per_gas: U256::from(2_000_000_000u64),
        max_priority_fee_per_gas: U256::from(1_000_000u64),
    }
}

/// Signer that parks inside `sign_message` until released.
struct GatedSigner {
    inner: LocalSigner,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl AccountSigner for GatedSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.sign_message(message).await
    }

    async fn sign_typed_data(&self, domain_separator: B256, struct_hash: B256) -> Result<Bytes, SignerError> {
        self.inner.sign_typed_data(domain_separator, struct_hash).await
    }
}

#[tokio::test]
async fn address_is_stable_across_repeated_resolution() -> eyre::Result<()> {
    let chain = Arc::new(chain());
    let account = account_on(chain.clone());
    for _ in 0..100 {
        assert_eq!(account.address().await?, ACCOUNT);
    }
    assert_eq!(chain.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn explicit_address_needs_no_chain() -> eyre::Result<()> {
    let chain = Arc::new(MockChainReader::default());
    let owner = owner();
    let account = Account::new(
        config().with_address(ACCOUNT),
        chain.clone(),
        owner.clone(),
        ValidatorModule::owner(K1_MODULE, owner),
    )?;
    assert_eq!(account.address().await?, ACCOUNT);
    assert_eq!(chain.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn resolution_failure_carries_context() {
    let account = account_on(Arc::new(MockChainReader::default()));
    match account.address().await {
        Err(AccountError::AddressResolution { factory, entrypoint, chain_id, .. }) => {
            assert_eq!(factory, FACTORY);
            assert_eq!(entrypoint, ENTRYPOINT_V07);
            assert_eq!(chain_id, 11155111);
        }
        other => panic!("expected resolution failure, got {other:?}"),
    }
}

#[tokio::test]
async fn message_signature_is_wrapped_only_while_undeployed() -> eyre::Result<()> {
    let chain = Arc::new(chain());
    let account = account_on(chain.clone());

    let wrapped = account.sign_message(b"hello").await?;
    assert!(SignatureEnvelope::is_deployment_aware(&wrapped));
    let SignatureEnvelope::DeploymentAware { factory, factory_data, signature: inner } =
        SignatureEnvelope::decode_deployment_aware(&wrapped)?
    else {
        panic!("expected deployment-aware envelope");
    };
    assert_eq!(factory, FACTORY);
    assert_eq!(&factory_data[..4], &crate::erc7579::interfaces::IAccountFactory::createAccountCall::SELECTOR);
    assert_eq!(&inner[..20], K1_MODULE.as_slice());
    assert_eq!(recover_address(eip191_hash_message(b"hello"), &inner[20..]), Some(owner().address()));

    chain.set_code(ACCOUNT, Bytes::from(vec![0x60, 0x80, 0x60, 0x40]));
    let plain = account.sign_message(b"hello").await?;
    assert!(!SignatureEnvelope::is_deployment_aware(&plain));
    assert_eq!(plain, inner);
    Ok(())
}

#[tokio::test]
async fn typed_data_uses_nested_envelope_behind_module_prefix() -> eyre::Result<()> {
    let chain = Arc::new(chain());
    chain.set_code(ACCOUNT, Bytes::from(vec![0xfe]));
    let account = account_on(chain);

    let request = mail_request();
    let out = account.sign_typed_data(&request).await?;
    assert_eq!(&out[..20], K1_MODULE.as_slice());

    let SignatureEnvelope::NestedTypedData { signature, app_domain_separator, contents_hash, contents_descr } =
        SignatureEnvelope::decode_nested(&out[20..])?
    else {
        panic!("expected nested envelope");
    };
    assert_eq!(app_domain_separator, request.app_domain_separator);
    assert_eq!(contents_hash, request.contents_hash);
    assert_eq!(contents_descr, request.contents_type);

    let digest = typed_data_digest(
        request.app_domain_separator,
        typed_data_sign_struct_hash(&request, &nexus_domain())?,
    );
    assert_eq!(recover_address(digest, &signature), Some(owner().address()));
    Ok(())
}

#[tokio::test]
async fn undeployed_typed_data_wraps_prefixed_nested_envelope() -> eyre::Result<()> {
    let account = account_on(Arc::new(chain()));
    let request = mail_request();

    let out = account.sign_typed_data(&request).await?;
    assert!(SignatureEnvelope::is_deployment_aware(&out));
    let SignatureEnvelope::DeploymentAware { factory, signature: inner, .. } =
        SignatureEnvelope::decode_deployment_aware(&out)?
    else {
        panic!("expected deployment-aware envelope");
    };
    assert_eq!(factory, FACTORY);
    assert_eq!(&inner[..20], K1_MODULE.as_slice());

    let SignatureEnvelope::NestedTypedData { signature, app_domain_separator, contents_hash, contents_descr } =
        SignatureEnvelope::decode_nested(&inner[20..])?
    else {
        panic!("expected nested envelope");
    };
    assert_eq!(app_domain_separator, request.app_domain_separator);
    assert_eq!(contents_hash, request.contents_hash);
    assert_eq!(contents_descr, request.contents_type);
    let digest = typed_data_digest(app_domain_separator, typed_data_sign_struct_hash(&request, &nexus_domain())?);
    assert_eq!(recover_address(digest, &signature), Some(owner().address()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_address_calls_resolve_once() -> eyre::Result<()> {
    let chain = Arc::new(chain());
    let account = Arc::new(account_on(chain.clone()));
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let account = account.clone();
            tokio::spawn(async move { account.address().await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await??, ACCOUNT);
    }
    assert_eq!(chain.call_count(), 1);
    assert_eq!(account.address_state(), crate::address::AddressState::Resolved(ACCOUNT));
    Ok(())
}

#[tokio::test]
async fn single_owner_signs_zero_hash() -> eyre::Result<()> {
    let account = account_on(Arc::new(chain()));
    let sig = account.get_active().sign_hash(B256::ZERO).await?;
    assert_eq!(sig.len(), 65);
    assert!(sig[64] == 27 || sig[64] == 28);
    Ok(())
}

#[tokio::test]
async fn threshold_two_concatenates_in_owner_order() -> eyre::Result<()> {
    let s1 = Arc::new(LocalSigner::from_hex(ANVIL_KEY_0)?);
    let s2 = Arc::new(LocalSigner::from_hex(ANVIL_KEY_1)?);
    let validator = MultisigValidator::from_signers(vec![s1.clone() as Arc<dyn AccountSigner>, s2.clone()], 2)?;
    let module = ValidatorModule::multisig(MULTISIG_MODULE, validator);

    let hash = B256::repeat_byte(0x5a);
    let expected1 = s1.sign_message(hash.as_slice()).await?;
    let expected2 = s2.sign_message(hash.as_slice()).await?;

    let sig = module.sign_hash(hash).await?;
    assert_eq!(sig.len(), 130);
    assert_eq!(&sig[..65], &expected1[..]);
    assert_eq!(&sig[65..], &expected2[..]);
    assert_eq!(module.stub_signature().len(), 130);
    Ok(())
}

#[tokio::test]
async fn intent_is_built_hashed_and_signed() -> eyre::Result<()> {
    let key_nonce = U256::from(7u64);
    let chain = Arc::new(chain().with_nonce(ENTRYPOINT_V07, key_nonce));
    let account = account_on(chain.clone());

    let calls = [Call::transfer(address!("000000000000000000000000000000000000dead"), U256::from(1u64))];
    let mut intent = account.build_intent(&calls, gas()).await?;
    assert_eq!(intent.sender, ACCOUNT);
    assert_eq!(intent.nonce, key_nonce);
    assert_eq!(intent.factory, Some(FACTORY));
    assert!(intent.signature.is_empty());
    assert_eq!(crate::execution::decode_calls(&intent.call_data)?, calls.to_vec());

    let before = account.intent_hash(&intent)?;
    let signed_hash = account.sign_intent(&mut intent).await?;
    assert_eq!(before, signed_hash);
    assert_eq!(account.intent_hash(&intent)?, before);
    assert_eq!(intent.signature.len(), 65);

    account.verify_owner_signature(eip191_hash_message(before), &intent.signature, owner().address())?;
    assert!(matches!(
        account.verify_owner_signature(eip191_hash_message(before), &intent.signature, ACCOUNT),
        Err(AccountError::SignerMismatch { .. })
    ));

    let submitter = MockSubmitter::default();
    account.submit(&submitter, &intent).await?;
    assert_eq!(submitter.submitted(), vec![intent]);
    Ok(())
}

#[tokio::test]
async fn deployed_account_omits_factory_fields() -> eyre::Result<()> {
    let chain = Arc::new(chain().with_nonce(ENTRYPOINT_V07, U256::ZERO));
    chain.set_code(ACCOUNT, Bytes::from(vec![0xef, 0x01]));
    let account = account_on(chain);

    assert!(account.factory_args().await?.is_none());
    assert!(account.init_code().await?.is_empty());
    let intent = account.build_intent(&[Call::transfer(ACCOUNT, U256::ZERO)], gas()).await?;
    assert!(intent.factory.is_none());
    assert!(intent.factory_data.is_none());
    Ok(())
}

#[tokio::test]
async fn empty_call_list_is_rejected() {
    let account = account_on(Arc::new(chain().with_nonce(ENTRYPOINT_V07, U256::ZERO)));
    assert!(matches!(
        account.build_intent(&[], gas()).await,
        Err(AccountError::EmptyCallBatch)
    ));
}

#[tokio::test]
async fn switching_module_does_not_affect_signature_in_flight() -> eyre::Result<()> {
    let chain = Arc::new(chain());
    chain.set_code(ACCOUNT, Bytes::from(vec![0xfe]));
    let gated = Arc::new(GatedSigner {
        inner: LocalSigner::from_hex(ANVIL_KEY_0)?,
        started: Notify::new(),
        release: Notify::new(),
    });
    let account = Arc::new(Account::new(
        config(),
        chain,
        gated.clone(),
        ValidatorModule::owner(K1_MODULE, gated.clone()),
    )?);

    let task = {
        let account = account.clone();
        tokio::spawn(async move { account.sign_message(b"in flight").await })
    };
    gated.started.notified().await;

    let previous = account.set_active(ValidatorModule::owner(MULTISIG_MODULE, owner()));
    assert_eq!(previous.address(), K1_MODULE);
    assert_eq!(account.get_active().address(), MULTISIG_MODULE);
    gated.release.notify_one();

    let sig = task.await??;
    assert_eq!(&sig[..20], K1_MODULE.as_slice());

    let next = account.sign_message(b"after").await?;
    assert_eq!(&next[..20], MULTISIG_MODULE.as_slice());
    Ok(())
}

#[tokio::test]
async fn stub_follows_active_module() -> eyre::Result<()> {
    let account = account_on(Arc::new(chain()));
    assert_eq!(account.stub_intent_signature().len(), 65);

    let ms = MultisigValidator::new(vec![Address::repeat_byte(1), Address::repeat_byte(2)], 2)?;
    account.set_active(ValidatorModule::multisig(MULTISIG_MODULE, ms));
    assert_eq!(account.stub_intent_signature().len(), 130);
    Ok(())
}

#[tokio::test]
async fn session_module_bound_elsewhere_is_not_active() {
    let account = account_on(Arc::new(chain()));
    let session = SessionValidator::using(B256::repeat_byte(9), owner());
    account.set_active(
        ValidatorModule::session(SESSION_MODULE, session).bind(Address::repeat_byte(0xbb)),
    );
    match account.sign_message(b"x").await {
        Err(AccountError::ModuleNotActive { module, account }) => {
            assert_eq!(module, SESSION_MODULE);
            assert_eq!(account, ACCOUNT);
        }
        other => panic!("expected ModuleNotActive, got {other:?}"),
    }
}

#[tokio::test]
async fn session_enable_without_proof_fails() {
    let account = account_on(Arc::new(chain()));
    let session = SessionValidator::enabling(B256::repeat_byte(9), owner(), None);
    account.set_active(ValidatorModule::session(SESSION_MODULE, session));
    let mut intent = modular_account_types::UserOperation {
        sender: ACCOUNT,
        ..Default::default()
    };
    assert!(matches!(
        account.sign_intent(&mut intent).await,
        Err(AccountError::MissingEnableProof { module, .. }) if module == SESSION_MODULE
    ));
    assert!(intent.signature.is_empty());
}

#[tokio::test]
async fn remote_module_is_bound_to_the_account() -> eyre::Result<()> {
    let account = account_on(Arc::new(chain()));
    let service = Arc::new(MockRemoteSigner::new(vec![0x42; 65]));
    account.set_active(ValidatorModule::remote(REMOTE_MODULE, service.clone(), Bytes::new()));

    let mut intent = modular_account_types::UserOperation {
        sender: ACCOUNT,
        ..Default::default()
    };
    let hash = account.sign_intent(&mut intent).await?;
    assert_eq!(intent.signature, Bytes::from(vec![0x42; 65]));
    assert_eq!(service.requests(), vec![(ACCOUNT, REMOTE_MODULE, hash)]);
    Ok(())
}

#[tokio::test]
async fn install_call_targets_the_account_itself() -> eyre::Result<()> {
    let account = account_on(Arc::new(chain()));
    let module = ValidatorModule::owner(K1_MODULE, owner());
    let call = account.install_module_call(&module).await?;
    assert_eq!(call.to, ACCOUNT);
    let decoded = IERC7579Account::installModuleCall::abi_decode(&call.data, true)?;
    assert_eq!(decoded.module, K1_MODULE);
    assert_eq!(decoded.initData.as_ref(), owner().address().as_slice());

    let call = account.uninstall_module_call(&module).await?;
    assert!(IERC7579Account::uninstallModuleCall::abi_decode(&call.data, true).is_ok());
    Ok(())
}

#[tokio::test]
async fn erc1271_check_asks_the_deployed_account() -> eyre::Result<()> {
    use crate::erc7579::{constants::ERC1271_MAGIC_VALUE, interfaces::IERC1271};
    use alloy_sol_types::SolValue;

    let chain = Arc::new(chain().with_response(
        ACCOUNT,
        IERC1271::isValidSignatureCall::SELECTOR,
        Ok(FixedBytes::<4>(ERC1271_MAGIC_VALUE).abi_encode().into()),
    ));
    let account = account_on(chain.clone());
    let hash = B256::repeat_byte(3);

    assert!(!account.is_valid_signature(hash, Bytes::from(vec![1; 65])).await?);
    chain.set_code(ACCOUNT, Bytes::from(vec![0xfe]));
    assert!(account.is_valid_signature(hash, Bytes::from(vec![1; 65])).await?);
    Ok(())
}
