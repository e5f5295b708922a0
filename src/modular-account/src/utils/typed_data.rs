//! EIP-712 digest computation and ERC-7739 nested typed-data hashing.
//!
//! The account re-hashes an application's typed-data request against its own
//! domain (`TypedDataSign`) so a single signature binds both the app message
//! and the account identity.

use alloy_primitives::{keccak256, Address, FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::errors::{AccountError, Result};

/// EIP-712 domain of the smart account itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
    #[serde(default)]
    pub salt: FixedBytes<32>,
}

/// An application's typed-data request, already reduced to hashes.
///
/// `contents_type` is the EIP-712 `encodeType` of the primary type, e.g.
/// `Mail(address to,string contents)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataRequest {
    pub app_domain_separator: FixedBytes<32>,
    pub contents_hash: FixedBytes<32>,
    pub contents_type: String,
}

impl TypedDataRequest {
    /// Primary type name: everything before the first `(`.
    pub fn contents_name(&self) -> Result<&str> {
        let name = self
            .contents_type
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or_default();
        if name.is_empty() || name.contains(|c: char| c == ',' || c == ')' || c.is_whitespace()) {
            return Err(AccountError::decode(
                "typed data contents type",
                format!("cannot derive a type name from `{}`", self.contents_type),
            ));
        }
        Ok(name)
    }
}

fn pad_address(addr: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(addr.as_slice());
    padded
}

/// Separator of an application's salt-less EIP-712 domain:
/// `keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract))`.
///
/// Callers use it to fill [`TypedDataRequest::app_domain_separator`] when the
/// application domain is known by its fields. The account's own domain
/// carries a salt and goes through [`typed_data_sign_struct_hash`] instead.
pub fn domain_separator(
    name: &str,
    version: &str,
    chain_id: u64,
    verifying_contract: Address,
) -> FixedBytes<32> {
    let domain_type_hash = keccak256(
        b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
    );

    let mut domain_buf = Vec::with_capacity(32 * 5);
    domain_buf.extend_from_slice(domain_type_hash.as_slice());
    domain_buf.extend_from_slice(keccak256(name.as_bytes()).as_slice());
    domain_buf.extend_from_slice(keccak256(version.as_bytes()).as_slice());
    domain_buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    domain_buf.extend_from_slice(&pad_address(verifying_contract));
    keccak256(domain_buf)
}

/// Final digest: `keccak256("\x19\x01" ∥ domainSeparator ∥ structHash)`.
pub fn typed_data_digest(
    domain_separator: FixedBytes<32>,
    struct_hash: FixedBytes<32>,
) -> FixedBytes<32> {
    let mut final_buf = Vec::with_capacity(2 + 32 + 32);
    final_buf.extend_from_slice(b"\x19\x01");
    final_buf.extend_from_slice(domain_separator.as_slice());
    final_buf.extend_from_slice(struct_hash.as_slice());
    keccak256(final_buf)
}

/// Struct hash of `TypedDataSign` wrapping `request` for `account`.
///
/// Type string:
/// `TypedDataSign(<Name> contents,string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)<contentsType>`
pub fn typed_data_sign_struct_hash(
    request: &TypedDataRequest,
    account: &AccountDomain,
) -> Result<FixedBytes<32>> {
    let contents_name = request.contents_name()?;
    let type_string = format!(
        "TypedDataSign({contents_name} contents,string name,string version,uint256 chainId,\
         address verifyingContract,bytes32 salt){}",
        request.contents_type
    );

    let mut struct_buf = Vec::with_capacity(32 * 7);
    struct_buf.extend_from_slice(keccak256(type_string.as_bytes()).as_slice());
    struct_buf.extend_from_slice(request.contents_hash.as_slice());
    struct_buf.extend_from_slice(keccak256(account.name.as_bytes()).as_slice());
    struct_buf.extend_from_slice(keccak256(account.version.as_bytes()).as_slice());
    struct_buf.extend_from_slice(&U256::from(account.chain_id).to_be_bytes::<32>());
    struct_buf.extend_from_slice(&pad_address(account.verifying_contract));
    struct_buf.extend_from_slice(account.salt.as_slice());
    Ok(keccak256(struct_buf))
}

/// Digest a signer must sign for a nested typed-data request.
pub fn nested_typed_data_digest(
    request: &TypedDataRequest,
    account: &AccountDomain,
) -> Result<FixedBytes<32>> {
    let struct_hash = typed_data_sign_struct_hash(request, account)?;
    Ok(typed_data_digest(request.app_domain_separator, struct_hash))
}
