//! Canonical ERC-4337 v0.7 user operation hash.
//!
//! `keccak256(abi.encode(keccak256(pack(op)), entrypoint, chainId))`, where
//! `pack` hashes the dynamic fields and never includes the signature. Binding
//! entrypoint and chain id prevents cross-chain and cross-entrypoint replay.

use alloy_primitives::{keccak256, Address, FixedBytes, U256};
use alloy_sol_types::SolValue;
use tracing::trace;

use modular_account_types::UserOperation;

use crate::{errors::Result, execution::pack_user_operation};

/// `abi.encode` of the packed operation with dynamic fields hashed and the
/// signature left out.
pub fn encode_for_hash(op: &UserOperation) -> Result<Vec<u8>> {
    let packed = pack_user_operation(op)?;
    Ok((
        packed.sender,
        packed.nonce,
        keccak256(&packed.initCode),
        keccak256(&packed.callData),
        packed.accountGasLimits,
        packed.preVerificationGas,
        packed.gasFees,
        keccak256(&packed.paymasterAndData),
    )
        .abi_encode_params())
}

/// Hash that the active validator signs for `op`.
pub fn user_operation_hash(
    op: &UserOperation,
    entrypoint: Address,
    chain_id: u64,
) -> Result<FixedBytes<32>> {
    let inner = keccak256(encode_for_hash(op)?);
    let hash = keccak256((inner, entrypoint, U256::from(chain_id)).abi_encode_params());
    trace!(sender = %op.sender, %entrypoint, chain_id, %hash, "user operation hash");
    Ok(hash)
}
