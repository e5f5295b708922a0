//! ERC-7579 execution calldata and the v0.7 user operation packer.
//!
//! A single call is `execute(mode = 0x00…, abi.encodePacked(target, value, data))`;
//! two or more calls are `execute(mode = 0x01…, abi.encode(Execution[]))`.
//! Nothing here checks reachability or value sufficiency; the chain does.

use alloy_primitives::{Bytes, FixedBytes, U256};
use alloy_sol_types::{SolCall, SolValue};

use modular_account_types::{Call, UserOperation};

use crate::{
    erc7579::{
        constants::{CALLTYPE_BATCH, CALLTYPE_SINGLE},
        interfaces::{Execution, IERC7579Account, PackedUserOperation},
    },
    errors::{AccountError, Result},
    utils::bytes::{pack_u128_pair, read_address, read_u256_be},
};

/// Execution mode word: call type in byte 0, default exec type, no selector/payload.
pub fn execution_mode(call_type: u8) -> FixedBytes<32> {
    let mut mode = [0u8; 32];
    mode[0] = call_type;
    FixedBytes(mode)
}

/// Encode `calls` as account `execute` calldata.
pub fn encode_calls(calls: &[Call]) -> Result<Bytes> {
    let (mode, execution_calldata) = match calls {
        [] => return Err(AccountError::EmptyCallBatch),
        [call] => {
            let mut packed = Vec::with_capacity(20 + 32 + call.data.len());
            packed.extend_from_slice(call.to.as_slice());
            packed.extend_from_slice(&call.value.to_be_bytes::<32>());
            packed.extend_from_slice(&call.data);
            (execution_mode(CALLTYPE_SINGLE), packed)
        }
        _ => {
            let executions: Vec<Execution> = calls
                .iter()
                .map(|c| Execution {
                    target: c.to,
                    value: c.value,
                    callData: c.data.clone(),
                })
                .collect();
            (execution_mode(CALLTYPE_BATCH), executions.abi_encode())
        }
    };

    let call = IERC7579Account::executeCall {
        mode,
        executionCalldata: execution_calldata.into(),
    };
    Ok(call.abi_encode().into())
}

/// Inverse of [`encode_calls`].
pub fn decode_calls(call_data: &[u8]) -> Result<Vec<Call>> {
    let decoded = IERC7579Account::executeCall::abi_decode(call_data, true)
        .map_err(|e| AccountError::decode("execute calldata", e))?;
    let payload = decoded.executionCalldata;

    match decoded.mode[0] {
        CALLTYPE_SINGLE => {
            let mut i = 0usize;
            let to = read_address(&payload, &mut i)
                .map_err(|e| AccountError::decode("single execution", e))?;
            let value = read_u256_be(&payload, &mut i)
                .map_err(|e| AccountError::decode("single execution", e))?;
            let data = Bytes::copy_from_slice(&payload[i..]);
            Ok(vec![Call { to, value, data }])
        }
        CALLTYPE_BATCH => {
            let executions = <Vec<Execution>>::abi_decode(&payload, true)
                .map_err(|e| AccountError::decode("batch execution", e))?;
            Ok(executions
                .into_iter()
                .map(|e| Call {
                    to: e.target,
                    value: e.value,
                    data: e.callData,
                })
                .collect())
        }
        other => Err(AccountError::decode(
            "execution mode",
            format!("unsupported call type {other:#04x}"),
        )),
    }
}

fn pack_pair(hi: U256, lo: U256, field: &'static str) -> Result<FixedBytes<32>> {
    pack_u128_pair(hi, lo).ok_or(AccountError::GasFieldOverflow { field })
}

/// `paymaster ∥ uint128(verificationGas) ∥ uint128(postOpGas) ∥ paymasterData`,
/// or empty when unsponsored.
pub fn paymaster_and_data(op: &UserOperation) -> Result<Bytes> {
    let Some(pm) = &op.paymaster else {
        return Ok(Bytes::new());
    };
    let gas = pack_pair(
        pm.paymaster_verification_gas_limit,
        pm.paymaster_post_op_gas_limit,
        "paymasterGasLimits",
    )?;
    let mut out = Vec::with_capacity(20 + 32 + pm.paymaster_data.len());
    out.extend_from_slice(pm.paymaster.as_slice());
    out.extend_from_slice(gas.as_slice());
    out.extend_from_slice(&pm.paymaster_data);
    Ok(out.into())
}

/// Pack an unpacked user operation into the on-chain struct layout.
pub fn pack_user_operation(op: &UserOperation) -> Result<PackedUserOperation> {
    Ok(PackedUserOperation {
        sender: op.sender,
        nonce: op.nonce,
        initCode: op.init_code(),
        callData: op.call_data.clone(),
        accountGasLimits: pack_pair(
            op.gas.verification_gas_limit,
            op.gas.call_gas_limit,
            "accountGasLimits",
        )?,
        preVerificationGas: op.gas.pre_verification_gas,
        gasFees: pack_pair(
            op.gas.max_priority_fee_per_gas,
            op.gas.max_fee_per_gas,
            "gasFees",
        )?,
        paymasterAndData: paymaster_and_data(op)?,
        signature: op.signature.clone(),
    })
}
