//! EIP-4337 v0.7 user operation (unpacked RPC form).

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Gas and fee fields of an intent, as supplied by the caller or an estimator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSettings {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Paymaster sponsorship fields; opaque to the engine apart from packing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterFields {
    pub paymaster: Address,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    #[serde(default)]
    pub paymaster_data: Bytes,
}

/// User operation as sent to a v0.7 bundler.
///
/// `signature` is empty until the account signs; it never takes part in the
/// operation hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    #[serde(flatten)]
    pub gas: GasSettings,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<PaymasterFields>,
    #[serde(default)]
    pub signature: Bytes,
}

impl UserOperation {
    /// `factory ∥ factoryData`, or empty when the account already exists.
    pub fn init_code(&self) -> Bytes {
        match self.factory {
            Some(factory) => {
                let data = self.factory_data.clone().unwrap_or_default();
                let mut out = Vec::with_capacity(20 + data.len());
                out.extend_from_slice(factory.as_slice());
                out.extend_from_slice(&data);
                out.into()
            }
            None => Bytes::new(),
        }
    }

    /// Copy with the signature field cleared.
    pub fn unsigned(&self) -> Self {
        Self {
            signature: Bytes::new(),
            ..self.clone()
        }
    }
}
