use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// One call the account should execute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl Call {
    pub fn new(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
        }
    }

    /// Plain value transfer with empty calldata.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self::new(to, value, Bytes::new())
    }
}
