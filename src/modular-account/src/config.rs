use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    address::FactoryArgs,
    erc7579::constants::ENTRYPOINT_V07,
    errors::{AccountError, Result},
};

fn default_entrypoint() -> Address {
    ENTRYPOINT_V07
}

fn default_domain_name() -> String {
    "Nexus".to_string()
}

fn default_domain_version() -> String {
    "1.2.0".to_string()
}

/// Deployment parameters of one account instance.
///
/// The owner is not part of the config; it comes from the signer handed to
/// [`crate::Account::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub chain_id: u64,
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Address,
    pub factory: Address,
    #[serde(default)]
    pub index: U256,
    #[serde(default)]
    pub attesters: Vec<Address>,
    #[serde(default)]
    pub attester_threshold: u8,
    /// Known account address; skips resolution entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Account EIP-712 domain name used for nested typed-data signatures.
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    #[serde(default = "default_domain_version")]
    pub domain_version: String,
}

impl AccountConfig {
    pub fn new(chain_id: u64, factory: Address) -> Self {
        Self {
            chain_id,
            entrypoint: ENTRYPOINT_V07,
            factory,
            index: U256::ZERO,
            attesters: Vec::new(),
            attester_threshold: 0,
            address: None,
            domain_name: default_domain_name(),
            domain_version: default_domain_version(),
        }
    }

    pub fn with_index(mut self, index: U256) -> Self {
        self.index = index;
        self
    }

    pub fn with_attesters(mut self, attesters: Vec<Address>, threshold: u8) -> Self {
        self.attesters = attesters;
        self.attester_threshold = threshold;
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AccountError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.factory == Address::ZERO {
            return Err(AccountError::Config("factory must not be the zero address".into()));
        }
        if self.entrypoint == Address::ZERO {
            return Err(AccountError::Config("entrypoint must not be the zero address".into()));
        }
        if !self.attesters.is_empty() && usize::from(self.attester_threshold) > self.attesters.len() {
            return Err(AccountError::Config(format!(
                "attester threshold {} exceeds {} attesters",
                self.attester_threshold,
                self.attesters.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn factory_args(&self, owner: Address) -> FactoryArgs {
        FactoryArgs {
            owner,
            index: self.index,
            attesters: self.attesters.clone(),
            attester_threshold: self.attester_threshold,
        }
    }
}
