//! Threshold multi-owner validator.
//!
//! The module aggregates signatures; it does not orchestrate collection from
//! remote parties. Callers gather individual owner signatures and hand them to
//! [`MultisigValidator::aggregate`]. Owners whose signers are held locally can
//! be signed for in one step through [`MultisigValidator::sign_hash`].

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolValue;

use modular_account_types::AccountSigner;

use crate::{
    erc7579::constants::ECDSA_SIGNATURE_LEN,
    errors::{AccountError, Result},
    modules::dummy_ecdsa_signature,
    utils::crypto::normalize_v,
};

#[derive(Clone)]
pub struct MultisigValidator {
    /// Registration order; aggregated signatures follow it.
    owners: Vec<Address>,
    threshold: usize,
    local_signers: Vec<Arc<dyn AccountSigner>>,
}

impl MultisigValidator {
    /// `threshold` must be between 1 and the number of owners; owners must be unique.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self> {
        if threshold == 0 || threshold > owners.len() {
            return Err(AccountError::Config(format!(
                "threshold {threshold} invalid for {} owners",
                owners.len()
            )));
        }
        for (i, owner) in owners.iter().enumerate() {
            if owners[..i].contains(owner) {
                return Err(AccountError::Config(format!("duplicate owner {owner}")));
            }
        }
        Ok(Self {
            owners,
            threshold,
            local_signers: Vec::new(),
        })
    }

    /// Build from locally held signers; every signer becomes an owner.
    pub fn from_signers(signers: Vec<Arc<dyn AccountSigner>>, threshold: usize) -> Result<Self> {
        let owners = signers.iter().map(|s| s.address()).collect();
        let mut validator = Self::new(owners, threshold)?;
        validator.local_signers = signers;
        Ok(validator)
    }

    /// Attach a local signer for one of the owners.
    pub fn with_signer(mut self, signer: Arc<dyn AccountSigner>) -> Result<Self> {
        let addr = signer.address();
        if !self.owners.contains(&addr) {
            return Err(AccountError::Config(format!("{addr} is not a registered owner")));
        }
        self.local_signers.push(signer);
        Ok(self)
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// `abi.encode(uint256 threshold, address[] owners)`.
    pub fn init_data(&self) -> Bytes {
        (U256::from(self.threshold), self.owners.clone())
            .abi_encode_params()
            .into()
    }

    /// `threshold` dummy signatures back to back.
    pub fn stub_signature(&self) -> Bytes {
        let one = dummy_ecdsa_signature();
        one.iter()
            .copied()
            .cycle()
            .take(one.len() * self.threshold)
            .collect::<Vec<u8>>()
            .into()
    }

    /// Concatenate owner signatures in registration order.
    ///
    /// Requires at least `threshold` distinct owners; every signature must be
    /// 65 bytes. Extra signatures beyond the threshold are kept.
    pub fn aggregate(&self, module: Address, signatures: &[(Address, Bytes)]) -> Result<Bytes> {
        let mut slots: Vec<Option<&Bytes>> = vec![None; self.owners.len()];
        for (signer, sig) in signatures {
            let idx = self
                .owners
                .iter()
                .position(|o| o == signer)
                .ok_or(AccountError::UnknownOwner { module, signer: *signer })?;
            if sig.len() != ECDSA_SIGNATURE_LEN {
                return Err(AccountError::decode(
                    "owner signature",
                    format!("{} bytes from {signer}", sig.len()),
                ));
            }
            slots[idx] = Some(sig);
        }

        let provided = slots.iter().filter(|s| s.is_some()).count();
        if provided < self.threshold {
            return Err(AccountError::InsufficientSignatures {
                module,
                threshold: self.threshold,
                provided,
            });
        }

        let mut out = Vec::with_capacity(provided * ECDSA_SIGNATURE_LEN);
        for sig in slots.into_iter().flatten() {
            out.extend_from_slice(sig);
        }
        Ok(out.into())
    }

    pub async fn sign_hash(&self, module: Address, hash: FixedBytes<32>) -> Result<Bytes> {
        let mut collected = Vec::with_capacity(self.local_signers.len());
        for signer in &self.local_signers {
            let sig = signer.sign_message(hash.as_slice()).await?;
            collected.push((signer.address(), normalize_v(sig)));
        }
        self.aggregate(module, &collected)
    }

    pub async fn sign_message(&self, module: Address, message: &[u8]) -> Result<Bytes> {
        let mut collected = Vec::with_capacity(self.local_signers.len());
        for signer in &self.local_signers {
            let sig = signer.sign_message(message).await?;
            collected.push((signer.address(), normalize_v(sig)));
        }
        self.aggregate(module, &collected)
    }

    pub async fn sign_typed_data(
        &self,
        module: Address,
        domain_separator: FixedBytes<32>,
        struct_hash: FixedBytes<32>,
    ) -> Result<Bytes> {
        let mut collected = Vec::with_capacity(self.local_signers.len());
        for signer in &self.local_signers {
            let sig = signer.sign_typed_data(domain_separator, struct_hash).await?;
            collected.push((signer.address(), normalize_v(sig)));
        }
        self.aggregate(module, &collected)
    }
}

impl std::fmt::Debug for MultisigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultisigValidator")
            .field("owners", &self.owners)
            .field("threshold", &self.threshold)
            .field("local_signers", &self.local_signers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const MODULE: Address = address!("7777777777777777777777777777777777777777");

    fn owners() -> Vec<Address> {
        vec![Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)]
    }

    #[test]
    fn rejects_bad_threshold_and_duplicates() {
        assert!(MultisigValidator::new(owners(), 0).is_err());
        assert!(MultisigValidator::new(owners(), 4).is_err());
        let dup = vec![Address::repeat_byte(1), Address::repeat_byte(1)];
        assert!(MultisigValidator::new(dup, 1).is_err());
    }

    #[test]
    fn aggregate_follows_registration_order() {
        let ms = MultisigValidator::new(owners(), 2).unwrap();
        let s1 = Bytes::from(vec![0x11; 65]);
        let s2 = Bytes::from(vec![0x22; 65]);

        let in_order = ms
            .aggregate(MODULE, &[(owners()[0], s1.clone()), (owners()[1], s2.clone())])
            .unwrap();
        let mut expected = s1.to_vec();
        expected.extend_from_slice(&s2);
        assert_eq!(in_order.to_vec(), expected);

        let reversed = ms
            .aggregate(MODULE, &[(owners()[1], s2), (owners()[0], s1)])
            .unwrap();
        assert_eq!(reversed, in_order);
    }

    #[test]
    fn aggregate_enforces_threshold_and_membership() {
        let ms = MultisigValidator::new(owners(), 2).unwrap();
        let sig = Bytes::from(vec![0x11; 65]);
        assert!(matches!(
            ms.aggregate(MODULE, &[(owners()[0], sig.clone())]),
            Err(AccountError::InsufficientSignatures { threshold: 2, provided: 1, .. })
        ));
        assert!(matches!(
            ms.aggregate(MODULE, &[(owners()[0], sig.clone()), (owners()[0], sig.clone())]),
            Err(AccountError::InsufficientSignatures { provided: 1, .. })
        ));
        assert!(matches!(
            ms.aggregate(MODULE, &[(Address::repeat_byte(9), sig)]),
            Err(AccountError::UnknownOwner { .. })
        ));
        assert!(ms
            .aggregate(MODULE, &[(owners()[0], Bytes::from(vec![0; 64]))])
            .is_err());
    }

    #[test]
    fn stub_has_threshold_signatures() {
        let ms = MultisigValidator::new(owners(), 3).unwrap();
        let stub = ms.stub_signature();
        assert_eq!(stub.len(), 3 * 65);
        assert_eq!(&stub[..65], &stub[65..130]);
    }

    #[test]
    fn init_data_encodes_threshold_and_owners() {
        let ms = MultisigValidator::new(owners(), 2).unwrap();
        let (threshold, decoded) =
            <(U256, Vec<Address>)>::abi_decode_params(&ms.init_data(), true).unwrap();
        assert_eq!(threshold, U256::from(2u64));
        assert_eq!(decoded, owners());
    }
}
