//! Cryptographic helpers: ECDSA recovery, address derivation and
//! recovery-id normalization.

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::erc7579::constants::ECDSA_SIGNATURE_LEN;

/// Ethereum address of a secp256k1 public key: low 20 bytes of
/// `keccak256(x ∥ y)`.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Force the recovery byte into `{27, 28}`.
///
/// Signers that return `v ∈ {0, 1}` are shifted by 27; a `v` already at 27 or
/// 28 is left alone. Empty input is returned unchanged.
pub fn normalize_v(signature: Bytes) -> Bytes {
    let mut sig = signature.to_vec();
    if let Some(v) = sig.last_mut() {
        if *v != 27 && *v != 28 {
            *v = v.wrapping_add(27);
        }
    }
    sig.into()
}

/// Recover the signer of a 32-byte digest from an `r ∥ s ∥ v` signature.
///
/// Accepts `v` in `{0, 1, 27, 28}`. If `v` is anything else, both parities are
/// tried and the first successful recovery wins.
pub fn recover_address(digest: FixedBytes<32>, sig: &[u8]) -> Option<Address> {
    if sig.len() != ECDSA_SIGNATURE_LEN {
        return None;
    }
    let signature = Signature::from_slice(&sig[..64]).ok()?;

    let v_raw = sig[64];
    let candidates: &[u8] = match v_raw {
        27 | 28 => &[v_raw - 27],
        0 | 1 => &[v_raw],
        // If v isn't usable, try both.
        _ => &[0, 1],
    };

    for v in candidates {
        let Some(recovery_id) = RecoveryId::from_byte(*v) else {
            continue;
        };
        if let Ok(key) = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id) {
            return Some(address_from_verifying_key(&key));
        }
    }
    None
}
