//! Protocol constants mirrored from the entrypoint and ERC-7579 accounts.

use alloy_primitives::{address, b256, Address, B256, U256};

/// Canonical ERC-4337 v0.7 entrypoint.
pub const ENTRYPOINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// ERC-7579 validator module type ID.
pub const MODULE_TYPE_VALIDATOR: U256 = U256::from_limbs([1, 0, 0, 0]);

// ERC-7579 execution mode call types (first byte of the mode word).
pub const CALLTYPE_SINGLE: u8 = 0x00;
pub const CALLTYPE_BATCH: u8 = 0x01;

/// ERC-6492 detection suffix appended to counterfactual signatures.
pub const ERC6492_MAGIC: B256 =
    b256!("6492649264926492649264926492649264926492649264926492649264926492");

/// ERC-1271 `isValidSignature` success value.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Length of an ECDSA `r ∥ s ∥ v` signature.
pub const ECDSA_SIGNATURE_LEN: usize = 65;
