//! Minimal big-endian parsing and packing helpers.
//!
//! Used to unpack execution calldata and signature envelopes, and to pack
//! 128-bit gas pairs into a single word.

use alloy_primitives::{Address, FixedBytes, U256};
use thiserror::Error;

/// Input ended before the requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("input truncated")]
pub struct Truncated;

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Vec<u8>, Truncated> {
    if bytes.len() < *i + len {
        return Err(Truncated);
    }
    let out = bytes[*i..*i + len].to_vec();
    *i += len;
    Ok(out)
}

pub fn read_u16_be(bytes: &[u8], i: &mut usize) -> Result<u16, Truncated> {
    if bytes.len() < *i + 2 {
        return Err(Truncated);
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*i..*i + 2]);
    *i += 2;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, Truncated> {
    if bytes.len() < *i + 32 {
        return Err(Truncated);
    }
    let out = U256::from_be_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(out)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Result<FixedBytes<32>, Truncated> {
    if bytes.len() < *i + 32 {
        return Err(Truncated);
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[*i..*i + 32]);
    *i += 32;
    Ok(FixedBytes(buf))
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, Truncated> {
    if bytes.len() < *i + 20 {
        return Err(Truncated);
    }
    let addr = Address::from_slice(&bytes[*i..*i + 20]);
    *i += 20;
    Ok(addr)
}

/// Pack two values that must each fit in 128 bits into `hi ∥ lo`.
///
/// Returns `None` when either value overflows.
pub fn pack_u128_pair(hi: U256, lo: U256) -> Option<FixedBytes<32>> {
    let hi: u128 = hi.try_into().ok()?;
    let lo: u128 = lo.try_into().ok()?;
    let mut buf = [0u8; 32];
    buf[..16].copy_from_slice(&hi.to_be_bytes());
    buf[16..].copy_from_slice(&lo.to_be_bytes());
    Some(FixedBytes(buf))
}
