//! Signature envelopes wrapped around a raw module signature.
//!
//! - `Plain`: `[module] ∥ signature`.
//! - `DeploymentAware` (ERC-6492): `abi.encode(factory, factoryData, signature) ∥ magic`,
//!   only while the account has no code.
//! - `NestedTypedData` (ERC-7739): `signature ∥ appDomainSeparator ∥ contentsHash ∥
//!   contentsDescr ∥ uint16(len(contentsDescr))`.

use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_sol_types::SolValue;

use crate::{
    erc7579::constants::ERC6492_MAGIC,
    errors::{AccountError, Result},
    utils::bytes::{read_b32, read_u16_be, read_vec},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureEnvelope {
    Plain {
        module: Option<Address>,
        signature: Bytes,
    },
    DeploymentAware {
        factory: Address,
        factory_data: Bytes,
        signature: Bytes,
    },
    NestedTypedData {
        signature: Bytes,
        app_domain_separator: FixedBytes<32>,
        contents_hash: FixedBytes<32>,
        contents_descr: String,
    },
}

impl SignatureEnvelope {
    /// Serialize the envelope into the bytes a verifier expects.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            SignatureEnvelope::Plain { module, signature } => {
                let mut out = Vec::with_capacity(20 + signature.len());
                if let Some(module) = module {
                    out.extend_from_slice(module.as_slice());
                }
                out.extend_from_slice(signature);
                Ok(out.into())
            }
            SignatureEnvelope::DeploymentAware {
                factory,
                factory_data,
                signature,
            } => {
                let mut out = (*factory, factory_data.clone(), signature.clone()).abi_encode_params();
                out.extend_from_slice(ERC6492_MAGIC.as_slice());
                Ok(out.into())
            }
            SignatureEnvelope::NestedTypedData {
                signature,
                app_domain_separator,
                contents_hash,
                contents_descr,
            } => {
                let descr_len = u16::try_from(contents_descr.len()).map_err(|_| {
                    AccountError::encode(
                        "contents description",
                        format!("{} bytes exceeds uint16", contents_descr.len()),
                    )
                })?;
                let mut out =
                    Vec::with_capacity(signature.len() + 64 + contents_descr.len() + 2);
                out.extend_from_slice(signature);
                out.extend_from_slice(app_domain_separator.as_slice());
                out.extend_from_slice(contents_hash.as_slice());
                out.extend_from_slice(contents_descr.as_bytes());
                out.extend_from_slice(&descr_len.to_be_bytes());
                Ok(out.into())
            }
        }
    }

    /// `Plain` while deployed, `DeploymentAware` otherwise.
    pub fn for_deployment_state(
        deployed: bool,
        factory: Address,
        factory_data: Bytes,
        signature: Bytes,
    ) -> Self {
        if deployed {
            SignatureEnvelope::Plain {
                module: None,
                signature,
            }
        } else {
            SignatureEnvelope::DeploymentAware {
                factory,
                factory_data,
                signature,
            }
        }
    }

    /// Whether `signature` carries the ERC-6492 suffix.
    pub fn is_deployment_aware(signature: &[u8]) -> bool {
        signature.len() >= 32 && signature[signature.len() - 32..] == ERC6492_MAGIC[..]
    }

    /// Parse an ERC-6492 wrapper back into its parts.
    pub fn decode_deployment_aware(signature: &[u8]) -> Result<Self> {
        if !Self::is_deployment_aware(signature) {
            return Err(AccountError::decode("ERC-6492 signature", "missing magic suffix"));
        }
        let body = &signature[..signature.len() - 32];
        let (factory, factory_data, inner) = <(Address, Bytes, Bytes)>::abi_decode_params(body, true)
            .map_err(|e| AccountError::decode("ERC-6492 signature", e))?;
        Ok(SignatureEnvelope::DeploymentAware {
            factory,
            factory_data,
            signature: inner,
        })
    }

    /// Parse an ERC-7739 nested signature back into its parts.
    pub fn decode_nested(signature: &[u8]) -> Result<Self> {
        let n = signature.len();
        if n < 2 + 64 {
            return Err(AccountError::decode("nested typed-data signature", "too short"));
        }
        let mut tail = n - 2;
        let descr_len = read_u16_be(signature, &mut tail)
            .map_err(|e| AccountError::decode("nested typed-data signature", e))?
            as usize;
        let Some(sig_end) = (n - 2)
            .checked_sub(descr_len)
            .and_then(|descr_start| descr_start.checked_sub(64))
        else {
            return Err(AccountError::decode("nested typed-data signature", "bad length suffix"));
        };

        let truncated = |e| AccountError::decode("nested typed-data signature", e);
        let mut i = 0;
        let inner = read_vec(signature, &mut i, sig_end).map_err(truncated)?;
        let app_domain_separator = read_b32(signature, &mut i).map_err(truncated)?;
        let contents_hash = read_b32(signature, &mut i).map_err(truncated)?;
        let descr = read_vec(signature, &mut i, descr_len).map_err(truncated)?;
        let contents_descr =
            String::from_utf8(descr).map_err(|e| AccountError::decode("contents description", e))?;
        Ok(SignatureEnvelope::NestedTypedData {
            signature: inner.into(),
            app_domain_separator,
            contents_hash,
            contents_descr,
        })
    }
}
