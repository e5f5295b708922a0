//! ERC-4337 / ERC-7579 compatibility shims.
//!
//! Keeps the engine ABI-aligned with the entrypoint, the account factory and
//! the modular account's `execute` surface while the signing logic lives
//! elsewhere.

pub mod constants;
pub mod interfaces;
