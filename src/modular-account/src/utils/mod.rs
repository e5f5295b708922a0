//! Shared utilities for the account engine.
//!
//! Small deterministic helpers; anything touching the network lives in the
//! resolver and account modules.

pub mod bytes;
pub mod crypto;
pub mod typed_data;
