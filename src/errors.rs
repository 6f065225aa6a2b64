// src/errors.rs

//! Crate-wide error aliases.
//!
//! Thin wrapper around `anyhow`; a single place to introduce more structured
//! error types later if a caller ever needs to match on failure kinds.

pub use anyhow::{Error, Result};
