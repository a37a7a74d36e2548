//! Shared foundations for the anisong database tools
//!
//! Holds the pieces every asdb binary needs: the common error type, TOML
//! configuration, database pool initialization, and the normalized schema.

pub mod config;
pub mod db;
pub mod error;

pub use crate::error::{Error, Result};
