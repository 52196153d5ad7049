//! # LPRS Common Library
//!
//! Shared code for the license-plate recognition store:
//! - Error type used by every layer
//! - Configuration loading and root folder resolution
//! - SQLite initialization, schema migrations and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
