//! # Primer Common Library
//!
//! Shared code for the primer initialization pipeline:
//! - Error type used across crates
//! - Configuration loading (TOML + environment + CLI priority)
//! - Database bootstrap (pool, pragmas, schema)
//! - Pipeline event bus
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
