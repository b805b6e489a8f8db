//! Configuration management for Shopsync.
//!
//! Configuration is environment-based: [`AppConfig::from_env`] reads the
//! process environment (typically populated by dotenvy in `main`), applies
//! defaults, and validates the result. [`AppConfig::from_vars`] accepts any
//! lookup function and is what tests use.

pub mod loader;
pub mod schema;

pub use schema::{AppConfig, ErpConfig, NotifyConfig, NotifyOutput, ShopConfig, SyncConfig};
