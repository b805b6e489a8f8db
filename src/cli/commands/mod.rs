//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod sync;
pub mod wipe;
