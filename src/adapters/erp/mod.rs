//! ERP adapter
//!
//! Client and wire models for the ERP bridge service the sync reads its
//! source data from. All endpoints are POST-with-JSON and scoped to a fixed
//! database name; the client maps responses into domain models and
//! normalizes currency markers, stock balances, and whitespace on the way
//! in.

pub mod client;
pub mod models;

pub use client::ErpClient;
