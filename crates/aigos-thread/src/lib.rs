//! aigos-thread
//!
//! The Golden Thread engine: build the ticket→approval→hash binding,
//! verify it against a presented hash, and extract binding components from
//! asset-card data. The canonical hashing itself lives in aigos-crypto;
//! this crate owns the chain-of-custody rules around it.

pub mod engine;

pub use engine::{build, ensure_bound, extract, thread_hash, verify};
