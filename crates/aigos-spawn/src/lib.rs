//! aigos-spawn
//!
//! Capability-decay enforcement for the spawn tree: every child agent's
//! capability set is a provable subset of its parent's, derived under one
//! of three declared modes and validated against escalation before any new
//! identity is minted.

pub mod decay;
pub mod domain;
pub mod enforcer;

pub use decay::apply_decay;
pub use domain::domain_covered;
pub use enforcer::{EnforcerConfig, SpawnEnforcer};
