//! aigos-token
//!
//! Mints and verifies the three-part bearer token that carries an agent's
//! identity, CGA attestation, and capability claims between agents. Minting
//! and verification are pure over their inputs — nothing is persisted, and
//! revocation/key-resolution collaborators are injected.

pub mod encode;
pub mod mint;
pub mod verify;

pub use encode::{decode_part, encode_part};
pub use mint::{AgentBinding, MintedToken, TokenMinter};
pub use verify::{
    extract, KeyResolver, RevocationOracle, RevocationStatus, StaticRevocationList, TokenStatus,
    TokenVerification, TokenVerifier,
};
