//! aigos-crypto
//!
//! The cryptographic floor of the protocol: deterministic canonicalization
//! and SHA-256 hashing of small structured records, ES256 (ECDSA P-256 /
//! SHA-256) signing and verification, and the trusted-CA key ring.
//!
//! The canonical→hash step is the only cryptographic invariant the whole
//! system leans on, so it lives here in one place and is tested against a
//! published vector; aigos-thread, aigos-cert, and aigos-trust all reuse it.

pub mod canonical;
pub mod es256;
pub mod keys;

pub use canonical::{canonical, canonical_json, constant_time_eq, hash, is_canonical_hash, Value};
pub use es256::{Es256KeyPair, Es256Verifier, SignatureError};
pub use keys::CaKeyRing;
