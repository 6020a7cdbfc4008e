//! aigos-cert
//!
//! Turns a verification report into a signed CGA certificate and its
//! compact embedding form, applying per-level issuer and validity rules.

pub mod generator;

pub use generator::{CaIdentity, CaResolver, CertificateGenerator, GeneratorConfig, StaticCaResolver};
