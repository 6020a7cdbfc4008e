//! The trusted-CA key ring: key id → ES256 verification key.
//!
//! Loaded once and treated as immutable; hot-swaps replace the whole map.
//! Remote key resolution (JWKS) is a pluggable collaborator owned by the
//! token verifier — this ring is the resident in-memory case.

use std::collections::HashMap;

use crate::es256::{Es256Verifier, SignatureError};

/// Immutable map of trusted CA key ids to their verification keys.
#[derive(Clone, Debug, Default)]
pub struct CaKeyRing {
    keys: HashMap<String, Es256Verifier>,
}

impl CaKeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring from `(key_id, SEC1 public key bytes)` pairs.
    pub fn from_public_keys<I>(entries: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut keys = HashMap::new();
        for (kid, bytes) in entries {
            keys.insert(kid, Es256Verifier::from_public_key_bytes(&bytes)?);
        }
        Ok(Self { keys })
    }

    /// Builder-style insertion, used when assembling test fixtures and
    /// bootstrap configurations.
    pub fn with_key(mut self, kid: impl Into<String>, verifier: Es256Verifier) -> Self {
        self.keys.insert(kid.into(), verifier);
        self
    }

    pub fn get(&self, kid: &str) -> Option<&Es256Verifier> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
