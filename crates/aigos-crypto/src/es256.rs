//! ES256 (ECDSA over P-256 with SHA-256) signing and verification.
//!
//! Signatures are raw 64-byte `r||s`, carried base64url-encoded without
//! padding in certificates and tokens. There are no placeholder signatures
//! anywhere in the protocol: signing requires key material, verification a
//! resolvable public key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key material")]
    InvalidKey,
    #[error("invalid base64url encoding")]
    InvalidEncoding,
}

/// An ES256 signing key with its key id.
///
/// The inner scalar is wiped on drop by the underlying curve crate; raw
/// secret bytes passed in are wiped after import.
pub struct Es256KeyPair {
    pub key_id: String,
    signing_key: SigningKey,
}

impl Es256KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Import a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(key_id: impl Into<String>, bytes: &[u8]) -> Result<Self, SignatureError> {
        let secret = Zeroizing::new(bytes.to_vec());
        let signing_key =
            SigningKey::from_slice(&secret).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { key_id: key_id.into(), signing_key })
    }

    /// Sign `message`, returning the raw 64-byte `r||s` signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Sign `message`, returning the base64url (unpadded) signature.
    pub fn sign_b64(&self, message: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(self.sign(message))
    }

    pub fn verifier(&self) -> Es256Verifier {
        Es256Verifier { key: *self.signing_key.verifying_key() }
    }

    /// SEC1-compressed public key bytes (33 bytes).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

impl std::fmt::Debug for Es256KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Es256KeyPair {{ key_id: {} }}", self.key_id)
    }
}

/// An ES256 verification key.
#[derive(Clone, Debug)]
pub struct Es256Verifier {
    key: VerifyingKey,
}

impl Es256Verifier {
    /// Import from SEC1 public-key bytes (compressed or uncompressed).
    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { key })
    }

    /// Verify a raw 64-byte `r||s` signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let signature =
            Signature::from_slice(signature).map_err(|_| SignatureError::InvalidSignature)?;
        self.key
            .verify(message, &signature)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Verify a base64url (unpadded) signature over `message`.
    pub fn verify_b64(&self, message: &[u8], signature_b64: &str) -> Result<(), SignatureError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SignatureError::InvalidEncoding)?;
        self.verify(message, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let kp = Es256KeyPair::generate("test-key-1");
        let message = b"bound to a signed business authorization";

        let sig = kp.sign(message);
        assert!(kp.verifier().verify(message, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = Es256KeyPair::generate("test-key-1");
        let sig = kp.sign(b"original");
        assert!(kp.verifier().verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let kp = Es256KeyPair::generate("a");
        let other = Es256KeyPair::generate("b");
        let sig = kp.sign_b64(b"message");
        assert!(other.verifier().verify_b64(b"message", &sig).is_err());
    }

    #[test]
    fn public_key_bytes_round_trip() {
        let kp = Es256KeyPair::generate("ring-key");
        let verifier = Es256Verifier::from_public_key_bytes(&kp.public_key_bytes()).unwrap();
        let sig = kp.sign(b"payload");
        assert!(verifier.verify(b"payload", &sig).is_ok());
    }
}
