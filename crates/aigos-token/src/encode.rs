//! Token part encoding: unpadded base64url over deterministic JSON
//! (sorted keys, no whitespace).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use aigos_core::GovernanceError;
use aigos_crypto::canonical_json;

/// Serialize and encode one token part.
pub fn encode_part<T: Serialize>(value: &T) -> Result<String, GovernanceError> {
    Ok(URL_SAFE_NO_PAD.encode(canonical_json(value)?))
}

/// Decode and deserialize one token part.
pub fn decode_part<T: DeserializeOwned>(part: &str) -> Result<T, GovernanceError> {
    let bytes = URL_SAFE_NO_PAD.decode(part).map_err(|_| GovernanceError::BadFormat {
        field: "token".to_string(),
        reason: "part is not unpadded base64url".to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| GovernanceError::BadFormat {
        field: "token".to_string(),
        reason: format!("part is not valid claim JSON: {e}"),
    })
}
