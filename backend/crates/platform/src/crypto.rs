//! Cryptographic Utilities
//!
//! Hashing, encoding and the keyed [`Signer`] every signed cookie goes
//! through.

use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Separator placed between fields of a multi-part signed payload
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Encode bytes as URL-safe base64 without padding (cookie-safe)
pub fn to_base64_url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Error when building a signer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("signing key is not configured")]
    MissingKey,
}

/// Sign `message` with `key`, returning a comparable signature string
pub fn sign(message: &[u8], key: &[u8]) -> Result<String, SignerError> {
    if key.is_empty() {
        return Err(SignerError::MissingKey);
    }
    Ok(to_base64_url(&hmac_sha256(key, message)))
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct SigningKey(Vec<u8>);

/// Keyed message signer
///
/// Holds the process-wide secret; cloning shares the key. The key is wiped on
/// drop and never printed.
#[derive(Clone)]
pub struct Signer {
    key: Arc<SigningKey>,
}

impl Signer {
    /// Build a signer, failing when the key is empty
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, SignerError> {
        let key = key.into();
        if key.is_empty() {
            return Err(SignerError::MissingKey);
        }
        Ok(Self {
            key: Arc::new(SigningKey(key)),
        })
    }

    /// Signature over a single message
    pub fn sign(&self, message: &str) -> String {
        to_base64_url(&hmac_sha256(&self.key.0, message.as_bytes()))
    }

    /// Signature over several fields joined by [`FIELD_SEPARATOR`]
    pub fn sign_parts(&self, parts: &[&str]) -> String {
        let mut payload = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                payload.push(FIELD_SEPARATOR);
            }
            payload.push_str(part);
        }
        self.sign(&payload)
    }

    /// Check a claimed signature for `message`
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        constant_time_eq(self.sign(message).as_bytes(), signature.as_bytes())
    }

    /// Check a claimed signature for a multi-field payload
    pub fn verify_parts(&self, parts: &[&str], signature: &str) -> bool {
        constant_time_eq(self.sign_parts(parts).as_bytes(), signature.as_bytes())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("key", &"<redacted>").finish()
    }
}
