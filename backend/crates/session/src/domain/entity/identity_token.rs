//! Identity Token Entity
//!
//! Long-lived signed proof that a user authenticated. Issued at sign-in and
//! never mutated, only reissued.
//!
//! Wire format: standard base64 of `{"u": user_id, "t": issued_at, "x": sig}`
//! where `t` is RFC 3339 with an explicit offset and `sig` covers `u ‖ t`.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::Signer;
use serde::{Deserialize, Serialize};

use crate::domain::value_object::user_id::UserId;
use crate::error::{SessionError, SessionResult};

#[derive(Debug, Serialize, Deserialize)]
struct TokenWire {
    u: String,
    t: String,
    x: String,
}

#[derive(Debug, Clone)]
pub struct IdentityToken {
    user_id: UserId,
    issued_at: DateTime<Utc>,
    /// Timestamp exactly as signed, so verification never re-formats
    issued_at_wire: String,
    signature: String,
}

impl IdentityToken {
    /// Stamp and sign a new token
    pub fn issue(user_id: UserId, now: DateTime<Utc>, signer: &Signer) -> Self {
        let issued_at_wire = now.to_rfc3339();
        let signature = signer.sign_parts(&[user_id.as_str(), &issued_at_wire]);
        Self {
            user_id,
            issued_at: now,
            issued_at_wire,
            signature,
        }
    }

    /// Serialize for the identity cookie
    pub fn encode(&self) -> SessionResult<String> {
        let wire = TokenWire {
            u: self.user_id.as_str().to_string(),
            t: self.issued_at_wire.clone(),
            x: self.signature.clone(),
        };
        let json = serde_json::to_vec(&wire)
            .map_err(|e| SessionError::Internal(format!("token encoding failed: {e}")))?;
        Ok(platform::crypto::to_base64(&json))
    }

    /// Parse the wire form without checking the signature
    pub fn decode(serialized: &str) -> SessionResult<Self> {
        let bytes = platform::crypto::from_base64(serialized.trim())
            .map_err(|e| SessionError::MalformedInput(format!("token base64: {e}")))?;
        let wire: TokenWire = serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::MalformedInput(format!("token json: {e}")))?;

        let user_id = UserId::new(wire.u)?;
        // Offset-carrying timestamps only; normalize to UTC before any age math
        let issued_at = DateTime::parse_from_rfc3339(&wire.t)
            .map_err(|e| SessionError::MalformedInput(format!("token timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            user_id,
            issued_at,
            issued_at_wire: wire.t,
            signature: wire.x,
        })
    }

    pub fn verify_signature(&self, signer: &Signer) -> SessionResult<()> {
        if signer.verify_parts(&[self.user_id.as_str(), &self.issued_at_wire], &self.signature) {
            Ok(())
        } else {
            Err(SessionError::SignatureMismatch)
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.issued_at
    }

    /// Rejects tokens strictly older than `valid_for_secs`. A window that
    /// does not fit in a [`Duration`] rejects everything.
    pub fn check_fresh(&self, now: DateTime<Utc>, valid_for_secs: i64) -> SessionResult<()> {
        let window = Duration::try_seconds(valid_for_secs).ok_or_else(|| {
            SessionError::Config(format!("token window of {valid_for_secs}s out of range"))
        })?;
        if self.age(now) > window {
            Err(SessionError::Expired)
        } else {
            Ok(())
        }
    }

    /// Decode, verify and check freshness
    pub fn validate(
        serialized: &str,
        signer: &Signer,
        valid_for_secs: i64,
        now: DateTime<Utc>,
    ) -> SessionResult<UserId> {
        let token = Self::decode(serialized)?;
        token.verify_signature(signer)?;
        token.check_fresh(now, valid_for_secs)?;
        Ok(token.user_id)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}
