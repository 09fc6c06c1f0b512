//! Session Token Use Case
//!
//! Issues identity tokens at sign-in and authenticates them on every
//! request. Rejections are logged with their reason; callers only learn
//! that authentication failed.

use chrono::{DateTime, Utc};
use platform::crypto::Signer;

use crate::domain::entity::identity_token::IdentityToken;
use crate::domain::value_object::user_id::UserId;
use crate::error::SessionResult;

#[derive(Debug, Clone)]
pub struct SessionTokenCodec {
    signer: Signer,
    valid_for_secs: i64,
}

impl SessionTokenCodec {
    pub fn new(signer: Signer, valid_for_secs: i64) -> Self {
        Self {
            signer,
            valid_for_secs,
        }
    }

    /// Issue a serialized token stamped with the current time
    pub fn issue(&self, user_id: &UserId) -> SessionResult<String> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: &UserId, now: DateTime<Utc>) -> SessionResult<String> {
        IdentityToken::issue(user_id.clone(), now, &self.signer).encode()
    }

    /// Authenticated user, or `None` when the token is unusable
    pub fn parse_and_validate(&self, serialized: &str) -> Option<UserId> {
        self.parse_and_validate_at(serialized, Utc::now())
    }

    pub fn parse_and_validate_at(&self, serialized: &str, now: DateTime<Utc>) -> Option<UserId> {
        match IdentityToken::validate(serialized, &self.signer, self.valid_for_secs, now) {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                e.log();
                None
            }
        }
    }

    /// Authenticate an optional identity cookie
    pub fn authenticate(&self, cookie: Option<&str>) -> Option<UserId> {
        cookie.and_then(|c| self.parse_and_validate(c))
    }

    pub fn valid_for_secs(&self) -> i64 {
        self.valid_for_secs
    }
}
