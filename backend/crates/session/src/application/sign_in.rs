//! Sign In Use Case
//!
//! Development-only sign-in: trusts the supplied user id and issues an
//! identity token for it. Real deployments authenticate upstream and only
//! ever reach the token issuer through their own login flow.

use std::sync::Arc;

use platform::cookie::CookieUpdate;
use platform::crypto::Signer;

use crate::application::config::SessionConfig;
use crate::application::session_token::SessionTokenCodec;
use crate::domain::entity::live_session::LiveSessionDescriptor;
use crate::domain::value_object::{session_name::SessionName, user_id::UserId};
use crate::error::{SessionError, SessionResult};

/// Sign in input
pub struct SignInInput {
    pub user_id: String,
}

/// Sign in output
pub struct SignInOutput {
    pub user_id: UserId,
    pub session_name: SessionName,
    /// Identity cookie first, then any stale descriptor is dropped
    pub cookies: Vec<CookieUpdate>,
}

/// Sign in use case
pub struct SignInUseCase {
    config: Arc<SessionConfig>,
    signer: Signer,
}

impl SignInUseCase {
    pub fn new(config: Arc<SessionConfig>, signer: Signer) -> Self {
        Self { config, signer }
    }

    pub fn execute(&self, input: SignInInput) -> SessionResult<SignInOutput> {
        if !self.config.dev_sign_in {
            return Err(SessionError::SignInDisabled);
        }

        let user_id = UserId::new(input.user_id)?;
        let codec = SessionTokenCodec::new(self.signer.clone(), self.config.auth_valid_secs);
        let token = codec.issue(&user_id)?;

        let mut cookies = vec![CookieUpdate::set(
            self.config.identity_cookie_name.as_str(),
            token,
            Some(self.config.auth_valid_secs),
        )];
        cookies.extend(LiveSessionDescriptor::clear_cookie_updates());

        let session_name = SessionName::derive(&user_id);
        tracing::info!(user_id = %user_id, session_name = %session_name, "User signed in");

        Ok(SignInOutput {
            user_id,
            session_name,
            cookies,
        })
    }
}
