//! Sign Out Use Case
//!
//! Drops every session cookie and, for an authenticated user, retires the
//! container: invalidate the registry entry, then back it up and remove it.

use std::sync::Arc;

use platform::cookie::CookieUpdate;
use platform::crypto::Signer;

use crate::application::config::SessionConfig;
use crate::application::coordinator::affinity_clear_updates;
use crate::application::session_token::SessionTokenCodec;
use crate::domain::cluster::JobDispatcher;
use crate::domain::entity::live_session::LiveSessionDescriptor;
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::session_name::SessionName;
use crate::error::SessionResult;

/// Sign out output
#[derive(Debug)]
pub struct SignOutOutput {
    pub cookies: Vec<CookieUpdate>,
    /// A container was handed off for backup and cleanup
    pub cleaned_up: bool,
}

/// Sign out use case
pub struct SignOutUseCase<R, J>
where
    R: ContainerRegistry,
    J: JobDispatcher,
{
    registry: Arc<R>,
    dispatcher: Arc<J>,
    config: Arc<SessionConfig>,
    signer: Signer,
}

impl<R, J> SignOutUseCase<R, J>
where
    R: ContainerRegistry,
    J: JobDispatcher,
{
    pub fn new(
        registry: Arc<R>,
        dispatcher: Arc<J>,
        config: Arc<SessionConfig>,
        signer: Signer,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            config,
            signer,
        }
    }

    /// Cookies are always cleared; container cleanup failures are logged
    pub async fn execute(&self, identity: Option<&str>) -> SignOutOutput {
        let mut cookies = vec![CookieUpdate::clear(self.config.identity_cookie_name.as_str())];
        cookies.extend(LiveSessionDescriptor::clear_cookie_updates());
        cookies.extend(affinity_clear_updates(&self.config));

        let codec = SessionTokenCodec::new(self.signer.clone(), self.config.auth_valid_secs);
        let cleaned_up = match codec.authenticate(identity) {
            Some(user_id) => {
                let name = SessionName::derive(&user_id);
                match self.retire(&name).await {
                    Ok(cleaned_up) => {
                        tracing::info!(user_id = %user_id, session_name = %name, "User signed out");
                        cleaned_up
                    }
                    Err(e) => {
                        e.log();
                        false
                    }
                }
            }
            None => false,
        };

        SignOutOutput {
            cookies,
            cleaned_up,
        }
    }

    async fn retire(&self, name: &SessionName) -> SessionResult<bool> {
        let Some(record) = self.registry.get_by_derived_name(name).await? else {
            return Ok(false);
        };
        self.registry.invalidate(name).await?;
        self.dispatcher.backup_and_cleanup(record.resource_id()).await?;
        Ok(true)
    }
}
