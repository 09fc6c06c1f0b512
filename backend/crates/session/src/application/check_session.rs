//! Check Live Session Use Case
//!
//! Decides whether the descriptor a client presents still describes a real
//! container: the signature must match and the registry must hold a live
//! container under that name with the same endpoint markers. A descriptor
//! for an exited container is never accepted.

use std::sync::Arc;

use platform::crypto::Signer;

use crate::domain::entity::container::{ContainerRecord, ContainerStatus};
use crate::domain::entity::live_session::{DescriptorFields, LiveSessionDescriptor};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::session_name::SessionName;
use crate::error::{SessionError, SessionResult};

/// Outcome of a successful descriptor check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveSession {
    /// Container is serving on the claimed endpoints
    Ready(LiveSessionDescriptor),
    /// Loading descriptor; the container is still starting
    Pending(LiveSessionDescriptor),
    /// Loading descriptor whose container has since come up; carries the
    /// reissued ready descriptor
    Promoted(LiveSessionDescriptor),
}

impl LiveSession {
    pub fn descriptor(&self) -> &LiveSessionDescriptor {
        match self {
            LiveSession::Ready(d) | LiveSession::Pending(d) | LiveSession::Promoted(d) => d,
        }
    }
}

/// Check Live Session Use Case
pub struct CheckLiveSessionUseCase<R>
where
    R: ContainerRegistry,
{
    registry: Arc<R>,
    signer: Signer,
}

impl<R> CheckLiveSessionUseCase<R>
where
    R: ContainerRegistry,
{
    pub fn new(registry: Arc<R>, signer: Signer) -> Self {
        Self { registry, signer }
    }

    /// Validate a descriptor against signature and registry
    pub async fn validate(&self, fields: &DescriptorFields) -> SessionResult<LiveSession> {
        self.validate_inner(fields, None).await
    }

    /// Same as [`validate`](Self::validate), but the descriptor must also
    /// name `owner`'s session
    pub async fn validate_owned(
        &self,
        fields: &DescriptorFields,
        owner: &SessionName,
    ) -> SessionResult<LiveSession> {
        self.validate_inner(fields, Some(owner)).await
    }

    async fn validate_inner(
        &self,
        fields: &DescriptorFields,
        owner: Option<&SessionName>,
    ) -> SessionResult<LiveSession> {
        let descriptor = LiveSessionDescriptor::from_fields(fields)?;
        descriptor.verify_signature(&self.signer)?;

        if owner.is_some_and(|o| o != descriptor.session_name()) {
            return Err(SessionError::OwnerMismatch);
        }

        let record = self
            .registry
            .get_by_derived_name(descriptor.session_name())
            .await?
            .ok_or(SessionError::RegistryMismatch)?;

        self.classify(descriptor, &record)
    }

    fn classify(
        &self,
        descriptor: LiveSessionDescriptor,
        record: &ContainerRecord,
    ) -> SessionResult<LiveSession> {
        match (descriptor.is_loading(), record.status) {
            (false, ContainerStatus::Running) if descriptor.matches_record(record) => {
                Ok(LiveSession::Ready(descriptor))
            }
            (true, ContainerStatus::Starting) if descriptor.matches_record(record) => {
                Ok(LiveSession::Pending(descriptor))
            }
            (true, ContainerStatus::Running) => {
                tracing::debug!(session_name = %record.name, "Promoting loading session to ready");
                Ok(LiveSession::Promoted(LiveSessionDescriptor::ready_for(
                    record,
                    &self.signer,
                )))
            }
            // Exited containers, or endpoints that moved
            _ => Err(SessionError::RegistryMismatch),
        }
    }

    /// Signature matches and the registry agrees with the claimed endpoints
    pub async fn is_valid(&self, fields: &DescriptorFields) -> bool {
        match self.validate(fields).await {
            Ok(LiveSession::Ready(_) | LiveSession::Pending(_)) => true,
            Ok(LiveSession::Promoted(_)) => false,
            Err(e) => {
                e.log();
                false
            }
        }
    }
}
