//! Session Coordinator
//!
//! Per-request glue: authenticate, honour a valid live session, otherwise
//! ask admission control and translate its decision into cookie updates.

use std::sync::Arc;

use platform::cookie::CookieUpdate;
use platform::crypto::Signer;

use crate::application::admission::AdmissionController;
use crate::application::check_session::{CheckLiveSessionUseCase, LiveSession};
use crate::application::config::SessionConfig;
use crate::application::session_token::SessionTokenCodec;
use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::entity::affinity::{AFFINITY_COOKIE, AFFINITY_MAX_AGE_SECS, AffinityMarker};
use crate::domain::entity::live_session::{DescriptorFields, LiveSessionDescriptor};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::{
    admission::AdmissionDecision, node_id::NodeId, session_name::SessionName, user_id::UserId,
};

/// What the coordinator reads off a request
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub identity: Option<String>,
    pub descriptor: DescriptorFields,
    pub affinity: Option<String>,
    pub max_hop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No valid identity token
    Unauthenticated,
    /// Container serving; descriptor is usable
    Ready,
    /// Container starting; poll again
    Loading,
    /// This node will not host the session; retry through the balancer
    Retry,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Ready => "ready",
            SessionStatus::Loading => "loading",
            SessionStatus::Retry => "retry",
        }
    }
}

/// Result of resolving one request
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub user_id: Option<UserId>,
    /// `None` when the request never reached a decision (unauthenticated)
    pub decision: Option<AdmissionDecision>,
    pub session_name: Option<SessionName>,
    /// Ordered cookie writes; later entries override earlier ones
    pub cookies: Vec<CookieUpdate>,
    /// Ask the server to drop the connection so the balancer re-routes
    pub close_connection: bool,
}

impl SessionOutcome {
    fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user_id: None,
            decision: None,
            session_name: None,
            cookies: Vec::new(),
            close_connection: false,
        }
    }
}

/// Writes that drop node affinity: our marker plus the balancer's trackers
pub fn affinity_clear_updates(config: &SessionConfig) -> Vec<CookieUpdate> {
    std::iter::once(AFFINITY_COOKIE)
        .chain(config.lb_tracker_cookies.iter().map(String::as_str))
        .map(CookieUpdate::clear)
        .collect()
}

/// Session Coordinator
pub struct SessionCoordinator<R, J, C, L>
where
    R: ContainerRegistry,
    J: JobDispatcher,
    C: CloudOracle,
    L: LeadershipOracle,
{
    registry: Arc<R>,
    dispatcher: Arc<J>,
    cloud: Arc<C>,
    leadership: Arc<L>,
    config: Arc<SessionConfig>,
    signer: Signer,
    node_id: NodeId,
}

impl<R, J, C, L> SessionCoordinator<R, J, C, L>
where
    R: ContainerRegistry,
    J: JobDispatcher,
    C: CloudOracle,
    L: LeadershipOracle,
{
    pub fn new(
        registry: Arc<R>,
        dispatcher: Arc<J>,
        cloud: Arc<C>,
        leadership: Arc<L>,
        config: Arc<SessionConfig>,
        signer: Signer,
        node_id: NodeId,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            cloud,
            leadership,
            config,
            signer,
            node_id,
        }
    }

    pub async fn resolve(&self, input: RequestInput) -> SessionOutcome {
        let codec = SessionTokenCodec::new(self.signer.clone(), self.config.auth_valid_secs);
        let Some(user_id) = codec.authenticate(input.identity.as_deref()) else {
            return SessionOutcome::unauthenticated();
        };
        let session_name = SessionName::derive(&user_id);

        if !input.descriptor.is_empty() {
            let check = CheckLiveSessionUseCase::new(self.registry.clone(), self.signer.clone());
            match check.validate_owned(&input.descriptor, &session_name).await {
                Ok(live) => return self.live(user_id, session_name, live, &input),
                Err(e) => e.log(),
            }
        }

        let admission = AdmissionController::new(
            self.registry.clone(),
            self.dispatcher.clone(),
            self.cloud.clone(),
            self.leadership.clone(),
            self.config.clone(),
            self.node_id.clone(),
        );

        match admission.decide(&user_id, input.max_hop).await {
            AdmissionDecision::Deny => self.denied(user_id, session_name),
            decision => self.launched(user_id, session_name, decision),
        }
    }

    fn live(
        &self,
        user_id: UserId,
        session_name: SessionName,
        live: LiveSession,
        input: &RequestInput,
    ) -> SessionOutcome {
        let mut cookies = Vec::new();
        let status = match &live {
            LiveSession::Ready(_) => SessionStatus::Ready,
            LiveSession::Pending(_) => SessionStatus::Loading,
            LiveSession::Promoted(descriptor) => {
                tracing::info!(session_name = %session_name, "Session ready");
                cookies.extend(descriptor.to_cookie_updates(self.config.container_cookie_max_age()));
                SessionStatus::Ready
            }
        };

        if !AffinityMarker::is_bound_to(input.affinity.as_deref(), &self.node_id, &self.signer) {
            cookies.push(self.affinity_update());
        }

        SessionOutcome {
            status,
            user_id: Some(user_id),
            decision: Some(AdmissionDecision::AlreadyRunning),
            session_name: Some(session_name),
            cookies,
            close_connection: false,
        }
    }

    fn launched(
        &self,
        user_id: UserId,
        session_name: SessionName,
        decision: AdmissionDecision,
    ) -> SessionOutcome {
        let descriptor = LiveSessionDescriptor::loading(session_name.clone(), &self.signer);

        let mut cookies = LiveSessionDescriptor::clear_cookie_updates();
        cookies.extend(descriptor.to_cookie_updates(self.config.container_cookie_max_age()));
        cookies.push(self.affinity_update());

        SessionOutcome {
            status: SessionStatus::Loading,
            user_id: Some(user_id),
            decision: Some(decision),
            session_name: Some(session_name),
            cookies,
            close_connection: false,
        }
    }

    fn denied(&self, user_id: UserId, session_name: SessionName) -> SessionOutcome {
        let mut cookies = LiveSessionDescriptor::clear_cookie_updates();
        cookies.extend(affinity_clear_updates(&self.config));

        SessionOutcome {
            status: SessionStatus::Retry,
            user_id: Some(user_id),
            decision: Some(AdmissionDecision::Deny),
            session_name: Some(session_name),
            cookies,
            close_connection: true,
        }
    }

    fn affinity_update(&self) -> CookieUpdate {
        let marker = AffinityMarker::for_node(&self.node_id, &self.signer);
        CookieUpdate::set(AFFINITY_COOKIE, marker.value(), Some(AFFINITY_MAX_AGE_SECS))
    }
}
