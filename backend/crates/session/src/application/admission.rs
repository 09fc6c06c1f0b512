//! Admission Controller
//!
//! Decides whether this node launches a container for a user. Consulted
//! only when the request carries no usable live session.
//!
//! Every failure on the way fails closed: a broken registry, a failed
//! invalidate or a rejected dispatch all end in [`AdmissionDecision::Deny`],
//! and oracles that error or time out count as "decline".

use std::future::Future;
use std::sync::Arc;

use crate::application::config::SessionConfig;
use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::{
    admission::{AdmissionDecision, ContainerState},
    node_id::NodeId,
    session_name::SessionName,
    user_id::UserId,
};
use crate::error::{SessionError, SessionResult};

/// Admission Controller
pub struct AdmissionController<R, J, C, L>
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
    node_id: NodeId,
}

impl<R, J, C, L> AdmissionController<R, J, C, L>
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
        node_id: NodeId,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            cloud,
            leadership,
            config,
            node_id,
        }
    }

    /// Decide for `user_id`; `max_hop` marks a request that has already
    /// been bounced between nodes and should be placed if at all possible.
    pub async fn decide(&self, user_id: &UserId, max_hop: bool) -> AdmissionDecision {
        let name = SessionName::derive(user_id);

        let record = match self.registry.get_by_derived_name(&name).await {
            Ok(record) => record,
            Err(e) => {
                e.log();
                return AdmissionDecision::Deny;
            }
        };
        let state = ContainerState::of(record.as_ref());
        tracing::debug!(session_name = %name, state = %state, "Existing container");

        if max_hop {
            match self.bounded("load", self.cloud.current_load(&self.node_id)).await {
                Ok(load) if load.is_below(self.config.reject_load_threshold) => {
                    tracing::debug!(load = load.percent(), "Accepting secondary hop");
                    return self.launch(&name, user_id).await;
                }
                Ok(load) => {
                    tracing::debug!(load = load.percent(), "Too loaded for secondary hop");
                }
                Err(e) => e.log(),
            }
        }

        if state != ContainerState::Running && !self.accepts_new_session().await {
            if let Some(record) = record {
                tracing::info!(
                    session_name = %name,
                    resource_id = record.resource_id(),
                    "Declined; cleaning up stopped container"
                );
                if let Err(e) = self.registry.invalidate(&record.name).await {
                    e.log();
                }
                if let Err(e) = self.dispatcher.backup_and_cleanup(record.resource_id()).await {
                    e.log();
                }
            }
            tracing::info!(session_name = %name, node = %self.node_id, "Admission denied");
            return AdmissionDecision::Deny;
        }

        self.launch(&name, user_id).await
    }

    async fn accepts_new_session(&self) -> bool {
        let is_leader = match self
            .bounded("leadership", self.leadership.is_proposed_cluster_leader())
            .await
        {
            Ok(is_leader) => is_leader,
            Err(e) => {
                e.log();
                return false;
            }
        };

        match self
            .bounded("accept", self.cloud.should_accept_session(is_leader))
            .await
        {
            Ok(accept) => accept,
            Err(e) => {
                e.log();
                false
            }
        }
    }

    /// Invalidate first so the launch never reuses a stale cached record
    async fn launch(&self, name: &SessionName, user_id: &UserId) -> AdmissionDecision {
        if let Err(e) = self.registry.invalidate(name).await {
            e.log();
            return AdmissionDecision::Deny;
        }
        if let Err(e) = self.dispatcher.launch(name, user_id, true).await {
            e.log();
            return AdmissionDecision::Deny;
        }
        tracing::info!(session_name = %name, node = %self.node_id, "Launch dispatched");
        AdmissionDecision::AllowLaunch
    }

    async fn bounded<T>(
        &self,
        oracle: &str,
        call: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        tokio::time::timeout(self.config.oracle_timeout, call)
            .await
            .map_err(|_| SessionError::OracleUnavailable(format!("{oracle} oracle timed out")))?
    }
}
