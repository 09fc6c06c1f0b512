//! Cluster Collaborators
//!
//! Job execution, load telemetry and leader election. All are owned by
//! other systems; the session gate only asks questions and hands off work.

use crate::domain::value_object::{
    node_id::NodeId, node_load::NodeLoad, session_name::SessionName, user_id::UserId,
};
use crate::error::SessionResult;

/// Background job dispatcher.
///
/// Calls return once the job is accepted; completion is never awaited.
/// Launches for a session name already in flight are merged.
#[trait_variant::make(JobDispatcher: Send)]
pub trait LocalJobDispatcher {
    /// Queue a container launch for `name`
    async fn launch(&self, name: &SessionName, user_id: &UserId, force: bool) -> SessionResult<()>;

    /// Queue backup of a stopped container followed by its removal
    async fn backup_and_cleanup(&self, resource_id: &str) -> SessionResult<()>;
}

/// Cloud load telemetry
#[trait_variant::make(CloudOracle: Send)]
pub trait LocalCloudOracle {
    /// Current load of a node, 0..=100
    async fn current_load(&self, node_id: &NodeId) -> SessionResult<NodeLoad>;

    /// Whether this node should take a new session
    async fn should_accept_session(&self, is_leader_candidate: bool) -> SessionResult<bool>;
}

/// Cluster leader election
#[trait_variant::make(LeadershipOracle: Send)]
pub trait LocalLeadershipOracle {
    async fn is_proposed_cluster_leader(&self) -> SessionResult<bool>;
}
