//! In-Memory Cluster
//!
//! Single-process stand-in for the container registry, job executor and
//! cluster oracles. Backs the standalone binary and the test-suite.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::entity::container::{ContainerRecord, ContainerStatus};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::{
    endpoint_markers::EndpointMarkers, node_id::NodeId, node_load::NodeLoad,
    session_name::SessionName, user_id::UserId,
};
use crate::error::{SessionError, SessionResult};

const FIRST_PORT: u16 = 8000;

/// Side effect observed by the cluster, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Invalidate(SessionName),
    Launch {
        name: SessionName,
        user_id: UserId,
        force: bool,
    },
    BackupAndCleanup(String),
}

#[derive(Debug)]
struct ClusterState {
    /// Keyed by container path (`/` + session name)
    containers: HashMap<String, ContainerRecord>,
    calls: Vec<ClusterCall>,
    in_flight: HashSet<SessionName>,
    /// `None` makes the load query fail
    load: Option<NodeLoad>,
    accept: bool,
    leader: bool,
    oracle_delay: Option<Duration>,
    registry_down: bool,
    dispatch_down: bool,
    next_port: u16,
    next_resource: u64,
}

impl Default for ClusterState {
    fn default() -> Self {
        Self {
            containers: HashMap::new(),
            calls: Vec::new(),
            in_flight: HashSet::new(),
            load: NodeLoad::new(0),
            accept: true,
            leader: false,
            oracle_delay: None,
            registry_down: false,
            dispatch_down: false,
            next_port: FIRST_PORT,
            next_resource: 1,
        }
    }
}

impl ClusterState {
    fn allocate_markers(&mut self) -> EndpointMarkers {
        let base = self.next_port;
        self.next_port = self.next_port.wrapping_add(3);
        EndpointMarkers::new(
            base.to_string(),
            base.wrapping_add(1).to_string(),
            base.wrapping_add(2).to_string(),
        )
    }

    fn allocate_resource(&mut self) -> String {
        let id = format!("res-{}", self.next_resource);
        self.next_resource += 1;
        id
    }
}

/// In-memory cluster
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<RwLock<ClusterState>>,
    /// Launched containers come up immediately instead of staying `Starting`
    auto_start: bool,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches complete on dispatch
    pub fn with_auto_start() -> Self {
        Self {
            auto_start: true,
            ..Self::default()
        }
    }

    pub async fn insert(&self, record: ContainerRecord) {
        let mut state = self.state.write().await;
        state.containers.insert(record.name.container_path(), record);
    }

    pub async fn record(&self, name: &SessionName) -> Option<ContainerRecord> {
        self.state
            .read()
            .await
            .containers
            .get(&name.container_path())
            .cloned()
    }

    /// Finish an in-flight launch: the container is running on fresh ports
    pub async fn complete_launch(&self, name: &SessionName) -> Option<ContainerRecord> {
        let mut state = self.state.write().await;
        state.in_flight.remove(name);
        let markers = state.allocate_markers();
        let record = state.containers.get_mut(&name.container_path())?;
        record.status = ContainerStatus::Running;
        record.markers = markers;
        Some(record.clone())
    }

    /// Mark a container as stopped; a launch still starting dies with it
    pub async fn stop(&self, name: &SessionName) {
        let mut state = self.state.write().await;
        state.in_flight.remove(name);
        if let Some(record) = state.containers.get_mut(&name.container_path()) {
            record.status = ContainerStatus::Exited;
        }
    }

    pub async fn set_load(&self, load: Option<NodeLoad>) {
        self.state.write().await.load = load;
    }

    pub async fn set_accept(&self, accept: bool) {
        self.state.write().await.accept = accept;
    }

    pub async fn set_leader(&self, leader: bool) {
        self.state.write().await.leader = leader;
    }

    /// Delay every oracle answer
    pub async fn set_oracle_delay(&self, delay: Option<Duration>) {
        self.state.write().await.oracle_delay = delay;
    }

    pub async fn set_registry_down(&self, down: bool) {
        self.state.write().await.registry_down = down;
    }

    pub async fn set_dispatch_down(&self, down: bool) {
        self.state.write().await.dispatch_down = down;
    }

    pub async fn calls(&self) -> Vec<ClusterCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn launch_count(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, ClusterCall::Launch { .. }))
            .count()
    }

    async fn oracle_pause(&self) {
        let delay = self.state.read().await.oracle_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ContainerRegistry for InMemoryCluster {
    async fn get_by_derived_name(
        &self,
        name: &SessionName,
    ) -> SessionResult<Option<ContainerRecord>> {
        let state = self.state.read().await;
        if state.registry_down {
            return Err(SessionError::Registry("registry unreachable".into()));
        }
        Ok(state.containers.get(&name.container_path()).cloned())
    }

    async fn invalidate(&self, name: &SessionName) -> SessionResult<()> {
        let mut state = self.state.write().await;
        if state.registry_down {
            return Err(SessionError::Registry("registry unreachable".into()));
        }
        state.calls.push(ClusterCall::Invalidate(name.clone()));
        Ok(())
    }
}

impl JobDispatcher for InMemoryCluster {
    async fn launch(&self, name: &SessionName, user_id: &UserId, force: bool) -> SessionResult<()> {
        let mut state = self.state.write().await;
        if state.dispatch_down {
            return Err(SessionError::Dispatch("job queue unreachable".into()));
        }
        if state.in_flight.contains(name) {
            tracing::debug!(session_name = %name, "Launch already in flight");
            return Ok(());
        }

        state.calls.push(ClusterCall::Launch {
            name: name.clone(),
            user_id: user_id.clone(),
            force,
        });

        let running = state
            .containers
            .get(&name.container_path())
            .is_some_and(ContainerRecord::is_running);
        if running {
            return Ok(());
        }

        let resource_id = state.allocate_resource();
        let record = if self.auto_start {
            let markers = state.allocate_markers();
            ContainerRecord::new(name.clone(), resource_id, ContainerStatus::Running, markers)
        } else {
            state.in_flight.insert(name.clone());
            ContainerRecord::new(
                name.clone(),
                resource_id,
                ContainerStatus::Starting,
                EndpointMarkers::loading(),
            )
        };
        state.containers.insert(name.container_path(), record);
        Ok(())
    }

    async fn backup_and_cleanup(&self, resource_id: &str) -> SessionResult<()> {
        let mut state = self.state.write().await;
        if state.dispatch_down {
            return Err(SessionError::Dispatch("job queue unreachable".into()));
        }
        state
            .calls
            .push(ClusterCall::BackupAndCleanup(resource_id.to_string()));
        state.containers.retain(|_, r| r.resource_id() != resource_id);
        Ok(())
    }
}

impl CloudOracle for InMemoryCluster {
    async fn current_load(&self, _node_id: &NodeId) -> SessionResult<NodeLoad> {
        self.oracle_pause().await;
        self.state
            .read()
            .await
            .load
            .ok_or_else(|| SessionError::OracleUnavailable("load telemetry missing".into()))
    }

    async fn should_accept_session(&self, _is_leader_candidate: bool) -> SessionResult<bool> {
        self.oracle_pause().await;
        Ok(self.state.read().await.accept)
    }
}

impl LeadershipOracle for InMemoryCluster {
    async fn is_proposed_cluster_leader(&self) -> SessionResult<bool> {
        self.oracle_pause().await;
        Ok(self.state.read().await.leader)
    }
}
