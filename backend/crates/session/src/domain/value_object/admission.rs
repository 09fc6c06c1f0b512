//! Admission Value Objects
//!
//! Per-user container state and the per-request admission outcome.

use std::fmt;

use crate::domain::entity::container::{ContainerRecord, ContainerStatus};

/// Container state of a user's session as seen by admission control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No container
    None,
    /// Container exists and answers liveness
    Running,
    /// Container exists but is not running
    Stale,
    /// Launch in flight
    Loading,
}

impl ContainerState {
    pub fn of(record: Option<&ContainerRecord>) -> Self {
        match record.map(|r| r.status) {
            None => ContainerState::None,
            Some(ContainerStatus::Running) => ContainerState::Running,
            Some(ContainerStatus::Starting) => ContainerState::Loading,
            Some(ContainerStatus::Exited) => ContainerState::Stale,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::None => "none",
            ContainerState::Running => "running",
            ContainerState::Stale => "stale",
            ContainerState::Loading => "loading",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient admission result, consumed by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// A launch was dispatched for this node
    AllowLaunch,
    /// This node will not host the session; client should retry elsewhere
    Deny,
    /// The presented live session is valid; nothing to launch
    AlreadyRunning,
}

impl AdmissionDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionDecision::AllowLaunch => "allow_launch",
            AdmissionDecision::Deny => "deny",
            AdmissionDecision::AlreadyRunning => "already_running",
        }
    }
}

impl fmt::Display for AdmissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
