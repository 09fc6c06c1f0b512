//! Container Record
//!
//! What the container registry knows about a session's container.

use crate::domain::value_object::{endpoint_markers::EndpointMarkers, session_name::SessionName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Launched, not yet answering
    Starting,
    Running,
    /// Stopped or unhealthy; needs backup and cleanup
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub name: SessionName,
    /// Underlying runtime resource (container id) used for cleanup
    pub resource_id: String,
    pub status: ContainerStatus,
    pub markers: EndpointMarkers,
}

impl ContainerRecord {
    pub fn new(
        name: SessionName,
        resource_id: impl Into<String>,
        status: ContainerStatus,
        markers: EndpointMarkers,
    ) -> Self {
        Self {
            name,
            resource_id: resource_id.into(),
            status,
            markers,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    pub fn endpoint_markers(&self) -> &EndpointMarkers {
        &self.markers
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}
