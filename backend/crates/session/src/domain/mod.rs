//! Domain Layer
//!
//! Contains entities, value objects, and the collaborator traits the
//! session gate consumes.

pub mod cluster;
pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
pub use entity::{
    container::{ContainerRecord, ContainerStatus},
    identity_token::IdentityToken,
    live_session::{DescriptorFields, LiveSessionDescriptor},
};
pub use repository::ContainerRegistry;
