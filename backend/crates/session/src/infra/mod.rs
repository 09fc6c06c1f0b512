//! Infrastructure Layer
//!
//! Collaborator implementations.

pub mod memory;

pub use memory::{ClusterCall, InMemoryCluster};
