//! Repository Traits
//!
//! Interface to the container registry. Implementations live in the
//! infrastructure layer.

use crate::domain::entity::container::ContainerRecord;
use crate::domain::value_object::session_name::SessionName;
use crate::error::SessionResult;

/// Container registry trait
#[trait_variant::make(ContainerRegistry: Send)]
pub trait LocalContainerRegistry {
    /// Find the container registered under a session name
    async fn get_by_derived_name(&self, name: &SessionName)
    -> SessionResult<Option<ContainerRecord>>;

    /// Drop any cached state for the container so the next lookup is fresh
    async fn invalidate(&self, name: &SessionName) -> SessionResult<()>;
}
