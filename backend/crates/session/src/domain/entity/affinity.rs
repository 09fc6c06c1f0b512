//! Affinity Marker
//!
//! Signed node identity handed to the client so the load balancer keeps
//! routing it back to the node that launched its container.

use platform::crypto::Signer;

use crate::domain::value_object::node_id::NodeId;

pub const AFFINITY_COOKIE: &str = "lb";
/// 30 days
pub const AFFINITY_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityMarker(String);

impl AffinityMarker {
    pub fn for_node(node_id: &NodeId, signer: &Signer) -> Self {
        Self(signer.sign(node_id.as_str()))
    }

    /// Whether a client-held marker points at `node_id`
    pub fn is_bound_to(raw: Option<&str>, node_id: &NodeId, signer: &Signer) -> bool {
        raw.is_some_and(|value| signer.verify(node_id.as_str(), value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}
