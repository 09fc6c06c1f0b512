use kernel::id::Id;

/// Identity of a serving node (cloud instance id)
pub struct NodeMarker;
pub type NodeId = Id<NodeMarker>;
