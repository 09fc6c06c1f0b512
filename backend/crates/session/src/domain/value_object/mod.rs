//! Value Object Module

pub mod admission;
pub mod endpoint_markers;
pub mod node_id;
pub mod node_load;
pub mod session_name;
pub mod user_id;
