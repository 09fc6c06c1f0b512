//! Entity Module

pub mod affinity;
pub mod container;
pub mod identity_token;
pub mod live_session;
