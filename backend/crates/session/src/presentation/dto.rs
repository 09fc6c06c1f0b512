//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

// ============================================================================
// Session
// ============================================================================

/// Session resolution query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    /// Request already bounced between nodes
    #[serde(default)]
    pub max_hop: bool,
}

/// Session resolution response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// `unauthenticated`, `ready`, `loading` or `retry`
    pub status: String,
    pub session_name: Option<String>,
    pub loading: bool,
}

// ============================================================================
// Sign In
// ============================================================================

/// Development sign-in request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub user_id: String,
}

/// Sign in response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub session_name: String,
}
