//! Session Gate
//!
//! Authenticates requests with signed identity tokens, validates the live
//! session a client claims against the container registry, and decides
//! whether this node launches a container under cluster load.
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, collaborator traits
//! - `application/` - Use cases (token codec, live-session check, admission, coordinator)
//! - `infra/` - In-memory cluster
//! - `presentation/` - HTTP handlers, cookies, plugins
//!
//! ## Security Model
//! - Every client-held value (identity token, descriptor, affinity marker) is HMAC-signed
//! - A descriptor is honoured only if the registry agrees with its endpoints
//! - Admission fails closed: collaborator errors and oracle timeouts deny

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use infra::memory::InMemoryCluster;
pub use presentation::plugin::{HandlerPlugin, PluginRegistry, UiModulePlugin};
pub use presentation::router::{session_router, session_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
