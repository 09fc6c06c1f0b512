//! Presentation Layer
//!
//! HTTP handlers, DTOs, cookies, router, middleware and plugins.

pub mod cookies;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod plugin;
pub mod router;

pub use handlers::SessionAppState;
pub use middleware::require_live_session;
pub use plugin::{HandlerPlugin, PluginManifest, PluginRegistry, UiModulePlugin};
pub use router::{session_router, session_router_generic};
