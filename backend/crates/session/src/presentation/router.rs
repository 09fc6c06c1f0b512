//! Session Router

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::application::config::SessionConfig;
use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::repository::ContainerRegistry;
use crate::error::SessionResult;
use crate::infra::memory::InMemoryCluster;
use crate::presentation::handlers::{self, SessionAppState};
use crate::presentation::middleware::require_live_session;
use crate::presentation::plugin::PluginRegistry;

/// Create the session router backed by the in-memory cluster
pub fn session_router(
    cluster: InMemoryCluster,
    config: SessionConfig,
    plugins: &PluginRegistry,
) -> SessionResult<Router> {
    session_router_generic(cluster, config, plugins)
}

/// Create a generic session router for any collaborator implementation.
///
/// Fails when the signing secret or node id is unusable, or a numeric
/// setting is out of range.
pub fn session_router_generic<C>(
    cluster: C,
    config: SessionConfig,
    plugins: &PluginRegistry,
) -> SessionResult<Router>
where
    C: ContainerRegistry
        + JobDispatcher
        + CloudOracle
        + LeadershipOracle
        + Clone
        + Send
        + Sync
        + 'static,
{
    config.validate()?;
    let state = SessionAppState {
        cluster: Arc::new(cluster),
        signer: config.signer()?,
        node_id: config.node()?,
        config: Arc::new(config),
        plugins: Arc::new(plugins.manifest()),
    };

    let mut router = Router::new()
        .route("/session", get(handlers::resolve_session::<C>))
        .route("/signin", post(handlers::sign_in::<C>))
        .route("/signout", post(handlers::sign_out::<C>))
        .route("/plugins/manifest", get(handlers::plugin_manifest::<C>))
        .with_state(state.clone());

    for (uri, plugin) in plugins.mounted() {
        let guarded = plugin.router().layer(middleware::from_fn_with_state(
            state.clone(),
            require_live_session::<C>,
        ));
        router = router.nest(uri, guarded);
    }

    Ok(router)
}
