//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use platform::crypto::Signer;

use crate::application::config::SessionConfig;
use crate::application::coordinator::{SessionCoordinator, SessionStatus};
use crate::application::sign_in::{SignInInput, SignInUseCase};
use crate::application::sign_out::SignOutUseCase;
use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::node_id::NodeId;
use crate::error::SessionResult;
use crate::presentation::cookies;
use crate::presentation::dto::{SessionQuery, SessionResponse, SignInRequest, SignInResponse};
use crate::presentation::plugin::PluginManifest;

/// Shared state for session handlers
#[derive(Clone)]
pub struct SessionAppState<C>
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
    pub cluster: Arc<C>,
    pub config: Arc<SessionConfig>,
    pub signer: Signer,
    pub node_id: NodeId,
    pub plugins: Arc<PluginManifest>,
}

/// GET /session
pub async fn resolve_session<C>(
    State(state): State<SessionAppState<C>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Response
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
    let input = cookies::read_request(&headers, &state.config, query.max_hop);

    let coordinator = SessionCoordinator::new(
        state.cluster.clone(),
        state.cluster.clone(),
        state.cluster.clone(),
        state.cluster.clone(),
        state.config.clone(),
        state.signer.clone(),
        state.node_id.clone(),
    );
    let outcome = coordinator.resolve(input).await;

    let status_code = match outcome.status {
        SessionStatus::Unauthenticated => StatusCode::UNAUTHORIZED,
        _ => StatusCode::OK,
    };
    let body = SessionResponse {
        status: outcome.status.as_str().to_string(),
        session_name: outcome.session_name.as_ref().map(|n| n.to_string()),
        loading: outcome.status == SessionStatus::Loading,
    };

    let mut response = (status_code, Json(body)).into_response();
    cookies::apply_updates(response.headers_mut(), &state.config.cookie, outcome.cookies);
    if outcome.close_connection {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    response
}

/// POST /signin
pub async fn sign_in<C>(
    State(state): State<SessionAppState<C>>,
    Json(req): Json<SignInRequest>,
) -> SessionResult<impl IntoResponse>
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
    let use_case = SignInUseCase::new(state.config.clone(), state.signer.clone());
    let output = use_case.execute(SignInInput {
        user_id: req.user_id,
    })?;

    let mut headers = HeaderMap::new();
    cookies::apply_updates(&mut headers, &state.config.cookie, output.cookies);

    Ok((
        StatusCode::OK,
        headers,
        Json(SignInResponse {
            session_name: output.session_name.to_string(),
        }),
    ))
}

/// POST /signout
pub async fn sign_out<C>(
    State(state): State<SessionAppState<C>>,
    headers: HeaderMap,
) -> impl IntoResponse
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
    let identity = cookies::identity_cookie(&headers, &state.config);

    let use_case = SignOutUseCase::new(
        state.cluster.clone(),
        state.cluster.clone(),
        state.config.clone(),
        state.signer.clone(),
    );
    let output = use_case.execute(identity.as_deref()).await;

    let mut response_headers = HeaderMap::new();
    cookies::apply_updates(&mut response_headers, &state.config.cookie, output.cookies);

    (StatusCode::NO_CONTENT, response_headers)
}

/// GET /plugins/manifest
pub async fn plugin_manifest<C>(State(state): State<SessionAppState<C>>) -> Json<PluginManifest>
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
    Json(state.plugins.as_ref().clone())
}
