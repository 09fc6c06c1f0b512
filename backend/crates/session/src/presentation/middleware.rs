//! Session Middleware
//!
//! Guards plugin routes: the caller must be authenticated and present a
//! ready live session for their own container.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::check_session::{CheckLiveSessionUseCase, LiveSession};
use crate::application::session_token::SessionTokenCodec;
use crate::domain::cluster::{CloudOracle, JobDispatcher, LeadershipOracle};
use crate::domain::repository::ContainerRegistry;
use crate::domain::value_object::session_name::SessionName;
use crate::presentation::cookies;
use crate::presentation::handlers::SessionAppState;

/// Header telling the client to go through `/session` first
pub const SESSION_REQUIRED_HEADER: &str = "X-Session-Required";

/// Middleware that requires a ready live session
pub async fn require_live_session<C>(
    State(state): State<SessionAppState<C>>,
    req: Request<Body>,
    next: Next,
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
    let headers = req.headers();

    let codec = SessionTokenCodec::new(state.signer.clone(), state.config.auth_valid_secs);
    let identity = cookies::identity_cookie(headers, &state.config);
    let Some(user_id) = codec.authenticate(identity.as_deref()) else {
        tracing::debug!("No valid identity cookie");
        return session_required();
    };

    let fields = cookies::descriptor_fields(headers);
    let use_case = CheckLiveSessionUseCase::new(state.cluster.clone(), state.signer.clone());

    match use_case
        .validate_owned(&fields, &SessionName::derive(&user_id))
        .await
    {
        Ok(LiveSession::Ready(_)) => next.run(req).await,
        Ok(_) => {
            tracing::debug!(user_id = %user_id, "Live session not ready");
            session_required()
        }
        Err(e) => {
            e.log();
            session_required()
        }
    }
}

fn session_required() -> Response {
    (StatusCode::UNAUTHORIZED, [(SESSION_REQUIRED_HEADER, "true")]).into_response()
}
