//! Session Error Types
//!
//! Session-gate error variants. Every variant has a stable reason code for
//! logs; clients only ever see the coarse [`ErrorKind`].

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::crypto::SignerError;
use thiserror::Error;

/// Session-specific result type alias
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Signing key missing or configuration unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable or incomplete cookie/token
    #[error("Malformed session input: {0}")]
    MalformedInput(String),

    /// Recomputed signature differs from the claimed one
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// Identity token older than the validity window
    #[error("Identity token expired")]
    Expired,

    /// Claimed endpoints do not match the live container record
    #[error("Container deleted or ports not matching")]
    RegistryMismatch,

    /// Descriptor names a session that is not the caller's
    #[error("Session does not belong to the authenticated user")]
    OwnerMismatch,

    /// Load or leadership oracle failed or timed out
    #[error("Cluster oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Container registry failed
    #[error("Container registry error: {0}")]
    Registry(String),

    /// Job could not be handed to the dispatcher
    #[error("Job dispatch failed: {0}")]
    Dispatch(String),

    /// Plugin rejected at registration
    #[error("Plugin registration failed: {0}")]
    Plugin(String),

    /// Dev sign-in requested while disabled
    #[error("Sign-in endpoint disabled")]
    SignInDisabled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Stable reason code written to logs
    pub fn reason_code(&self) -> &'static str {
        match self {
            SessionError::Config(_) => "config_error",
            SessionError::MalformedInput(_) => "malformed_input",
            SessionError::SignatureMismatch => "signature_mismatch",
            SessionError::Expired => "expired",
            SessionError::RegistryMismatch => "container_deleted_or_ports_mismatch",
            SessionError::OwnerMismatch => "session_owner_mismatch",
            SessionError::OracleUnavailable(_) => "oracle_unavailable",
            SessionError::Registry(_) => "registry_error",
            SessionError::Dispatch(_) => "dispatch_error",
            SessionError::Plugin(_) => "plugin_error",
            SessionError::SignInDisabled => "sign_in_disabled",
            SessionError::Internal(_) => "internal_error",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::MalformedInput(_)
            | SessionError::SignatureMismatch
            | SessionError::Expired
            | SessionError::RegistryMismatch
            | SessionError::OwnerMismatch => ErrorKind::Unauthorized,
            SessionError::OracleUnavailable(_)
            | SessionError::Registry(_)
            | SessionError::Dispatch(_) => ErrorKind::ServiceUnavailable,
            SessionError::SignInDisabled => ErrorKind::NotFound,
            SessionError::Config(_) | SessionError::Plugin(_) | SessionError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Client-safe error; the detailed reason stays in the logs
    pub fn to_app_error(&self) -> AppError {
        match self.kind() {
            ErrorKind::Unauthorized => {
                AppError::unauthorized("Session is not valid").with_action("Sign in again")
            }
            ErrorKind::ServiceUnavailable => {
                AppError::service_unavailable("Session cannot be placed on this node")
                    .with_action("Retry the request")
            }
            ErrorKind::NotFound => AppError::not_found("Not found"),
            _ => AppError::internal("Internal error"),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            SessionError::Config(_) | SessionError::Plugin(_) | SessionError::Internal(_) => {
                tracing::error!(reason = self.reason_code(), error = %self, "Session internal error");
            }
            SessionError::OracleUnavailable(_)
            | SessionError::Registry(_)
            | SessionError::Dispatch(_) => {
                tracing::warn!(reason = self.reason_code(), error = %self, "Session collaborator failure");
            }
            SessionError::SignatureMismatch | SessionError::OwnerMismatch => {
                tracing::warn!(reason = self.reason_code(), "Session tamper check failed");
            }
            _ => {
                tracing::info!(reason = self.reason_code(), error = %self, "Session rejected");
            }
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().with_source(self).into_response()
    }
}

impl From<SignerError> for SessionError {
    fn from(err: SignerError) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<kernel::id::IdError> for SessionError {
    fn from(err: kernel::id::IdError) -> Self {
        SessionError::MalformedInput(err.to_string())
    }
}
