//! Application Layer
//!
//! Use cases and application services.

pub mod admission;
pub mod check_session;
pub mod config;
pub mod coordinator;
pub mod session_token;
pub mod sign_in;
pub mod sign_out;

// Re-exports
pub use admission::AdmissionController;
pub use check_session::{CheckLiveSessionUseCase, LiveSession};
pub use config::SessionConfig;
pub use coordinator::{RequestInput, SessionCoordinator, SessionOutcome, SessionStatus};
pub use session_token::SessionTokenCodec;
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::{SignOutOutput, SignOutUseCase};
