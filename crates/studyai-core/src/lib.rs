//! StudyAI Core
//!
//! Wires configuration, storage and the session manager together.
//! One `App` per process; it owns the only `SessionManager`.

mod app;
mod config;
mod error;

pub use app::App;
pub use config::Config;
pub use error::CoreError;

pub use studyai_auth::{
    ApiRequest, AuthError, ClassifiedError, ErrorKind, HttpRequest, HttpResponse, HttpTransport,
    Identity, LoginCredentials, Method, PersistencePolicy, Role, SessionManager, Severity,
    SignupData,
};
pub use studyai_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
