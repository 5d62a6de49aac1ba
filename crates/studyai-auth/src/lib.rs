//! StudyAI Session Client
//!
//! Owns the access/refresh token pair for the signed-in student:
//! - Tokens persist in one of two storage tiers chosen by "remember me"
//! - At most one refresh is in flight; concurrent callers share it
//! - Calls to the auth API retry transport failures with exponential backoff
//! - Failures from login/signup reach callers only as user-safe messages

mod classify;
mod error;
mod manager;
mod models;
mod store;
mod token;
mod transport;

#[cfg(test)]
mod test_support;

pub use classify::{is_retryable, should_show_to_user, ClassifiedError, ErrorKind, Severity};
pub use error::AuthError;
pub use manager::SessionManager;
pub use models::{ApiRequest, AuthTokens, LoginCredentials, SignupData};
pub use store::{PersistencePolicy, StoredTokens, TokenStore};
pub use token::{decode_claims, now_unix, Identity, Role, TokenClaims, EXPIRY_WARNING_SECS};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, RetryPolicy,
    RetryingTransport,
};

pub type Result<T> = std::result::Result<T, AuthError>;
