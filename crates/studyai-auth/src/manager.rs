//! Session Manager
//!
//! The single owner of the signed-in session and the only writer of token
//! storage. Construct one at startup and hand clones to consumers; clones
//! share state.
//!
//! ```text
//! NoSession --login/signup--> Authenticated(policy)
//! Authenticated(policy) --refresh ok--> Authenticated(policy)
//! Authenticated(_) --logout | refresh failure | unreadable token--> NoSession
//! ```

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use crate::classify::ClassifiedError;
use crate::error::AuthError;
use crate::models::{
    ApiRequest, AuthTokens, LoginCredentials, LoginRequest, RefreshRequest, SignupData,
};
use crate::store::{PersistencePolicy, TokenStore};
use crate::token::{decode_claims, now_unix, Identity, EXPIRY_WARNING_SECS};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, RetryPolicy, RetryingTransport,
};
use crate::Result;

const LOGIN_PATH: &str = "/api/auth/login";
const SIGNUP_PATH: &str = "/api/auth/signup";
const REFRESH_PATH: &str = "/api/auth/refresh";
const LOGOUT_PATH: &str = "/api/auth/logout";

#[derive(Debug, Clone)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    policy: PersistencePolicy,
}

impl SessionState {
    fn empty() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            policy: PersistencePolicy::SessionOnly,
        }
    }
}

type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

pub struct SessionManager {
    base_url: Url,
    /// Single-shot transport for `api_call`
    transport: Arc<dyn HttpTransport>,
    /// Retrying transport for the auth endpoints
    fetcher: RetryingTransport,
    store: TokenStore,
    state: Arc<RwLock<SessionState>>,
    /// The refresh currently on the wire, tagged with the refresh token it
    /// spends and shared by every waiting caller
    refresh_in_flight: Arc<Mutex<Option<(String, PendingRefresh)>>>,
}

impl SessionManager {
    /// Build a manager, restoring whatever session the store still holds.
    pub fn new(
        base_url: Url,
        transport: Arc<dyn HttpTransport>,
        store: TokenStore,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let state = match store.load()? {
            Some(saved) => SessionState {
                access_token: Some(saved.access_token),
                refresh_token: saved.refresh_token,
                policy: saved.policy,
            },
            None => SessionState::empty(),
        };

        tracing::info!(
            api = %base_url,
            restored = state.access_token.is_some(),
            remember_me = state.policy.is_persistent(),
            "Initialized session manager"
        );

        let fetcher = RetryingTransport::new(Arc::clone(&transport), retry_policy);

        Ok(Self {
            base_url,
            transport,
            fetcher,
            store,
            state: Arc::new(RwLock::new(state)),
            refresh_in_flight: Arc::new(Mutex::new(None)),
        })
    }

    // === Authentication ===

    /// Exchange credentials for a session.
    ///
    /// `remember_me` selects persistent storage and remembers the email.
    /// Every failure is returned as `AuthError::Classified`.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Identity> {
        match self.login_inner(&credentials).await {
            Ok(identity) => {
                self.fetcher.reset_retry_count();
                tracing::info!(
                    user_id = %identity.id,
                    remember_me = credentials.remember_me,
                    "Logged in"
                );
                Ok(identity)
            }
            Err(e) => Err(classify("login", e)),
        }
    }

    async fn login_inner(&self, credentials: &LoginCredentials) -> Result<Identity> {
        let request = self.auth_request(LOGIN_PATH, &LoginRequest::from(credentials))?;
        let response = self.fetcher.fetch(request).await?;
        let tokens = read_tokens(response)?;

        let identity = self.establish(
            &tokens,
            PersistencePolicy::from_remember_me(credentials.remember_me),
        )?;
        if credentials.remember_me {
            self.store.save_remembered_email(&credentials.email)?;
        }

        Ok(identity)
    }

    /// Create an account and sign in. New accounts always get a
    /// persistent session.
    pub async fn signup(&self, data: SignupData) -> Result<Identity> {
        match self.signup_inner(&data).await {
            Ok(identity) => {
                self.fetcher.reset_retry_count();
                tracing::info!(user_id = %identity.id, role = %identity.role, "Signed up");
                Ok(identity)
            }
            Err(e) => Err(classify("signup", e)),
        }
    }

    async fn signup_inner(&self, data: &SignupData) -> Result<Identity> {
        let request = self.auth_request(SIGNUP_PATH, data)?;
        let response = self.fetcher.fetch(request).await?;
        let tokens = read_tokens(response)?;

        let identity = self.establish(&tokens, PersistencePolicy::Persistent)?;
        self.store.save_remembered_email(&data.email)?;

        Ok(identity)
    }

    /// End the session. The server is told on a best-effort basis; local
    /// tokens are cleared no matter what happens on the network.
    pub async fn logout(&self) {
        if let Some(token) = self.access_token() {
            match self.logout_request(&token).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("Server revoked session");
                }
                Ok(response) => {
                    tracing::debug!(status = response.status, "Server declined logout");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Logout request failed");
                }
            }
        }

        self.clear_tokens();
        tracing::info!("Logged out");
    }

    async fn logout_request(&self, token: &str) -> Result<HttpResponse> {
        let request = HttpRequest::new(Method::Post, self.endpoint_url(LOGOUT_PATH)?).bearer(token);
        self.fetcher.fetch(request).await
    }

    /// Trade the refresh token for a new pair.
    ///
    /// Concurrent callers share one request and one outcome. Returns `None`
    /// without touching the network when there is no refresh token; any
    /// failure ends the session.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let pending = {
            let mut in_flight = self.refresh_in_flight.lock();
            let refresh_token = self.state.read().refresh_token.clone()?;

            match in_flight.as_ref() {
                // Join only a refresh spending the token we hold now. A slot
                // left by a cancelled caller for an older session is replaced.
                Some((spending, pending)) if *spending == refresh_token => pending.clone(),
                _ => {
                    let manager = self.clone();
                    let tag = refresh_token.clone();
                    let pending = async move {
                        let outcome = manager.perform_refresh(tag.clone()).await;
                        let mut slot = manager.refresh_in_flight.lock();
                        if matches!(slot.as_ref(), Some((spending, _)) if *spending == tag) {
                            *slot = None;
                        }
                        outcome
                    }
                    .boxed()
                    .shared();
                    *in_flight = Some((refresh_token, pending.clone()));
                    pending
                }
            }
        };

        pending.await
    }

    async fn perform_refresh(&self, refresh_token: String) -> Option<String> {
        let policy = self.state.read().policy;

        match self.request_refresh(&refresh_token).await {
            Ok(tokens) => {
                // A logout or a new login while the request was out wins.
                if !self.is_current(&refresh_token) {
                    tracing::info!("Session changed during refresh, discarding new tokens");
                    return None;
                }
                if let Err(e) = self.set_tokens(&tokens, policy) {
                    tracing::error!(error = %e, "Failed to store refreshed tokens");
                    self.clear_tokens();
                    return None;
                }

                tracing::info!(remember_me = policy.is_persistent(), "Refreshed access token");
                Some(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                if self.is_current(&refresh_token) {
                    self.clear_tokens();
                }
                None
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        let request = self.auth_request(REFRESH_PATH, &RefreshRequest { refresh_token })?;
        let response = self.fetcher.fetch(request).await?;
        read_tokens(response)
    }

    // === Authenticated requests ===

    /// Call an API endpoint (a path such as `/api/records`) with the bearer
    /// token attached.
    ///
    /// A 401 triggers one refresh and one retry with the new token, never
    /// more. Responses come back as-is whatever their status; only
    /// transport failures are errors.
    pub async fn api_call(&self, endpoint: &str, request: ApiRequest) -> Result<HttpResponse> {
        let url = self.endpoint_url(endpoint)?;

        let token = self.access_token();
        let response = self
            .transport
            .send(request.to_http(&url, token.as_deref()))
            .await?;

        if response.status == 401 && self.has_refresh_token() {
            tracing::debug!(endpoint, "Unauthorized, refreshing token");
            if let Some(new_token) = self.refresh_access_token().await {
                return self
                    .transport
                    .send(request.to_http(&url, Some(&new_token)))
                    .await;
            }
        }

        Ok(response)
    }

    // === Session queries ===

    /// Whether the access token exists and has not expired.
    ///
    /// Not a pure query: a token that cannot be decoded ends the session.
    pub fn is_authenticated(&self) -> bool {
        let Some(token) = self.access_token() else {
            return false;
        };

        match decode_claims(&token) {
            Ok(claims) => claims.is_valid_at(now_unix()),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable access token, clearing session");
                self.clear_tokens();
                false
            }
        }
    }

    /// Identity decoded from the access token. Expiry is not checked.
    ///
    /// Not a pure query: a token that cannot be decoded ends the session.
    pub fn current_user(&self) -> Option<Identity> {
        let token = self.access_token()?;

        match decode_claims(&token) {
            Ok(claims) => Some(claims.identity()),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable access token, clearing session");
                self.clear_tokens();
                None
            }
        }
    }

    /// True when there is no usable token or it expires within five minutes.
    pub fn is_token_expiring_soon(&self) -> bool {
        self.access_token()
            .and_then(|token| decode_claims(&token).ok())
            .map_or(true, |claims| {
                claims.expires_within(now_unix(), EXPIRY_WARNING_SECS)
            })
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.state.read().refresh_token.is_some()
    }

    /// Storage policy of the live session, if any.
    pub fn policy(&self) -> Option<PersistencePolicy> {
        let state = self.state.read();
        state.access_token.as_ref().map(|_| state.policy)
    }

    pub fn is_remember_me_enabled(&self) -> bool {
        self.policy() == Some(PersistencePolicy::Persistent)
    }

    /// Retries spent by auth requests since the last successful login/signup.
    pub fn retry_count(&self) -> u32 {
        self.fetcher.retry_count()
    }

    // === Remembered email ===

    pub fn remembered_email(&self) -> Option<String> {
        match self.store.remembered_email() {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read remembered email");
                None
            }
        }
    }

    pub fn save_remembered_email(&self, email: &str) -> Result<()> {
        self.store.save_remembered_email(email)
    }

    pub fn clear_remembered_email(&self) -> Result<()> {
        self.store.clear_remembered_email()
    }

    // === Internals ===

    fn endpoint_url(&self, endpoint: &str) -> Result<String> {
        if !endpoint.starts_with('/') {
            return Err(AuthError::InvalidEndpoint(endpoint.to_string()));
        }

        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), endpoint);
        Url::parse(&joined)
            .map(|url| url.to_string())
            .map_err(|e| AuthError::InvalidEndpoint(format!("{endpoint}: {e}")))
    }

    fn auth_request<T: Serialize>(&self, path: &str, body: &T) -> Result<HttpRequest> {
        Ok(HttpRequest::new(Method::Post, self.endpoint_url(path)?)
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(body)?))
    }

    /// Decode before storing so an unreadable token never lands in storage.
    fn establish(&self, tokens: &AuthTokens, policy: PersistencePolicy) -> Result<Identity> {
        let identity = decode_claims(&tokens.access_token)?.identity();
        self.set_tokens(tokens, policy)?;
        Ok(identity)
    }

    fn set_tokens(&self, tokens: &AuthTokens, policy: PersistencePolicy) -> Result<()> {
        self.store
            .save(&tokens.access_token, &tokens.refresh_token, policy)?;

        *self.state.write() = SessionState {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: Some(tokens.refresh_token.clone()),
            policy,
        };

        Ok(())
    }

    fn clear_tokens(&self) {
        *self.state.write() = SessionState::empty();

        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear stored tokens");
        }
    }

    fn is_current(&self, refresh_token: &str) -> bool {
        self.state.read().refresh_token.as_deref() == Some(refresh_token)
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            state: Arc::clone(&self.state),
            refresh_in_flight: Arc::clone(&self.refresh_in_flight),
        }
    }
}

fn read_tokens(response: HttpResponse) -> Result<AuthTokens> {
    if !response.is_success() {
        return Err(AuthError::Rejected {
            status: response.status,
            detail: response.error_detail(),
        });
    }

    response.json()
}

fn classify(operation: &str, error: AuthError) -> AuthError {
    let classified = ClassifiedError::from_auth_error(&error);
    classified.log(operation);
    AuthError::Classified(classified)
}
