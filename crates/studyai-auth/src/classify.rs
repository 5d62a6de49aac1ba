//! Error classification
//!
//! Maps server and transport failures onto a fixed set of user-facing
//! messages, plus an advisory severity used only for logging.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response from the server
    Network,
    InvalidCredentials,
    AccountLocked,
    AccountDeactivated,
    EmailExists,
    RateLimited,
    Unexpected,
}

impl ErrorKind {
    /// Classify a raw server `detail` (or transport) message.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Invalid email or password") {
            ErrorKind::InvalidCredentials
        } else if message.contains("Account is temporarily locked") {
            ErrorKind::AccountLocked
        } else if message.contains("Account is deactivated") {
            ErrorKind::AccountDeactivated
        } else if message.contains("email already exists") {
            ErrorKind::EmailExists
        } else if message.contains("Too many") {
            ErrorKind::RateLimited
        } else {
            ErrorKind::Unexpected
        }
    }

    /// Status codes the auth API uses when the body carries no detail.
    fn from_status(status: u16) -> Self {
        match status {
            409 => ErrorKind::EmailExists,
            423 => ErrorKind::AccountLocked,
            429 => ErrorKind::RateLimited,
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Unable to connect to the server. Please check your internet connection."
            }
            ErrorKind::InvalidCredentials => "Invalid email or password. Please try again.",
            ErrorKind::AccountLocked => {
                "Account is temporarily locked due to multiple failed attempts. Please try again later."
            }
            ErrorKind::AccountDeactivated => {
                "Your account has been deactivated. Please contact support."
            }
            ErrorKind::EmailExists => {
                "An account with this email already exists. Please sign in instead."
            }
            ErrorKind::RateLimited => "Too many attempts. Please wait a moment before trying again.",
            ErrorKind::Unexpected => "An unexpected error occurred. Please try again.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::AccountLocked => "account_locked",
            ErrorKind::AccountDeactivated => "account_deactivated",
            ErrorKind::EmailExists => "email_exists",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_message(message: &str) -> Self {
        if message.contains("Internal server error") {
            Severity::Critical
        } else if message.contains("Account is deactivated")
            || message.contains("Authentication required")
        {
            Severity::High
        } else if message.contains("Invalid email or password")
            || message.contains("Account is temporarily locked")
        {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether raw error text may be rendered as-is.
///
/// Internal server failures and anything mentioning tokens or the database
/// are technical detail and must stay out of the UI.
pub fn should_show_to_user(raw: &str) -> bool {
    if raw.contains("Internal server error") {
        return false;
    }

    !(raw.contains("JWT") || raw.contains("Token") || raw.contains("Database"))
}

/// Transport failures are worth another attempt; anything the server
/// actually answered is not.
pub fn is_retryable(error: &AuthError) -> bool {
    matches!(error, AuthError::Network(_) | AuthError::Timeout)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// User-safe message, always one of the fixed strings
    pub message: String,
    /// Original error text, for logs
    pub raw: String,
    /// HTTP status when the server answered
    pub status: Option<u16>,
}

impl ClassifiedError {
    pub fn from_auth_error(error: &AuthError) -> Self {
        match error {
            AuthError::Classified(c) => c.clone(),
            AuthError::Network(_) | AuthError::Timeout => {
                Self::build(ErrorKind::Network, error.to_string(), None)
            }
            AuthError::Rejected { status, detail } => {
                let kind = match ErrorKind::from_message(detail) {
                    ErrorKind::Unexpected => ErrorKind::from_status(*status),
                    kind => kind,
                };
                Self::build(kind, detail.clone(), Some(*status))
            }
            other => Self::build(ErrorKind::Unexpected, other.to_string(), None),
        }
    }

    fn build(kind: ErrorKind, raw: String, status: Option<u16>) -> Self {
        Self {
            kind,
            severity: Severity::from_message(&raw),
            message: kind.user_message().to_string(),
            raw,
            status,
        }
    }

    /// The raw text, when it is safe to render.
    pub fn displayable_raw(&self) -> Option<&str> {
        should_show_to_user(&self.raw).then_some(self.raw.as_str())
    }

    /// The user message followed by kind-specific tips.
    pub fn friendly_message(&self) -> String {
        match self.kind {
            ErrorKind::InvalidCredentials => format!(
                "{}\n\nTips:\n• Check your email spelling\n• Ensure caps lock is off\n• Try resetting your password if you've forgotten it",
                self.message
            ),
            ErrorKind::AccountLocked => format!(
                "{}\n\nFor security, accounts are temporarily locked after multiple failed attempts. This helps protect your account from unauthorized access.",
                self.message
            ),
            ErrorKind::Network => format!(
                "{}\n\nPlease check:\n• Your internet connection\n• Try refreshing the page\n• Contact support if the problem persists",
                self.message
            ),
            _ => self.message.clone(),
        }
    }

    /// Emit at a level matching the severity.
    pub fn log(&self, operation: &str) {
        match self.severity {
            Severity::Critical => tracing::error!(
                operation,
                kind = %self.kind,
                severity = %self.severity,
                status = ?self.status,
                raw = %self.raw,
                "Auth request failed"
            ),
            Severity::High | Severity::Medium => tracing::warn!(
                operation,
                kind = %self.kind,
                severity = %self.severity,
                status = ?self.status,
                raw = %self.raw,
                "Auth request failed"
            ),
            Severity::Low => tracing::info!(
                operation,
                kind = %self.kind,
                severity = %self.severity,
                status = ?self.status,
                raw = %self.raw,
                "Auth request failed"
            ),
        }
    }
}
