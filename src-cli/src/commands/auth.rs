//! Session commands
use serde::Serialize;
use studyai_core::{App, AuthError, Identity, LoginCredentials, SignupData};

use super::CommandResult;

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub expiring_soon: bool,
    pub remember_me: bool,
    pub remembered_email: Option<String>,
    pub user: Option<Identity>,
}

/// Login/signup failures carry tips for the user; anything else prints as-is.
fn user_message(error: &AuthError) -> String {
    error
        .classified()
        .map(|c| c.friendly_message())
        .unwrap_or_else(|| error.to_string())
}

pub async fn login(
    app: &App,
    email: String,
    password: String,
    remember_me: bool,
) -> CommandResult<Identity> {
    let credentials = LoginCredentials::new(email, password).remember_me(remember_me);

    match app.session_manager().login(credentials).await {
        Ok(identity) => CommandResult::ok(identity),
        Err(e) => CommandResult::err(user_message(&e)),
    }
}

pub async fn signup(app: &App, data: SignupData) -> CommandResult<Identity> {
    match app.session_manager().signup(data).await {
        Ok(identity) => CommandResult::ok(identity),
        Err(e) => CommandResult::err(user_message(&e)),
    }
}

pub async fn logout(app: &App) -> CommandResult<SessionStatus> {
    app.session_manager().logout().await;
    CommandResult::ok(status_of(app))
}

pub async fn refresh(app: &App) -> CommandResult<SessionStatus> {
    match app.session_manager().refresh_access_token().await {
        Some(_) => CommandResult::ok(status_of(app)),
        None => CommandResult::err("No active session. Please sign in again.".to_string()),
    }
}

pub fn whoami(app: &App) -> CommandResult<Identity> {
    match app.session_manager().current_user() {
        Some(identity) => CommandResult::ok(identity),
        None => CommandResult::err("Not signed in".to_string()),
    }
}

pub fn status(app: &App) -> CommandResult<SessionStatus> {
    CommandResult::ok(status_of(app))
}

pub fn forget_email(app: &App) -> CommandResult<()> {
    match app.session_manager().clear_remembered_email() {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

fn status_of(app: &App) -> SessionStatus {
    let manager = app.session_manager();

    SessionStatus {
        authenticated: manager.is_authenticated(),
        expiring_soon: manager.is_token_expiring_soon(),
        remember_me: manager.is_remember_me_enabled(),
        remembered_email: manager.remembered_email(),
        user: manager.current_user(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{token_body, ScriptedTransport, TestApp};

    #[tokio::test]
    async fn test_login_then_status() {
        let transport = ScriptedTransport::new(vec![("/api/auth/login", 200, token_body())]);
        let test = TestApp::new(transport.clone());

        let result = login(&test.app, "asha@example.com".into(), "pw".into(), true).await;
        assert!(result.success);
        assert_eq!(result.data.unwrap().name, "Asha Verma");

        let status = status(&test.app).data.unwrap();
        assert!(status.authenticated);
        assert!(!status.expiring_soon);
        assert!(status.remember_me);
        assert_eq!(status.remembered_email.as_deref(), Some("asha@example.com"));
        assert_eq!(status.user.unwrap().current_class, Some(10));
    }

    #[tokio::test]
    async fn test_bad_credentials_show_tips() {
        let transport = ScriptedTransport::new(vec![(
            "/api/auth/login",
            401,
            r#"{"detail":"Invalid email or password"}"#.to_string(),
        )]);
        let test = TestApp::new(transport);

        let result = login(&test.app, "asha@example.com".into(), "wrong".into(), false).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("Invalid email or password. Please try again."));
        assert!(error.contains("Tips:"));
        assert!(!whoami(&test.app).success);
    }

    #[tokio::test]
    async fn test_logout_reports_empty_session() {
        let transport = ScriptedTransport::new(vec![
            ("/api/auth/login", 200, token_body()),
            ("/api/auth/logout", 200, "{}".to_string()),
        ]);
        let test = TestApp::new(transport.clone());
        login(&test.app, "asha@example.com".into(), "pw".into(), true).await;

        let status = logout(&test.app).await.data.unwrap();

        assert_eq!(transport.calls_to("/api/auth/logout"), 1);
        assert!(!status.authenticated);
        assert!(status.user.is_none());
        assert_eq!(status.remembered_email.as_deref(), Some("asha@example.com"));

        assert!(forget_email(&test.app).success);
        assert!(status_of(&test.app).remembered_email.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_session_fails() {
        let transport = ScriptedTransport::new(Vec::new());
        let test = TestApp::new(transport.clone());

        let result = refresh(&test.app).await;

        assert!(!result.success);
        assert_eq!(transport.calls_to("/api/auth/refresh"), 0);
    }
}
