//! CLI command handlers
//!
//! Each handler maps one subcommand onto the session manager and returns a
//! `CommandResult` envelope, printed as JSON on stdout.

pub mod api;
pub mod auth;

use serde::Serialize;
use studyai_core::App;

use crate::cli::Commands;
use crate::Result;

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T: Serialize> CommandResult<T> {
    /// Print as pretty JSON; returns whether the command succeeded.
    pub fn emit(&self) -> Result<bool> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(self.success)
    }
}

pub async fn execute(app: &App, command: Commands) -> Result<bool> {
    match command {
        Commands::Login {
            email,
            password,
            remember_me,
        } => auth::login(app, email, password, remember_me).await.emit(),
        Commands::Signup {
            name,
            email,
            password,
            role,
            current_class,
            school_name,
        } => auth::signup(
            app,
            studyai_core::SignupData {
                name,
                email,
                password,
                role,
                current_class,
                school_name,
            },
        )
        .await
        .emit(),
        Commands::Logout => auth::logout(app).await.emit(),
        Commands::Refresh => auth::refresh(app).await.emit(),
        Commands::Whoami => auth::whoami(app).emit(),
        Commands::Status => auth::status(app).emit(),
        Commands::ForgetEmail => auth::forget_email(app).emit(),
        Commands::Call {
            endpoint,
            method,
            body,
            headers,
        } => api::call(app, &endpoint, method, body, &headers).await.emit(),
        Commands::Config => CommandResult::ok(app.config().clone()).emit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(CommandResult::ok(json!({"id": "42"}))).unwrap();
        assert_eq!(ok, json!({"success": true, "data": {"id": "42"}, "error": null}));

        let err = serde_json::to_value(CommandResult::<()>::err("Not signed in".into())).unwrap();
        assert_eq!(
            err,
            json!({"success": false, "data": null, "error": "Not signed in"})
        );
    }
}
