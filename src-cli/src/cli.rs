//! Command-line arguments

use clap::{Parser, Subcommand};

use studyai_core::{Method, Role};

#[derive(Parser, Debug)]
#[command(name = "studyai", version, about = "StudyAI session client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session after this process exits
        #[arg(long)]
        remember_me: bool,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "student")]
        role: Role,
        #[arg(long = "class")]
        current_class: Option<u32>,
        #[arg(long = "school")]
        school_name: Option<String>,
    },
    /// End the session
    Logout,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Show the signed-in user
    Whoami,
    /// Show session state
    Status,
    /// Call an API endpoint with the session's token
    Call {
        /// Path such as /api/records
        endpoint: String,
        #[arg(long, short = 'X', default_value = "GET")]
        method: Method,
        /// Request body, sent as-is
        #[arg(long, short = 'd')]
        body: Option<String>,
        /// Extra header as "Name: value"; repeatable
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },
    /// Forget the email remembered from an earlier login
    ForgetEmail,
    /// Print the effective configuration
    Config,
}
