//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Sign in to the KwaWicks API and make authenticated calls.
#[derive(Debug, Parser)]
#[command(
    name = "kwsession",
    version,
    long_version = kwsession::build_info::LONG_VERSION,
    after_help = kwsession::build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Path to config file (default: ./kwsession.toml or ~/.config/kwsession/kwsession.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with a username or email and a six-digit PIN.
    Login {
        /// Username or email; prompted for when omitted.
        #[arg(short = 'u', long = "user")]
        user: Option<String>,
    },
    /// Show whether a session is active and when it expires.
    Status,
    /// Print identity claims from the stored session.
    Whoami,
    /// Clear the stored session.
    Logout,
    /// Send an authenticated request and print the response body.
    Request {
        /// HTTP method (GET, POST, PUT, DELETE).
        method: String,
        /// API path, e.g. /api/Clients?limit=100.
        path: String,
        /// JSON request body.
        #[arg(long = "body")]
        body: Option<String>,
    },
}
