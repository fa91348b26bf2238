//! CLI entry point for kwsession.

mod cli;

use clap::Parser;
use kwsession::config::{
    load_config, override_base_url, resolve_store_path, Config, StoreBackendKind,
};
use kwsession::error::SessionError;
use kwsession::gateway::{ApiBody, Gateway};
use kwsession::session::{SessionContext, SessionManager};
use kwsession::signin::SignInForm;
use kwsession::store::{CredentialStore, FileBackend};
use reqwest::Method;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "KWSESSION_LOG";

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(base_url) = &args.base_url {
        if let Err(e) = override_base_url(&mut config, base_url) {
            eprintln!("error: --base-url: {e}");
            std::process::exit(1);
        }
    }

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let session = SessionManager::new(&config.api, store).into_context();

    let code = match args.command {
        cli::Command::Login { user } => run_login(&session, user).await,
        cli::Command::Status => run_status(&session),
        cli::Command::Whoami => run_whoami(&session),
        cli::Command::Logout => {
            session.logout();
            println!("Signed out.");
            0
        }
        cli::Command::Request { method, path, body } => {
            run_request(session, &method, &path, body.as_deref()).await
        }
    };
    std::process::exit(code);
}

fn open_store(config: &Config) -> Result<CredentialStore, String> {
    match config.store.backend {
        StoreBackendKind::Memory => Ok(CredentialStore::in_memory()),
        StoreBackendKind::File => {
            let path = resolve_store_path(&config.store).ok_or_else(|| {
                "cannot determine a credential file location; set store.path or KW_STORE_PATH"
                    .to_string()
            })?;
            Ok(CredentialStore::new(Arc::new(FileBackend::new(path))))
        }
    }
}

async fn run_login(session: &SessionContext, user: Option<String>) -> i32 {
    let identifier = match user {
        Some(user) => user,
        None => match prompt_line("Username or email: ") {
            Ok(line) => line,
            Err(e) => {
                eprintln!("error: failed to read username: {e}");
                return 1;
            }
        },
    };
    let pin = match rpassword::prompt_password("PIN: ") {
        Ok(pin) => pin,
        Err(e) => {
            eprintln!("error: failed to read PIN: {e}");
            return 1;
        }
    };

    match SignInForm::new(identifier, &pin).submit(session).await {
        Ok(_) => {
            let who = session
                .claims()
                .and_then(|claims| claims.username)
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Signed in as {who}.");
            0
        }
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}

fn run_status(session: &SessionManager) -> i32 {
    if !session.is_session_active() {
        println!("No active session.");
        return 1;
    }
    match session.ms_until_expiry() {
        Some(ms) => println!("Session active; expires in {}s.", ms / 1000),
        None => println!("Session active; no expiry recorded."),
    }
    0
}

fn run_whoami(session: &SessionManager) -> i32 {
    if !session.is_session_active() {
        eprintln!("No active session.");
        return 1;
    }
    let Some(claims) = session.claims() else {
        eprintln!("Identity token could not be decoded.");
        return 1;
    };
    println!("username: {}", claims.username.as_deref().unwrap_or("-"));
    println!("subject:  {}", claims.subject.as_deref().unwrap_or("-"));
    let roles: Vec<&str> = claims.roles.iter().map(String::as_str).collect();
    println!(
        "roles:    {}",
        if roles.is_empty() {
            "-".to_string()
        } else {
            roles.join(", ")
        }
    );
    0
}

async fn run_request(session: SessionContext, method: &str, path: &str, body: Option<&str>) -> i32 {
    let method = match Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(_) => {
            eprintln!("error: invalid HTTP method `{method}`");
            return 2;
        }
    };
    let body: Option<Value> = match body.map(serde_json::from_str).transpose() {
        Ok(body) => body,
        Err(e) => {
            eprintln!("error: --body is not valid JSON: {e}");
            return 2;
        }
    };

    let gateway = Gateway::new(session);
    match gateway.request(method, path, body.as_ref()).await {
        Ok(ApiBody::Json(value)) => {
            match serde_json::to_string_pretty(&value) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{value}"),
            }
            0
        }
        Ok(ApiBody::Text(text)) => {
            if !text.is_empty() {
                println!("{text}");
            }
            0
        }
        Err(e) => report_request_error(&e),
    }
}

fn report_request_error(err: &SessionError) -> i32 {
    if err.ends_session() {
        eprintln!("{err}");
        eprintln!("Run `kwsession login` to sign in again.");
        return 1;
    }
    match err.status_code() {
        Some(status) => eprintln!("error ({status}): {err}"),
        None => eprintln!("error: {err}"),
    }
    1
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
