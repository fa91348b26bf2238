//! kwsession — session and credential lifecycle for the KwaWicks dashboard API.
//!
//! The crate persists a token set, decides whether a usable session exists,
//! runs the login and refresh protocols, and wraps business API calls with
//! bearer attachment and a single refresh-and-retry on `401`.
//!
//! # Quick start
//!
//! ```no_run
//! use kwsession::config::load_config;
//! use kwsession::gateway::Gateway;
//! use kwsession::session::SessionManager;
//! use kwsession::store::CredentialStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let session = SessionManager::new(&config.api, CredentialStore::in_memory()).into_context();
//! let grant = session.login("dispatcher@kwawicks.test", "123456").await?;
//! session.establish(&grant)?;
//!
//! let gateway = Gateway::new(session.clone());
//! let clients = gateway.get("/api/Clients?limit=100").await?;
//! println!("{clients:?}");
//! # Ok(())
//! # }
//! ```

pub mod build_info;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;
pub mod gateway;
pub mod guard;
mod http;
pub mod session;
pub mod signin;
pub mod store;
#[cfg(test)]
pub mod testsupport;
