//! # passui (Password Change UI Server)
//!
//! `passui` is the thin HTTP front-end for the Silver Mail password-change
//! workflow. It serves the static password-change UI, proxies the browser's
//! API calls to the external Thunder identity service (so the UI never hits
//! CORS), and keeps the mail store's `password_initialized` flag in sync when
//! a user rotates an admin-assigned password.
//!
//! ## Serving modes
//!
//! On startup the service resolves the mail domain (flag, then the Silver
//! config file, then `localhost`) and looks for a usable TLS certificate pair
//! (explicit paths, then `/etc/letsencrypt/live/<domain>/`, then any live
//! certificate directory, then `/certs`). With a pair in hand it serves HTTPS
//! and answers plain HTTP with a permanent redirect; without one it falls back
//! to plain HTTP.
//!
//! The identity API and the mail store stay external: Thunder is reached over
//! HTTP and the user database only through shell invocation.

pub mod api;
pub mod cli;
pub mod config;
pub mod thunder;
pub mod tls;
pub mod userdb;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
