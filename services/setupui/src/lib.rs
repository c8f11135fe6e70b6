//! # setupui (Setup UI Server)
//!
//! `setupui` is the thin HTTP front-end for first-time Silver Mail
//! provisioning. It serves the setup UI and drives the provisioning shell
//! scripts (`init.sh` for the initial installation, `add_user.sh` for new
//! mailboxes), feeding each script the interactive answers over stdin and
//! relaying stdout/stderr and the exit code back to the browser.
//!
//! The scripts are external collaborators: this service never provisions
//! anything itself, it only supervises a child process per request and maps
//! the outcome to an HTTP response (non-zero exit -> 500, timeout -> 408).

pub mod api;
pub mod cli;
pub mod provision;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
