use crate::{
    api::{self, handlers::status::StatusConfig},
    provision::Provisioner,
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub mail_domain: Option<String>,
    pub scripts_dir: PathBuf,
    pub state_dir: PathBuf,
    pub assets: PathBuf,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let provisioner = Arc::new(Provisioner::new(args.scripts_dir));
    let status = Arc::new(StatusConfig::new(args.state_dir, args.mail_domain));

    api::new(api::ServerOptions {
        port: args.port,
        assets: args.assets,
        provisioner,
        status,
    })
    .await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("port", args.port.to_string()),
        (
            "mail_domain",
            args.mail_domain.clone().unwrap_or_else(|| "n/a".to_string()),
        ),
        ("scripts_dir", args.scripts_dir.display().to_string()),
        ("state_dir", args.state_dir.display().to_string()),
        ("assets", args.assets.display().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "setupui {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
