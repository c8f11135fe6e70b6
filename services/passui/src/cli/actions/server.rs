use crate::{api, config, thunder::ThunderClient, tls, userdb::UserStore};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub https_port: u16,
    pub thunder_api: String,
    pub config: PathBuf,
    pub domain: Option<String>,
    pub ssl_cert: Option<PathBuf>,
    pub ssl_key: Option<PathBuf>,
    pub assets: PathBuf,
}

/// Execute the server action.
/// # Errors
/// Returns an error if TLS material cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let domain = args
        .domain
        .clone()
        .or_else(|| config::domain_from_config(&args.config))
        .unwrap_or_else(|| "localhost".to_string());

    let roots = tls::DiscoveryRoots::default();
    let explicit = match (args.ssl_cert.clone(), args.ssl_key.clone()) {
        (Some(cert), Some(key)) => Some(tls::CertPaths::new(cert, key)),
        _ => None,
    };
    let cert_paths = tls::discover(&domain, explicit, &roots);

    log_startup_args(&args, &domain, cert_paths.as_ref());

    if cert_paths.is_none() {
        warn!(
            "TLS certificates not found for {domain}, serving plain HTTP on port {}",
            args.port
        );
    }

    let thunder = Arc::new(ThunderClient::new(&args.thunder_api)?);
    let store = Arc::new(UserStore::default());

    api::new(api::ServerOptions {
        port: args.port,
        https_port: args.https_port,
        assets: args.assets,
        cert_paths,
        thunder,
        store,
    })
    .await
}

fn log_startup_args(args: &Args, domain: &str, cert_paths: Option<&tls::CertPaths>) {
    let (cert, key) = cert_paths.map_or(("none".to_string(), "none".to_string()), |paths| {
        (
            paths.cert_path().display().to_string(),
            paths.key_path().display().to_string(),
        )
    });

    let entries = [
        ("http_port", args.port.to_string()),
        ("https_port", args.https_port.to_string()),
        ("thunder_api", args.thunder_api.clone()),
        ("config", args.config.display().to_string()),
        ("domain", domain.to_string()),
        ("ssl_cert", cert),
        ("ssl_key", key),
        ("assets", args.assets.display().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "passui {} - {}\n\nStartup configuration:",
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
