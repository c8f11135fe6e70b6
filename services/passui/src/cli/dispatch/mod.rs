use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3001);
    let https_port = matches
        .get_one::<u16>("https-port")
        .copied()
        .unwrap_or(3443);

    let thunder_api = matches
        .get_one::<String>("thunder-api")
        .cloned()
        .context("missing required argument: --thunder-api")?;

    let config = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .context("missing required argument: --config")?;

    let domain = matches.get_one::<String>("domain").cloned();
    let ssl_cert = matches.get_one::<String>("ssl-cert").map(PathBuf::from);
    let ssl_key = matches.get_one::<String>("ssl-key").map(PathBuf::from);

    let assets = matches
        .get_one::<String>("assets")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("frontend"));

    Ok(Action::Server(Args {
        port,
        https_port,
        thunder_api,
        config,
        domain,
        ssl_cert,
        ssl_key,
        assets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_server_args() {
        temp_env::with_vars(
            [
                ("PORT", None::<&str>),
                ("HTTPS_PORT", None),
                ("THUNDER_API", None),
                ("SILVER_CONFIG", None),
                ("DOMAIN", None),
                ("SSL_CERT", None),
                ("SSL_KEY", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "passui",
                    "--domain",
                    "example.com",
                    "--thunder-api",
                    "https://thunder.local:8090",
                ]);

                let Action::Server(args) = handler(&matches).expect("handler failed");
                assert_eq!(args.port, 3001);
                assert_eq!(args.https_port, 3443);
                assert_eq!(args.thunder_api, "https://thunder.local:8090");
                assert_eq!(args.domain.as_deref(), Some("example.com"));
                assert_eq!(args.config, PathBuf::from("/etc/silver/silver.yaml"));
                assert!(args.ssl_cert.is_none());
                assert!(args.ssl_key.is_none());
                assert_eq!(args.assets, PathBuf::from("frontend"));
            },
        );
    }
}
