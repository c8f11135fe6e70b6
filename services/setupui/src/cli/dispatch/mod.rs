use crate::cli::actions::{Action, server::Args};
use anyhow::Result;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3001);
    let mail_domain = matches.get_one::<String>("mail-domain").cloned();

    let scripts_dir = matches
        .get_one::<String>("scripts-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".."));

    let state_dir = matches
        .get_one::<String>("state-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".."));

    let assets = matches
        .get_one::<String>("assets")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("public"));

    Ok(Action::Server(Args {
        port,
        mail_domain,
        scripts_dir,
        state_dir,
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
                ("HTTP_PORT", None::<&str>),
                ("MAIL_DOMAIN", None),
                ("SETUPUI_SCRIPTS_DIR", None),
                ("SETUPUI_STATE_DIR", None),
                ("SETUPUI_ASSETS", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "setupui",
                    "--scripts-dir",
                    "/opt/silver",
                    "--mail-domain",
                    "example.com",
                ]);

                let Action::Server(args) = handler(&matches).expect("handler failed");
                assert_eq!(args.port, 3001);
                assert_eq!(args.mail_domain.as_deref(), Some("example.com"));
                assert_eq!(args.scripts_dir, PathBuf::from("/opt/silver"));
                assert_eq!(args.state_dir, PathBuf::from(".."));
                assert_eq!(args.assets, PathBuf::from("public"));
            },
        );
    }
}
