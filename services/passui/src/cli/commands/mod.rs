pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("passui")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("HTTP port to listen on (redirects when HTTPS is enabled)")
                .default_value("3001")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("https-port")
                .long("https-port")
                .help("HTTPS port to listen on when certificates are available")
                .default_value("3443")
                .env("HTTPS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("thunder-api")
                .long("thunder-api")
                .help("Base URL of the Thunder identity API")
                .default_value("https://localhost:8090")
                .env("THUNDER_API"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Silver configuration file used for domain discovery")
                .default_value("/etc/silver/silver.yaml")
                .env("SILVER_CONFIG"),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .help("Mail domain (default: first domain from the Silver configuration)")
                .env("DOMAIN"),
        )
        .arg(
            Arg::new("ssl-cert")
                .long("ssl-cert")
                .help("Path to the TLS certificate chain (PEM); discovered when unset")
                .env("SSL_CERT")
                .requires("ssl-key"),
        )
        .arg(
            Arg::new("ssl-key")
                .long("ssl-key")
                .help("Path to the TLS private key (PEM); discovered when unset")
                .env("SSL_KEY")
                .requires("ssl-cert"),
        )
        .arg(
            Arg::new("assets")
                .long("assets")
                .help("Directory holding the password change UI static assets")
                .default_value("frontend")
                .env("PASSUI_ASSETS"),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "passui");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("PORT", None::<&str>),
                ("HTTPS_PORT", None),
                ("THUNDER_API", None),
                ("SILVER_CONFIG", None),
                ("DOMAIN", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["passui"]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(3001));
                assert_eq!(matches.get_one::<u16>("https-port").copied(), Some(3443));
                assert_eq!(
                    matches.get_one::<String>("thunder-api").cloned(),
                    Some("https://localhost:8090".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("config").cloned(),
                    Some("/etc/silver/silver.yaml".to_string())
                );
                assert_eq!(matches.get_one::<String>("domain"), None);
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PORT", Some("8081")),
                ("HTTPS_PORT", Some("8443")),
                ("THUNDER_API", Some("https://thunder.tld:8090")),
                ("SILVER_CONFIG", Some("/tmp/silver.yaml")),
                ("DOMAIN", Some("example.com")),
                ("SSL_CERT", Some("/tmp/fullchain.pem")),
                ("SSL_KEY", Some("/tmp/privkey.pem")),
                ("PASSUI_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["passui"]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8081));
                assert_eq!(matches.get_one::<u16>("https-port").copied(), Some(8443));
                assert_eq!(
                    matches.get_one::<String>("thunder-api").cloned(),
                    Some("https://thunder.tld:8090".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("domain").cloned(),
                    Some("example.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("ssl-cert").cloned(),
                    Some("/tmp/fullchain.pem".to_string())
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_ssl_cert_requires_key() {
        temp_env::with_vars([("SSL_CERT", None::<&str>), ("SSL_KEY", None)], || {
            let result = new().try_get_matches_from(vec![
                "passui",
                "--ssl-cert",
                "/tmp/fullchain.pem",
            ]);
            assert_eq!(
                result.map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("PASSUI_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["passui".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
