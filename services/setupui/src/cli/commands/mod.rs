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

    let command = Command::new("setupui")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("HTTP port to listen on")
                .default_value("3001")
                .env("HTTP_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("mail-domain")
                .long("mail-domain")
                .help("Mail domain reported by the status endpoint")
                .env("MAIL_DOMAIN"),
        )
        .arg(
            Arg::new("scripts-dir")
                .long("scripts-dir")
                .help("Directory holding init.sh and add_user.sh")
                .default_value("..")
                .env("SETUPUI_SCRIPTS_DIR"),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .help("Directory checked for the .env markers left by provisioning")
                .default_value("..")
                .env("SETUPUI_STATE_DIR"),
        )
        .arg(
            Arg::new("assets")
                .long("assets")
                .help("Directory holding the setup UI static assets")
                .default_value("public")
                .env("SETUPUI_ASSETS"),
        );

    logging::with_args(command)
}
