pub mod logging;
pub mod provider;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_ALLOWED_DOMAIN: &str = "allowed-domain";
pub const ARG_SERVE_PATH: &str = "serve-path";
pub const ARG_PUBLIC: &str = "public";
pub const ARG_DEBUG_SESSION_INFO: &str = "debug-session-info";

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

    let command = Command::new("staticgate")
        .about("Static assets behind an OAuth login")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("STATICGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public URL of this server, the provider redirects to <base-url>/callback")
                .env("STATICGATE_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_ALLOWED_DOMAIN)
                .long(ARG_ALLOWED_DOMAIN)
                .help("Organizational domain users must belong to, example: example.com")
                .env("STATICGATE_ALLOWED_DOMAIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SERVE_PATH)
                .long(ARG_SERVE_PATH)
                .help("Directory with the static assets to serve")
                .env("STATICGATE_SERVE_PATH")
                .default_value("/var/www")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new(ARG_PUBLIC)
                .long(ARG_PUBLIC)
                .help("Serve assets without requiring a login")
                .env("STATICGATE_PUBLIC")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_DEBUG_SESSION_INFO)
                .long(ARG_DEBUG_SESSION_INFO)
                .help("Expose /debug-session-info (behind the login) with the decoded session")
                .env("STATICGATE_DEBUG_SESSION_INFO")
                .action(ArgAction::SetTrue),
        );

    let command = provider::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}
