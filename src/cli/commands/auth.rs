use clap::{Arg, Command};

use crate::gateway::config::{DEFAULT_TOKEN_ENDPOINT, DEFAULT_USERNAME};

pub const ARG_DOMAIN: &str = "domain";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_TOKEN_ENDPOINT: &str = "token-endpoint";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_indieauth_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens")
                .env("VESTIBULE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_USERNAME)
                .long(ARG_USERNAME)
                .help("Owner login name")
                .env("VESTIBULE_USERNAME")
                .default_value(DEFAULT_USERNAME),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Owner password")
                .env("VESTIBULE_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

fn with_indieauth_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DOMAIN)
                .short('d')
                .long(ARG_DOMAIN)
                .help("Public hostname of this server, IndieAuth identities must match it")
                .env("VESTIBULE_DOMAIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_ENDPOINT)
                .long(ARG_TOKEN_ENDPOINT)
                .help("IndieAuth token endpoint used to verify bearer tokens")
                .env("VESTIBULE_TOKEN_ENDPOINT")
                .default_value(DEFAULT_TOKEN_ENDPOINT),
        )
}
