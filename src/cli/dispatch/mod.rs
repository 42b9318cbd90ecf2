//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, auth};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or the domain is empty.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let domain = required(matches, auth::ARG_DOMAIN)?;
    if domain.trim().is_empty() {
        bail!("--domain must not be empty");
    }

    Ok(Action::Server(Args {
        port,
        domain,
        jwt_secret: SecretString::from(required(matches, auth::ARG_JWT_SECRET)?),
        username: required(matches, auth::ARG_USERNAME)?,
        password: SecretString::from(required(matches, auth::ARG_PASSWORD)?),
        token_endpoint: required(matches, auth::ARG_TOKEN_ENDPOINT)?,
    }))
}
