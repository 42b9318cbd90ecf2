//! # Vestibule (login challenge/replay and IndieAuth gateway)
//!
//! `vestibule` decides whether an inbound request may reach the protected
//! parts of a single-operator publishing site.
//!
//! ## Browser access (challenge and replay)
//!
//! A request without a valid `token` cookie is not rejected outright. The
//! credential gate captures its method, headers and body, base64-encodes them
//! into hidden fields of a login form and answers `401`. When the operator
//! submits that form, the login processor rebuilds the original request,
//! checks the credentials, mints a session token on success and replays the
//! request downstream as if it had always carried the cookie. Nothing about
//! the pending login is stored on the server; the browser carries it.
//!
//! ## API access (IndieAuth bearer tokens)
//!
//! Non-browser clients present a bearer token which is checked against a
//! remote IndieAuth token endpoint. The token's `me` URL must be on this
//! server's domain, and the granted scope is attached to the request as a
//! [`gateway::GrantedScope`] extension for downstream authorization.

pub mod cli;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
