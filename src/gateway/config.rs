//! Immutable gateway configuration, built once at startup.

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://tokens.indieauth.com/token";

/// The single operator's login.
#[derive(Clone, Debug)]
pub struct OwnerCredentials {
    username: String,
    password: SecretString,
}

impl OwnerCredentials {
    #[must_use]
    pub fn new(username: String, password: SecretString) -> Self {
        Self { username, password }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Plain equality on both fields, no hashing and no constant-time compare.
    #[must_use]
    pub fn matches(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password.expose_secret()
    }
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    domain: String,
    jwt_secret: SecretString,
    owner: OwnerCredentials,
    token_endpoint: String,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(domain: String, jwt_secret: SecretString, owner: OwnerCredentials) -> Self {
        Self {
            domain,
            jwt_secret,
            owner,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, token_endpoint: String) -> Self {
        self.token_endpoint = token_endpoint;
        self
    }

    /// Hostname that IndieAuth `me` URLs must match.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    #[must_use]
    pub fn owner(&self) -> &OwnerCredentials {
        &self.owner
    }

    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}
