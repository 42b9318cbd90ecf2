use crate::gateway::{
    self, GatewayConfig, GatewayState, LoginPage, OwnerCredentials, RemoteTokenVerifier,
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub domain: String,
    pub jwt_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    pub token_endpoint: String,
}

impl Args {
    #[must_use]
    pub fn gateway_config(self) -> GatewayConfig {
        let owner = OwnerCredentials::new(self.username, self.password);
        GatewayConfig::new(self.domain, self.jwt_secret, owner)
            .with_token_endpoint(self.token_endpoint)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token endpoint is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let config = args.gateway_config();

    let verifier = RemoteTokenVerifier::new(config.token_endpoint())?;
    debug!(
        domain = config.domain(),
        token_endpoint = %verifier.endpoint(),
        "gateway configured"
    );

    let state = GatewayState::new(config, Arc::new(LoginPage), Arc::new(verifier));

    gateway::new(port, Arc::new(state)).await
}
