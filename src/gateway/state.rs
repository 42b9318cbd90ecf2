use std::sync::Arc;

use super::{
    config::GatewayConfig, render::ChallengeRenderer, token::TokenIssuer, verifier::TokenVerifier,
};

/// Everything the gateway middleware reads while serving. Built once, never mutated.
pub struct GatewayState {
    config: GatewayConfig,
    issuer: TokenIssuer,
    renderer: Arc<dyn ChallengeRenderer>,
    verifier: Arc<dyn TokenVerifier>,
}

impl GatewayState {
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        renderer: Arc<dyn ChallengeRenderer>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let issuer = TokenIssuer::new(config.jwt_secret());
        Self {
            config,
            issuer,
            renderer,
            verifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn renderer(&self) -> &dyn ChallengeRenderer {
        self.renderer.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &dyn TokenVerifier {
        self.verifier.as_ref()
    }
}
