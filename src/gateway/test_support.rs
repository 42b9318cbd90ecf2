//! Shared fixtures for gateway unit tests.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

use super::{
    config::{GatewayConfig, OwnerCredentials},
    render::LoginPage,
    state::GatewayState,
    verifier::{TokenClaims, TokenVerifier, VerifyError},
};

pub const TEST_DOMAIN: &str = "blog.example";
pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "correct horse";

/// Verifier that answers from a fixed table and records the tokens it saw.
#[derive(Default)]
pub struct FakeVerifier {
    grants: Vec<(String, TokenClaims)>,
    seen: Mutex<Vec<String>>,
}

impl FakeVerifier {
    #[must_use]
    pub fn granting(token: &str, me: &str, scope: &[&str]) -> Self {
        Self::default().with_grant(token, me, scope)
    }

    #[must_use]
    pub fn with_grant(mut self, token: &str, me: &str, scope: &[&str]) -> Self {
        self.grants.push((
            token.to_string(),
            TokenClaims {
                me: me.to_string(),
                client_id: Some("https://client.example/".to_string()),
                scope: scope.iter().map(ToString::to_string).collect(),
            },
        ));
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(token.to_string());
        }
        self.grants
            .iter()
            .find(|(granted, _)| granted == token)
            .map(|(_, claims)| claims.clone())
            .ok_or_else(|| VerifyError::Rejected("invalid_token: unknown token".to_string()))
    }
}

pub fn gateway_config(secret: &str) -> GatewayConfig {
    GatewayConfig::new(
        TEST_DOMAIN.to_string(),
        SecretString::from(secret.to_string()),
        OwnerCredentials::new(
            TEST_USERNAME.to_string(),
            SecretString::from(TEST_PASSWORD.to_string()),
        ),
    )
}

pub fn gateway_state() -> Arc<GatewayState> {
    gateway_state_with(gateway_config("test-secret"), Arc::new(FakeVerifier::default()))
}

pub fn gateway_state_with(
    config: GatewayConfig,
    verifier: Arc<dyn TokenVerifier>,
) -> Arc<GatewayState> {
    Arc::new(GatewayState::new(config, Arc::new(LoginPage), verifier))
}

/// Pull the `value` of a named input out of the rendered login page.
pub fn field_value(html: &str, name: &str) -> Option<String> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}
