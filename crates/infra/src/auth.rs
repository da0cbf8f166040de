//! Access token providers
//!
//! Token acquisition (OAuth flows, service accounts, metadata servers) is
//! outside this crate. These providers hand an already-issued bearer token to
//! the transport.

use async_trait::async_trait;
use tabula_core::AccessTokenProvider;
use tabula_domain::{Result, TabulaError};
use tracing::debug;

/// Environment variable read by [`EnvTokenProvider::default`].
pub const ACCESS_TOKEN_ENV: &str = "TABULA_ACCESS_TOKEN";

/// Fixed token, e.g. from a secret store or a test.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call, so a token
/// refreshed by an outside process is picked up without a restart.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self { variable: variable.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

#[async_trait]
impl AccessTokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let token = std::env::var(&self.variable)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                TabulaError::Transport(format!("access token variable {} is not set", self.variable))
            })?;
        debug!(variable = %self.variable, "access token read from environment");
        Ok(token)
    }
}
