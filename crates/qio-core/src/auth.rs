//! Access-token providers for the workspace REST client.

use std::fmt;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};

/// Environment variable read by [`EnvTokenProvider::azure_quantum`].
pub const AZURE_QUANTUM_TOKEN_VAR: &str = "AZURE_QUANTUM_TOKEN";

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid access token.
    async fn get_token(&self) -> CoreResult<String>;

    /// Check if authentication is available.
    fn has_valid_token(&self) -> bool;
}

/// Environment variable token provider.
///
/// Simple provider that reads the token from an environment variable on
/// every request, so a token refreshed by an external tool is picked up.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    env_var: String,
}

impl EnvTokenProvider {
    /// Create a new environment variable token provider.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    /// Create provider for `AZURE_QUANTUM_TOKEN`.
    pub fn azure_quantum() -> Self {
        Self::new(AZURE_QUANTUM_TOKEN_VAR)
    }

    /// Name of the variable this provider reads.
    pub fn env_var(&self) -> &str {
        &self.env_var
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self) -> CoreResult<String> {
        match std::env::var(&self.env_var) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(CoreError::Auth(format!(
                "Environment variable {} not set",
                self.env_var
            ))),
        }
    }

    fn has_valid_token(&self) -> bool {
        std::env::var(&self.env_var).is_ok_and(|token| !token.is_empty())
    }
}

/// Fixed token supplied by the caller.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> CoreResult<String> {
        Ok(self.token.clone())
    }

    fn has_valid_token(&self) -> bool {
        !self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env_token_provider() {
        // SAFETY: Test-only, single-threaded test context
        unsafe {
            std::env::set_var("QIO_TEST_TOKEN_VAR_48213", "tok-123");
        }

        let provider = EnvTokenProvider::new("QIO_TEST_TOKEN_VAR_48213");
        assert!(provider.has_valid_token());
        assert_eq!(provider.get_token().await.unwrap(), "tok-123");

        let missing = EnvTokenProvider::new("QIO_NONEXISTENT_VAR_48213");
        assert!(!missing.has_valid_token());
        assert!(matches!(missing.get_token().await, Err(CoreError::Auth(_))));

        // SAFETY: Cleaning up test variable
        unsafe {
            std::env::remove_var("QIO_TEST_TOKEN_VAR_48213");
        }
    }

    #[tokio::test]
    async fn test_static_token_provider_redacts() {
        let provider = StaticTokenProvider::new("super-secret");
        assert_eq!(provider.get_token().await.unwrap(), "super-secret");
        assert!(!format!("{provider:?}").contains("super-secret"));
    }
}
