//! Credential acquisition for the remote runtime.

use crate::error::{AgentClientError, Result};
use async_trait::async_trait;

/// Supplies bearer tokens to runtime clients.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A fixed token, for tests and service principals with static keys.
#[derive(Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request, so rotated
/// tokens are picked up without rebuilding the client.
#[derive(Debug, Clone)]
pub struct EnvironmentCredential {
    var: String,
}

impl EnvironmentCredential {
    /// Variable read by [`EnvironmentCredential::default`].
    pub const DEFAULT_VAR: &'static str = "AGENT_RUNTIME_TOKEN";

    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvironmentCredential {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

#[async_trait]
impl CredentialProvider for EnvironmentCredential {
    async fn token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(AgentClientError::CredentialUnavailable(format!(
                "Environment variable: {}",
                self.var
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credential() {
        let credential = StaticCredential::new("secret");
        assert_eq!(credential.token().await.unwrap(), "secret");
        assert!(!format!("{:?}", credential).contains("secret"));
    }

    #[tokio::test]
    async fn test_environment_credential_reads_at_call_time() {
        let credential = EnvironmentCredential::new("AGENT_CLIENT_TEST_TOKEN");
        std::env::remove_var("AGENT_CLIENT_TEST_TOKEN");
        assert!(credential.token().await.unwrap_err().is_auth_error());

        std::env::set_var("AGENT_CLIENT_TEST_TOKEN", "rotated");
        assert_eq!(credential.token().await.unwrap(), "rotated");
        std::env::remove_var("AGENT_CLIENT_TEST_TOKEN");
    }

    #[test]
    fn test_default_variable() {
        assert_eq!(EnvironmentCredential::default().var(), "AGENT_RUNTIME_TOKEN");
    }
}
