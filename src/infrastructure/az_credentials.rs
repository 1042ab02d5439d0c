// Credential provider backed by the Azure CLI
use crate::application::metadata_repository::{AuthError, CredentialProvider};
use async_trait::async_trait;
use tokio::process::Command;

/// Exchanges a scope for a bearer token through `az account
/// get-access-token`. One process invocation per call; there is no local
/// expiry tracking, callers re-obtain whenever they need a fresh token.
pub struct AzCliCredentialProvider;

#[async_trait]
impl CredentialProvider for AzCliCredentialProvider {
    async fn obtain(&self, scope: &str) -> Result<String, AuthError> {
        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                scope,
                "--query",
                "accessToken",
                "--output",
                "tsv",
            ])
            .output()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Exchange(format!(
                "az exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(token)
    }
}
