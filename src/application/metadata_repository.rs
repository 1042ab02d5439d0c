// Seams for credential exchange, graph-metadata queries and latest values
use crate::domain::signal::SignalValue;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// One record returned by the graph-metadata service for a tag query.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSignalMetadata {
    #[serde(rename = "tepId", default)]
    pub tep_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<RawMetadataBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMetadataBlock {
    #[serde(rename = "_provenanceRecordAuditRecordCreatedTimestamp", default)]
    pub created_timestamp: Option<String>,
}

impl RawSignalMetadata {
    pub fn discovery_timestamp(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.created_timestamp.as_deref())
    }
}

/// First non-empty point identifier in a record batch. Multiple records
/// for one tag are expected to agree; first match wins.
pub fn first_tep_id(records: &[RawSignalMetadata]) -> Option<&str> {
    records
        .iter()
        .filter_map(|r| r.tep_id.as_deref())
        .find(|id| !id.is_empty())
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential exchange failed: {0}")]
    Exchange(String),
    #[error("credential exchange returned no token")]
    EmptyToken,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Obtains a bearer credential for the graph-metadata service. Never
/// retries internally; retry policy lives in the Metadata Fetcher.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn obtain(&self, scope: &str) -> Result<String, AuthError>;
}

/// Issues one metadata query for one tag name.
#[async_trait]
pub trait GraphMetadataClient: Send + Sync {
    async fn query_tag(
        &self,
        tag: &str,
        bearer_token: &str,
    ) -> Result<Vec<RawSignalMetadata>, QueryError>;
}

/// Serving-side source of latest point values. Backed externally; the
/// core only reads from it after resolution.
#[async_trait]
pub trait LatestValueSource: Send + Sync {
    async fn latest_values(&self, tep_ids: &BTreeSet<String>) -> anyhow::Result<Vec<SignalValue>>;
}
