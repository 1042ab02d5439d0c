// Graph-metadata client over the Dgraph GraphQL endpoint
use crate::application::metadata_repository::{GraphMetadataClient, QueryError, RawSignalMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const QUERY_TEMPLATE: &str = r#"
{
    queryScadaSignal(filter: { name: { eq: $tag_name } }) {
        tepId
        metadata {
            _provenanceRecordAuditRecordCreatedTimestamp
        }
    }
}"#;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Option<GraphData>,
}

#[derive(Debug, Deserialize)]
struct GraphData {
    #[serde(rename = "queryScadaSignal", default)]
    query_scada_signal: Vec<RawSignalMetadata>,
}

pub struct DgraphMetadataClient {
    endpoint: String,
    http: reqwest::Client,
}

impl DgraphMetadataClient {
    /// `request_timeout` bounds each individual query attempt; the retry
    /// backoff on top of it lives in the Metadata Fetcher.
    pub fn new(endpoint: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn build_query(tag: &str) -> String {
        // serde_json quoting keeps tag names with special characters from
        // breaking out of the filter literal.
        let literal = serde_json::to_string(tag).unwrap_or_else(|_| format!("{tag:?}"));
        QUERY_TEMPLATE.replace("$tag_name", &literal)
    }
}

#[async_trait]
impl GraphMetadataClient for DgraphMetadataClient {
    async fn query_tag(
        &self,
        tag: &str,
        bearer_token: &str,
    ) -> Result<Vec<RawSignalMetadata>, QueryError> {
        let query = Self::build_query(tag);
        tracing::debug!(tag, "executing graph-metadata query");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {bearer_token}"))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<GraphResponse>()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        Ok(parsed
            .data
            .map(|d| d.query_scada_signal)
            .unwrap_or_default())
    }
}
