// Metadata fetcher with bounded retries and credential-refresh escalation
use crate::application::metadata_repository::{
    CredentialProvider, GraphMetadataClient, RawSignalMetadata,
};
use std::sync::Arc;
use std::time::Duration;

/// Result of one fetch. `degraded` marks a terminal upstream failure that
/// was absorbed into an empty record set; the synchronizer feeds it to
/// the circuit breaker while batch callers only consume `records`.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawSignalMetadata>,
    pub degraded: bool,
}

impl FetchOutcome {
    fn complete(records: Vec<RawSignalMetadata>) -> Self {
        Self {
            records,
            degraded: false,
        }
    }

    fn degraded() -> Self {
        Self {
            records: Vec::new(),
            degraded: true,
        }
    }
}

/// Retry control flow as an explicit state machine so the attempt-count
/// and single-escalation invariants stay independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPhase {
    Retrying { attempt: u32 },
    Escalating,
    Terminal,
}

/// Issues a single metadata query per tag with up to `max_attempts`
/// tries (constant backoff between them), then exactly one
/// credential-refresh-and-retry escalation. Transient failures are
/// absorbed; a tag that cannot be fetched yields an empty, degraded
/// outcome rather than an error, so multi-tag callers keep running.
#[derive(Clone)]
pub struct MetadataFetcher {
    credentials: Arc<dyn CredentialProvider>,
    client: Arc<dyn GraphMetadataClient>,
    scope: String,
    max_attempts: u32,
    backoff: Duration,
}

impl MetadataFetcher {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        client: Arc<dyn GraphMetadataClient>,
        scope: String,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            credentials,
            client,
            scope,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub async fn fetch(&self, tag: &str) -> FetchOutcome {
        let mut token = match self.credentials.obtain(&self.scope).await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(tag, %err, "credential exchange failed, returning no records");
                return FetchOutcome::degraded();
            }
        };

        let mut phase = FetchPhase::Retrying { attempt: 0 };
        loop {
            match phase {
                FetchPhase::Retrying { attempt } => {
                    match self.client.query_tag(tag, &token).await {
                        Ok(records) => return FetchOutcome::complete(records),
                        Err(err) => {
                            tracing::warn!(
                                tag,
                                attempt = attempt + 1,
                                max_attempts = self.max_attempts,
                                %err,
                                "metadata query failed"
                            );
                            if attempt + 1 >= self.max_attempts {
                                phase = FetchPhase::Escalating;
                            } else {
                                tokio::time::sleep(self.backoff).await;
                                phase = FetchPhase::Retrying { attempt: attempt + 1 };
                            }
                        }
                    }
                }
                FetchPhase::Escalating => {
                    tracing::warn!(tag, "retries exhausted, refreshing credential for final attempt");
                    token = match self.credentials.obtain(&self.scope).await {
                        Ok(token) => token,
                        Err(err) => {
                            tracing::warn!(tag, %err, "credential refresh failed");
                            phase = FetchPhase::Terminal;
                            continue;
                        }
                    };
                    match self.client.query_tag(tag, &token).await {
                        Ok(records) => return FetchOutcome::complete(records),
                        Err(err) => {
                            tracing::warn!(tag, %err, "final attempt after credential refresh failed");
                            phase = FetchPhase::Terminal;
                        }
                    }
                }
                FetchPhase::Terminal => {
                    tracing::error!(tag, "no metadata retrieved, degrading to empty result");
                    return FetchOutcome::degraded();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metadata_repository::{AuthError, QueryError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingCredentials {
        obtained: AtomicU32,
        fail: bool,
    }

    impl CountingCredentials {
        fn new(fail: bool) -> Self {
            Self {
                obtained: AtomicU32::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl CredentialProvider for CountingCredentials {
        async fn obtain(&self, _scope: &str) -> Result<String, AuthError> {
            let n = self.obtained.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AuthError::Exchange("no broker".to_string()))
            } else {
                Ok(format!("token-{n}"))
            }
        }
    }

    /// Fails the first `failures` queries, then succeeds with `records`.
    struct FlakyClient {
        calls: AtomicU32,
        failures: u32,
        records: Vec<RawSignalMetadata>,
    }

    impl FlakyClient {
        fn new(failures: u32, records: Vec<RawSignalMetadata>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                records,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GraphMetadataClient for FlakyClient {
        async fn query_tag(
            &self,
            _tag: &str,
            _bearer_token: &str,
        ) -> Result<Vec<RawSignalMetadata>, QueryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(QueryError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                })
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn record(tep_id: &str) -> RawSignalMetadata {
        serde_json::from_str(&format!(r#"{{"tepId": "{tep_id}"}}"#)).unwrap()
    }

    fn fetcher(
        credentials: Arc<CountingCredentials>,
        client: Arc<FlakyClient>,
    ) -> MetadataFetcher {
        MetadataFetcher::new(
            credentials,
            client,
            "api://test-scope".to_string(),
            5,
            Duration::from_secs(2),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let credentials = Arc::new(CountingCredentials::new(false));
        let client = Arc::new(FlakyClient::new(0, vec![record("tep-42")]));
        let outcome = fetcher(credentials.clone(), client.clone()).fetch("tag").await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(client.calls(), 1);
        assert_eq!(credentials.obtained.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_then_degrades_to_empty() {
        let credentials = Arc::new(CountingCredentials::new(false));
        let client = Arc::new(FlakyClient::new(u32::MAX, Vec::new()));
        let outcome = fetcher(credentials.clone(), client.clone()).fetch("tag").await;

        // max_attempts retries plus one credential-refresh attempt.
        assert_eq!(client.calls(), 6);
        assert_eq!(credentials.obtained.load(Ordering::SeqCst), 2);
        assert!(outcome.degraded);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_absorbed() {
        let credentials = Arc::new(CountingCredentials::new(false));
        let client = Arc::new(FlakyClient::new(2, vec![record("tep-7")]));
        let outcome = fetcher(credentials.clone(), client.clone()).fetch("tag").await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.records[0].tep_id.as_deref(), Some("tep-7"));
        assert_eq!(client.calls(), 3);
        // No escalation: the initial credential is still in use.
        assert_eq!(credentials.obtained.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_succeeds_with_fresh_credential() {
        let credentials = Arc::new(CountingCredentials::new(false));
        let client = Arc::new(FlakyClient::new(5, vec![record("tep-9")]));
        let outcome = fetcher(credentials.clone(), client.clone()).fetch("tag").await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(client.calls(), 6);
        assert_eq!(credentials.obtained.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_failure_is_soft() {
        let credentials = Arc::new(CountingCredentials::new(true));
        let client = Arc::new(FlakyClient::new(0, vec![record("tep-1")]));
        let outcome = fetcher(credentials, client.clone()).fetch("tag").await;

        assert!(outcome.degraded);
        assert!(outcome.records.is_empty());
        // No query is attempted without a credential.
        assert_eq!(client.calls(), 0);
    }
}
