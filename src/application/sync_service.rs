// Cache synchronizer - decides freshness and drives the metadata fetcher
use crate::application::metadata_fetcher::MetadataFetcher;
use crate::application::metadata_repository::RawSignalMetadata;
use crate::domain::signal::{ResolvedSignal, SignalKey};
use crate::domain::timestamp::parse_discovery_timestamp;
use crate::infrastructure::circuit_breaker::CircuitBreaker;
use crate::infrastructure::signal_cache::SignalCache;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("metadata upstream unavailable, circuit open")]
    UpstreamUnavailable,
}

/// Populates the resolution cache for any requested key that is missing
/// or stale, behind the circuit breaker. A fetch that yields nothing is
/// cached as an explicit empty record set so a confirmed-absent identity
/// does not re-trigger upstream calls before its TTL expires.
#[derive(Clone)]
pub struct CacheSynchronizer {
    cache: Arc<SignalCache>,
    fetcher: Arc<MetadataFetcher>,
    breaker: Arc<CircuitBreaker>,
}

impl CacheSynchronizer {
    pub fn new(
        cache: Arc<SignalCache>,
        fetcher: Arc<MetadataFetcher>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            breaker,
        }
    }

    pub async fn ensure_synced(&self, keys: &[SignalKey]) -> Result<(), SyncError> {
        let pending: Vec<&SignalKey> = keys.iter().filter(|k| !self.cache.is_fresh(k)).collect();
        if pending.is_empty() {
            return Ok(());
        }

        if !self.breaker.try_acquire() {
            tracing::warn!(keys = pending.len(), "sync short-circuited, breaker open");
            return Err(SyncError::UpstreamUnavailable);
        }

        let fetches = pending.into_iter().map(|key| {
            let fetcher = self.fetcher.clone();
            async move {
                let outcome = fetcher.fetch(&key.upstream_tag()).await;
                (key, outcome)
            }
        });

        let mut any_degraded = false;
        for (key, outcome) in futures::future::join_all(fetches).await {
            if outcome.degraded {
                any_degraded = true;
            }
            let records = resolve_records(&key.upstream_tag(), &outcome.records);
            tracing::debug!(tag = key.upstream_tag(), records = records.len(), "cache synced");
            self.cache.put(key.clone(), records);
        }

        if any_degraded {
            self.breaker.on_failure();
        } else {
            self.breaker.on_success();
        }
        Ok(())
    }
}

/// Raw upstream records to cacheable resolved signals. Records without a
/// point identifier carry nothing resolvable and are dropped; duplicate
/// identifiers are kept once, first occurrence wins.
fn resolve_records(tag: &str, records: &[RawSignalMetadata]) -> Vec<ResolvedSignal> {
    let mut resolved: Vec<ResolvedSignal> = Vec::new();
    for record in records {
        let Some(tep_id) = record.tep_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        if resolved.iter().any(|r| r.tep_id == tep_id) {
            continue;
        }
        let discovered_at = record.discovery_timestamp().and_then(|raw| {
            let parsed = parse_discovery_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(tag, raw, "skipping malformed discovery timestamp");
            }
            parsed
        });
        resolved.push(ResolvedSignal {
            tep_id: tep_id.to_string(),
            tag: tag.to_string(),
            discovered_at,
        });
    }
    resolved
}
