// Resolution service - signal identity to point identifiers
use crate::application::sync_service::{CacheSynchronizer, SyncError};
use crate::domain::signal::{InstallationScope, ResolutionStrategy, SignalKey};
use crate::infrastructure::signal_cache::SignalCache;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("measurement standard name {0} is not supported yet")]
    UnsupportedMeasurementStandard(String),
    #[error(transparent)]
    Upstream(#[from] SyncError),
}

/// Point identifiers grouped by the reference name they resolved under.
pub type GroupedTepIds = Vec<(String, BTreeSet<String>)>;

/// Turns identity queries into cache lookups, synchronizing missing or
/// stale keys first. A key that resolves to nothing is skipped, never an
/// error: one unresolved name among many must not fail the request.
#[derive(Clone)]
pub struct ResolutionService {
    cache: Arc<SignalCache>,
    synchronizer: CacheSynchronizer,
    measurement_standards: HashMap<String, Vec<String>>,
}

impl ResolutionService {
    pub fn new(
        cache: Arc<SignalCache>,
        synchronizer: CacheSynchronizer,
        measurement_standards: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            cache,
            synchronizer,
            measurement_standards,
        }
    }

    /// Reference names a strategy expands to, in deterministic order.
    pub fn expand_reference_names(
        &self,
        strategy: &ResolutionStrategy,
    ) -> Result<Vec<String>, ResolveError> {
        match strategy {
            ResolutionStrategy::ByReferenceName(name) => Ok(vec![name.clone()]),
            ResolutionStrategy::ByMeasurementStandard(standard) => {
                let names = self
                    .measurement_standards
                    .get(standard)
                    .cloned()
                    .unwrap_or_default();
                if names.is_empty() {
                    return Err(ResolveError::UnsupportedMeasurementStandard(
                        standard.clone(),
                    ));
                }
                Ok(names)
            }
            ResolutionStrategy::ByInstallationTypeLiteral(scope) => {
                Ok(vec![scope.as_str().to_string()])
            }
        }
    }

    /// Resolves to point identifiers grouped per reference name. The
    /// cross-product of names and turbine ids is synced in one pass.
    pub async fn resolve_grouped(
        &self,
        wind_farm_id: &str,
        scope: InstallationScope,
        strategy: &ResolutionStrategy,
        turbine_ids: Option<&BTreeSet<String>>,
    ) -> Result<GroupedTepIds, ResolveError> {
        let reference_names = self.expand_reference_names(strategy)?;
        let keys = build_keys(wind_farm_id, scope, &reference_names, turbine_ids);
        self.synchronizer.ensure_synced(&keys).await?;

        let mut grouped: GroupedTepIds = Vec::new();
        for name in &reference_names {
            let mut tep_ids = BTreeSet::new();
            for key in keys.iter().filter(|k| &k.reference_name == name) {
                if let Some(records) = self.cache.lookup(key) {
                    tep_ids.extend(records.into_iter().map(|r| r.tep_id));
                }
            }
            grouped.push((name.clone(), tep_ids));
        }
        Ok(grouped)
    }

    /// Flat variant of [`resolve_grouped`]. An empty set signals "not
    /// found"; callers map it to a not-found response.
    pub async fn resolve(
        &self,
        wind_farm_id: &str,
        scope: InstallationScope,
        strategy: &ResolutionStrategy,
        turbine_ids: Option<&BTreeSet<String>>,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let grouped = self
            .resolve_grouped(wind_farm_id, scope, strategy, turbine_ids)
            .await?;
        Ok(grouped.into_iter().flat_map(|(_, ids)| ids).collect())
    }

    /// Lookup by explicit upstream signal names. Each name is resolved
    /// as its own exact-match tag query, one key per name; names that
    /// resolve to nothing are skipped like any other partial miss.
    pub async fn resolve_signal_names(
        &self,
        wind_farm_id: &str,
        scope: InstallationScope,
        signal_names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, ResolveError> {
        let keys: Vec<SignalKey> = signal_names
            .iter()
            .map(|name| SignalKey::new(wind_farm_id, scope, name.clone(), None))
            .collect();
        self.synchronizer.ensure_synced(&keys).await?;

        let mut tep_ids = BTreeSet::new();
        for key in &keys {
            if let Some(records) = self.cache.lookup(key) {
                tep_ids.extend(records.into_iter().map(|r| r.tep_id));
            }
        }
        Ok(tep_ids)
    }
}

fn build_keys(
    wind_farm_id: &str,
    scope: InstallationScope,
    reference_names: &[String],
    turbine_ids: Option<&BTreeSet<String>>,
) -> Vec<SignalKey> {
    let mut keys = Vec::new();
    for name in reference_names {
        match turbine_ids {
            Some(turbines) if !turbines.is_empty() => {
                for turbine in turbines {
                    keys.push(SignalKey::new(
                        wind_farm_id,
                        scope,
                        name.clone(),
                        Some(turbine.clone()),
                    ));
                }
            }
            _ => keys.push(SignalKey::new(wind_farm_id, scope, name.clone(), None)),
        }
    }
    keys
}
