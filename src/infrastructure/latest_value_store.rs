// In-memory latest-value store
use crate::application::metadata_repository::LatestValueSource;
use crate::domain::signal::SignalValue;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// Keeps the most recent value per point identifier. Stands in for the
/// external latest-value cache the serving layer reads from; ingestion
/// happens outside the resolution core.
#[derive(Default)]
pub struct InMemoryLatestValueStore {
    values: RwLock<HashMap<String, SignalValue>>,
}

impl InMemoryLatestValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&self, value: SignalValue) {
        let mut values = self.values.write().unwrap();
        values.insert(value.tep_id.clone(), value);
    }
}

#[async_trait]
impl LatestValueSource for InMemoryLatestValueStore {
    async fn latest_values(&self, tep_ids: &BTreeSet<String>) -> anyhow::Result<Vec<SignalValue>> {
        let values = self.values.read().unwrap();
        Ok(tep_ids
            .iter()
            .filter_map(|id| values.get(id).cloned())
            .collect())
    }
}
