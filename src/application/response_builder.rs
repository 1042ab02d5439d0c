// Response assembler - groups latest values by reference name
use crate::application::resolution_service::GroupedTepIds;
use crate::domain::signal::SignalValue;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One latest-value row as presented at the service boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSignalValue {
    pub reference_signal_name: String,
    pub wind_farm_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbine_id: Option<String>,
    pub tep_id: String,
    pub tag: String,
    pub value: f64,
    pub event_time: DateTime<Utc>,
}

/// Orders values by source tag ascending and emits them grouped under
/// each reference name in the given group order. Output is deterministic
/// for identical inputs.
pub fn assemble(
    groups: &GroupedTepIds,
    values: &[SignalValue],
    wind_farm_id: &str,
    turbine_id: Option<&str>,
) -> Vec<ReferenceSignalValue> {
    let mut sorted: Vec<&SignalValue> = values.iter().collect();
    sorted.sort_by(|a, b| a.tag.cmp(&b.tag));

    let mut result = Vec::new();
    for (reference_name, tep_ids) in groups {
        for value in sorted.iter().filter(|v| tep_ids.contains(&v.tep_id)) {
            result.push(ReferenceSignalValue {
                reference_signal_name: reference_name.clone(),
                wind_farm_id: wind_farm_id.to_string(),
                turbine_id: turbine_id.map(str::to_string),
                tep_id: value.tep_id.clone(),
                tag: value.tag.clone(),
                value: value.value,
                event_time: value.event_time,
            });
        }
    }
    result
}
