// Signal identity domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of physical asset a signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationScope {
    OffshoreWindTurbine,
    OffshoreSubstation,
    OnshoreSubstation,
}

impl InstallationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationScope::OffshoreWindTurbine => "offshore_wind_turbine",
            InstallationScope::OffshoreSubstation => "offshore_substation",
            InstallationScope::OnshoreSubstation => "onshore_substation",
        }
    }

    /// Substation scopes resolve through the scope literal itself rather
    /// than a per-signal reference name.
    pub fn is_literal_reference(&self) -> bool {
        !matches!(self, InstallationScope::OffshoreWindTurbine)
    }
}

impl std::fmt::Display for InstallationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite cache key identifying one resolvable signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub wind_farm_id: String,
    pub scope: InstallationScope,
    pub reference_name: String,
    pub turbine_id: Option<String>,
}

impl SignalKey {
    pub fn new(
        wind_farm_id: impl Into<String>,
        scope: InstallationScope,
        reference_name: impl Into<String>,
        turbine_id: Option<String>,
    ) -> Self {
        Self {
            wind_farm_id: wind_farm_id.into(),
            scope,
            reference_name: reference_name.into(),
            turbine_id,
        }
    }

    /// Tag name queried against the graph-metadata service for this key.
    pub fn upstream_tag(&self) -> String {
        match &self.turbine_id {
            Some(turbine) => format!("{}.{}.{}", self.wind_farm_id, turbine, self.reference_name),
            None => format!("{}.{}", self.wind_farm_id, self.reference_name),
        }
    }
}

/// One resolved signal as held in the cache. Replaced wholesale on
/// re-resolution, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSignal {
    pub tep_id: String,
    pub tag: String,
    pub discovered_at: Option<DateTime<Utc>>,
}

/// How a request identifies the signals it wants.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionStrategy {
    ByReferenceName(String),
    ByMeasurementStandard(String),
    ByInstallationTypeLiteral(InstallationScope),
}

/// Latest value for one point, as read from the serving-side value store.
#[derive(Debug, Clone, Serialize)]
pub struct SignalValue {
    pub tep_id: String,
    pub tag: String,
    pub value: f64,
    pub event_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_tag_with_turbine() {
        let key = SignalKey::new(
            "WF1",
            InstallationScope::OffshoreWindTurbine,
            "GenSpeed",
            Some("T01".to_string()),
        );
        assert_eq!(key.upstream_tag(), "WF1.T01.GenSpeed");
    }

    #[test]
    fn test_upstream_tag_without_turbine() {
        let key = SignalKey::new("WF1", InstallationScope::OffshoreSubstation, "offshore_substation", None);
        assert_eq!(key.upstream_tag(), "WF1.offshore_substation");
    }

    #[test]
    fn test_scope_literal_reference() {
        assert!(InstallationScope::OffshoreSubstation.is_literal_reference());
        assert!(InstallationScope::OnshoreSubstation.is_literal_reference());
        assert!(!InstallationScope::OffshoreWindTurbine.is_literal_reference());
    }

    #[test]
    fn test_key_equality_is_structural() {
        let a = SignalKey::new("WF1", InstallationScope::OffshoreWindTurbine, "GenSpeed", None);
        let b = SignalKey::new("WF1", InstallationScope::OffshoreWindTurbine, "GenSpeed", None);
        assert_eq!(a, b);
    }
}
