// HTTP request handlers
use crate::application::resolution_service::{GroupedTepIds, ResolveError};
use crate::application::response_builder::assemble;
use crate::domain::signal::{InstallationScope, ResolutionStrategy};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Upstream caps list parameters at five entries per request.
const MAX_LIST_ITEMS: usize = 5;

#[derive(Serialize)]
struct ErrorDetail {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
        .into_response()
}

fn not_found_response() -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "No Scada signals found for latest values",
    )
}

fn resolve_error_response(err: ResolveError) -> Response {
    match err {
        ResolveError::UnsupportedMeasurementStandard(_) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        ResolveError::Upstream(_) => error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    }
}

/// Splits a comma-separated query parameter into a set, `None` when the
/// parameter is absent or blank.
fn split_list(raw: Option<&str>) -> Option<BTreeSet<String>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct LatestQuery {
    pub offshore_wind_farm_id: String,
    pub offshore_wind_turbine_id: Option<String>,
}

#[derive(Deserialize)]
pub struct InstallationTypeQuery {
    pub offshore_wind_farm_id: String,
    pub scada_reference_signal_name: Option<String>,
    pub measurement_standard_name: Option<String>,
    /// Comma-separated upstream signal names.
    pub scada_signal_names: Option<String>,
    /// Comma-separated turbine ids, turbine scope only.
    pub offshore_wind_turbine_ids: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest values by SCADA reference signal name.
pub async fn latest_by_reference_signal(
    Path(reference_signal_name): Path<String>,
    Query(query): Query<LatestQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let strategy = ResolutionStrategy::ByReferenceName(reference_signal_name);
    latest_for_strategy(
        &state,
        InstallationScope::OffshoreWindTurbine,
        &strategy,
        &query.offshore_wind_farm_id,
        query.offshore_wind_turbine_id.as_deref(),
    )
    .await
}

/// Latest values by measurement standard name.
pub async fn latest_by_measurement_standard(
    Path(measurement_standard_name): Path<String>,
    Query(query): Query<LatestQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let strategy = ResolutionStrategy::ByMeasurementStandard(measurement_standard_name);
    latest_for_strategy(
        &state,
        InstallationScope::OffshoreWindTurbine,
        &strategy,
        &query.offshore_wind_farm_id,
        query.offshore_wind_turbine_id.as_deref(),
    )
    .await
}

/// Latest values by installation type. For substation scopes the scope
/// literal itself is the resolvable name; the turbine scope requires a
/// reference signal name, a measurement standard name, or explicit
/// signal names.
pub async fn latest_by_installation_type(
    Path(installation_type): Path<InstallationScope>,
    Query(query): Query<InstallationTypeQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let signal_names = split_list(query.scada_signal_names.as_deref());
    let turbine_ids = split_list(query.offshore_wind_turbine_ids.as_deref());

    for (param, list) in [
        ("scada_signal_names", &signal_names),
        ("offshore_wind_turbine_ids", &turbine_ids),
    ] {
        if list.as_ref().is_some_and(|l| l.len() > MAX_LIST_ITEMS) {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("{param} accepts at most {MAX_LIST_ITEMS} items"),
            );
        }
    }

    // Substation scopes resolve through the scope literal; turbine-scope
    // selectors make no sense there and are rejected outright.
    if installation_type.is_literal_reference() {
        for (param, present) in [
            (
                "scada_reference_signal_name",
                query.scada_reference_signal_name.is_some(),
            ),
            (
                "measurement_standard_name",
                query.measurement_standard_name.is_some(),
            ),
            ("offshore_wind_turbine_ids", turbine_ids.is_some()),
        ] {
            if present {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("{param} is not valid for the {installation_type} installation type"),
                );
            }
        }
    }

    if let Some(signal_names) = signal_names {
        let tep_ids = match state
            .resolution_service
            .resolve_signal_names(&query.offshore_wind_farm_id, installation_type, &signal_names)
            .await
        {
            Ok(tep_ids) => tep_ids,
            Err(err) => return resolve_error_response(err),
        };
        let groups: GroupedTepIds = vec![(installation_type.as_str().to_string(), tep_ids)];
        return latest_for_groups(&state, groups, &query.offshore_wind_farm_id, None).await;
    }

    let strategy = if installation_type.is_literal_reference() {
        ResolutionStrategy::ByInstallationTypeLiteral(installation_type)
    } else if let Some(name) = query.scada_reference_signal_name {
        ResolutionStrategy::ByReferenceName(name)
    } else if let Some(name) = query.measurement_standard_name {
        ResolutionStrategy::ByMeasurementStandard(name)
    } else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "scada_reference_signal_name or measurement_standard_name is required \
             for the offshore_wind_turbine installation type",
        );
    };

    let groups = match state
        .resolution_service
        .resolve_grouped(
            &query.offshore_wind_farm_id,
            installation_type,
            &strategy,
            turbine_ids.as_ref(),
        )
        .await
    {
        Ok(groups) => groups,
        Err(err) => return resolve_error_response(err),
    };
    latest_for_groups(&state, groups, &query.offshore_wind_farm_id, None).await
}

async fn latest_for_strategy(
    state: &AppState,
    scope: InstallationScope,
    strategy: &ResolutionStrategy,
    wind_farm_id: &str,
    turbine_id: Option<&str>,
) -> Response {
    let turbines: Option<BTreeSet<String>> =
        turbine_id.map(|t| BTreeSet::from([t.to_string()]));

    let groups = match state
        .resolution_service
        .resolve_grouped(wind_farm_id, scope, strategy, turbines.as_ref())
        .await
    {
        Ok(groups) => groups,
        Err(err) => return resolve_error_response(err),
    };
    latest_for_groups(state, groups, wind_farm_id, turbine_id).await
}

async fn latest_for_groups(
    state: &AppState,
    groups: GroupedTepIds,
    wind_farm_id: &str,
    turbine_id: Option<&str>,
) -> Response {
    let tep_ids: BTreeSet<String> = groups.iter().flat_map(|(_, ids)| ids.clone()).collect();
    if tep_ids.is_empty() {
        return not_found_response();
    }

    let values = match state.latest_values.latest_values(&tep_ids).await {
        Ok(values) => values,
        Err(err) => {
            tracing::error!(%err, "latest-value lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "latest-value lookup failed");
        }
    };
    if values.is_empty() {
        return not_found_response();
    }

    let result = assemble(&groups, &values, wind_farm_id, turbine_id);
    (StatusCode::OK, Json(result)).into_response()
}
