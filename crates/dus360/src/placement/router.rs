use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{EntryId, ListOwner, PeriodId, ProgramId, ScenarioId, Score, UserId};
use super::error::PlacementError;
use super::repository::{
    PreferenceRepository, ProgramCatalog, RepositoryError, ScenarioRepository,
    VerificationProvider,
};
use super::service::{PlacementService, ProgramFilter};

type SharedService<R, C, V> = Arc<PlacementService<R, C, V>>;

#[derive(Debug, Deserialize)]
pub(crate) struct EstimateRequest {
    user_score: Score,
    program_cutoff: Score,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddPreferenceRequest {
    program_id: ProgramId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReorderRequest {
    entry_ids: Vec<EntryId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateScenarioRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// Router exposing the estimator, preference list, scenario, and analytics endpoints.
///
/// The `user_id` path segment stands in for the authenticated requester.
pub fn placement_router<R, C, V>(service: SharedService<R, C, V>) -> Router
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    Router::new()
        .route("/api/v1/estimate", post(estimate_handler::<R, C, V>))
        .route(
            "/api/v1/periods/:period_id/programs",
            get(programs_handler::<R, C, V>),
        )
        .route(
            "/api/v1/periods/:period_id/candidates/:user_id/preferences",
            get(list_preferences_handler::<R, C, V>).post(add_preference_handler::<R, C, V>),
        )
        .route(
            "/api/v1/periods/:period_id/candidates/:user_id/preferences/order",
            put(reorder_handler::<R, C, V>),
        )
        .route(
            "/api/v1/candidates/:user_id/preferences/:entry_id",
            delete(remove_preference_handler::<R, C, V>),
        )
        .route(
            "/api/v1/periods/:period_id/candidates/:user_id/risk",
            get(risk_handler::<R, C, V>),
        )
        .route(
            "/api/v1/periods/:period_id/candidates/:user_id/analytics",
            get(analytics_handler::<R, C, V>),
        )
        .route(
            "/api/v1/periods/:period_id/candidates/:user_id/scenarios",
            get(list_scenarios_handler::<R, C, V>).post(create_scenario_handler::<R, C, V>),
        )
        .route(
            "/api/v1/candidates/:user_id/scenarios/:scenario_id",
            get(scenario_handler::<R, C, V>).delete(delete_scenario_handler::<R, C, V>),
        )
        .route(
            "/api/v1/candidates/:user_id/scenarios/:scenario_id/apply",
            post(apply_scenario_handler::<R, C, V>),
        )
        .route(
            "/api/v1/candidates/:user_id/scenarios/:scenario_id/duplicate",
            post(duplicate_scenario_handler::<R, C, V>),
        )
        .with_state(service)
}

/// Maps engine errors onto HTTP status codes with a JSON error body.
pub(crate) fn error_response(err: PlacementError) -> Response {
    let status = match &err {
        PlacementError::NotFound(_) => StatusCode::NOT_FOUND,
        PlacementError::Forbidden(_) => StatusCode::FORBIDDEN,
        PlacementError::DuplicateProgram(_)
        | PlacementError::Repository(RepositoryError::Conflict)
        | PlacementError::Repository(RepositoryError::Constraint(_)) => StatusCode::CONFLICT,
        PlacementError::NotVerified(_)
        | PlacementError::QuotaExceeded { .. }
        | PlacementError::EmptyPreferenceList
        | PlacementError::InvalidOrdering(_)
        | PlacementError::MissingPrograms(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlacementError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %err, "placement request failed");
    }

    let payload = match &err {
        PlacementError::MissingPrograms(ids) => json!({
            "error": err.to_string(),
            "missing_programs": ids,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, PlacementError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

fn owner(period_id: String, user_id: String) -> ListOwner {
    ListOwner::new(user_id, period_id)
}

pub(crate) async fn estimate_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    axum::Json(request): axum::Json<EstimateRequest>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    let estimate = service.estimate(request.user_score, request.program_cutoff);
    (StatusCode::OK, axum::Json(estimate)).into_response()
}

pub(crate) async fn programs_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path(period_id): Path<String>,
    Query(filter): Query<ProgramFilter>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    let result = service
        .search_programs(&PeriodId(period_id), &filter)
        .map(|programs| {
            programs
                .iter()
                .map(|program| program.summary())
                .collect::<Vec<_>>()
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_preferences_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::OK,
        service.preferences(&owner(period_id, user_id)),
    )
}

pub(crate) async fn add_preference_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<AddPreferenceRequest>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::CREATED,
        service.add_preference(&owner(period_id, user_id), &request.program_id),
    )
}

pub(crate) async fn reorder_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<ReorderRequest>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::OK,
        service.reorder_preferences(&owner(period_id, user_id), &request.entry_ids),
    )
}

pub(crate) async fn remove_preference_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((user_id, entry_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    match service.remove_preference(&UserId(user_id), &EntryId(entry_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn risk_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::OK,
        service.risk_summary(&owner(period_id, user_id)),
    )
}

pub(crate) async fn analytics_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(StatusCode::OK, service.analytics(&owner(period_id, user_id)))
}

pub(crate) async fn list_scenarios_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(StatusCode::OK, service.scenarios(&owner(period_id, user_id)))
}

pub(crate) async fn create_scenario_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((period_id, user_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<CreateScenarioRequest>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_scenario(
            &owner(period_id, user_id),
            &request.name,
            request.description,
        ),
    )
}

pub(crate) async fn scenario_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((user_id, scenario_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::OK,
        service.scenario(&UserId(user_id), &ScenarioId(scenario_id)),
    )
}

pub(crate) async fn delete_scenario_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((user_id, scenario_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    match service.delete_scenario(&UserId(user_id), &ScenarioId(scenario_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn apply_scenario_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((user_id, scenario_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::OK,
        service.apply_scenario(&UserId(user_id), &ScenarioId(scenario_id)),
    )
}

pub(crate) async fn duplicate_scenario_handler<R, C, V>(
    State(service): State<SharedService<R, C, V>>,
    Path((user_id, scenario_id)): Path<(String, String)>,
) -> Response
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    respond(
        StatusCode::CREATED,
        service.duplicate_scenario(&UserId(user_id), &ScenarioId(scenario_id)),
    )
}
