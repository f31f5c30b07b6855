use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::Error;
use crate::models::*;

// ============================================================
// Request / response bodies
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMissionRequest {
    pub targets: Vec<NewTarget>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignCatRequest {
    pub cat_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================
// Error Handling
// ============================================================

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<T, ApiError>;

/// Map a service error onto a status code and JSON body.
///
/// Internal failures are logged in full and reported with a generic message.
fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::CatNotFound | Error::MissionNotFound | Error::TargetNotFound => StatusCode::NOT_FOUND,
        Error::Validation(_) | Error::InvalidBreed(_) | Error::NoTargets | Error::TargetOverflow => {
            StatusCode::BAD_REQUEST
        }
        Error::ConflictingData
        | Error::MissionCompleted
        | Error::TargetCompleted
        | Error::CatAlreadyAssigned => StatusCode::CONFLICT,
        Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Internal(source) => {
            tracing::error!("Internal error: {:#}", source);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal server error".to_string(),
                }),
            );
        }
    };

    tracing::warn!(status = status.as_u16(), "Request rejected: {}", e);
    (status, Json(ErrorBody { error: e.to_string() }))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Cats
// ============================================================

/// Lists every cat, or only the one named by `?name=`.
pub async fn list_cats(
    State(state): State<AppState>,
    Query(query): Query<CatQuery>,
) -> ApiResult<Json<Vec<Cat>>> {
    let Some(name) = query.name else {
        return state.cats.list_cats().map(Json).map_err(api_error);
    };

    match state.cats.get_cat_by_name(&name) {
        Ok(cat) => Ok(Json(vec![cat])),
        Err(Error::CatNotFound) => Ok(Json(Vec::new())),
        Err(e) => Err(api_error(e)),
    }
}

pub async fn get_cat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Cat>> {
    state.cats.get_cat(id).map(Json).map_err(api_error)
}

pub async fn create_cat(
    State(state): State<AppState>,
    Json(input): Json<CreateCatInput>,
) -> ApiResult<(StatusCode, Json<Cat>)> {
    state
        .cats
        .create_cat(input)
        .await
        .map(|cat| (StatusCode::CREATED, Json(cat)))
        .map_err(api_error)
}

pub async fn update_cat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCatInput>,
) -> ApiResult<Json<Cat>> {
    state
        .cats
        .update_cat(id, input)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn delete_cat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .cats
        .delete_cat(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

// ============================================================
// Missions
// ============================================================

pub async fn list_missions(State(state): State<AppState>) -> ApiResult<Json<Vec<FullMission>>> {
    state.missions.list_missions().map(Json).map_err(api_error)
}

pub async fn get_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FullMission>> {
    state.missions.get_mission(id).map(Json).map_err(api_error)
}

pub async fn create_mission(
    State(state): State<AppState>,
    Json(input): Json<CreateMissionRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    state
        .missions
        .create_mission(input.targets)
        .map(|id| (StatusCode::CREATED, Json(CreatedResponse { id })))
        .map_err(api_error)
}

pub async fn delete_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .missions
        .delete_mission(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

pub async fn complete_mission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Mission>> {
    state
        .missions
        .update_mission_state(id)
        .map(Json)
        .map_err(api_error)
}

pub async fn assign_cat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignCatRequest>,
) -> ApiResult<Json<Mission>> {
    state
        .missions
        .assign_cat_to_mission(id, input.cat_id)
        .map(Json)
        .map_err(api_error)
}

pub async fn unassign_cat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Mission>> {
    state
        .missions
        .unassign_cat_from_mission(id)
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Targets
// ============================================================

pub async fn add_target(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewTarget>,
) -> ApiResult<(StatusCode, Json<Target>)> {
    state
        .missions
        .add_target_to_mission(id, input)
        .map(|target| (StatusCode::CREATED, Json(target)))
        .map_err(api_error)
}

pub async fn update_target_notes(
    State(state): State<AppState>,
    Path((id, target_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateNotesRequest>,
) -> ApiResult<Json<Target>> {
    state
        .missions
        .update_mission_target_notes(id, target_id, input.notes)
        .map(Json)
        .map_err(api_error)
}

pub async fn complete_target(
    State(state): State<AppState>,
    Path((id, target_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .missions
        .set_mission_target_state(id, target_id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

pub async fn delete_target(
    State(state): State<AppState>,
    Path((id, target_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .missions
        .delete_target_from_mission(id, target_id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        let cases = [
            (Error::MissionNotFound, StatusCode::NOT_FOUND),
            (Error::Validation("name".into()), StatusCode::BAD_REQUEST),
            (Error::TargetOverflow, StatusCode::BAD_REQUEST),
            (Error::MissionCompleted, StatusCode::CONFLICT),
            (Error::CatAlreadyAssigned, StatusCode::CONFLICT),
            (Error::UpstreamUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, expected) in cases {
            let (status, _) = api_error(error);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let (status, Json(body)) = api_error(Error::Internal(anyhow::anyhow!("disk on fire")));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal server error");
    }
}
