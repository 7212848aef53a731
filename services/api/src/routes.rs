//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use common::rbac::{highest_role, permissions};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        MeResponse,
        fair::{CreateFairRequest, FairResponse, FairStatusRequest, UpdateFairRequest},
        stand::StandOccupancyRequest,
    },
    validation,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(me))
        .route("/fairs", get(get_fairs).post(create_fair))
        .route(
            "/fairs/:id",
            get(get_fair).put(update_fair).delete(delete_fair),
        )
        .route("/fairs/:id/status", patch(set_fair_status))
        .route("/fairs/:id/stands", get(get_fair_stands))
        .route("/stands", get(get_stands))
        .route("/stands/:id/occupancy", patch(set_stand_occupancy))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Current user with computed permissions
pub async fn me(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    let highest_role = highest_role(&user.roles);

    Json(MeResponse {
        id: user.id,
        roles: user.roles,
        highest_role,
        permissions: user.permissions,
    })
}

/// Create a fair together with its initial stands
pub async fn create_fair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateFairRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_CREATE)?;
    validation::validate_create_fair(&payload).map_err(ApiError::BadRequest)?;

    let (fair, stands) = state.fair_repository.create(&payload).await?;

    info!(
        "User {} created fair {} with {} stands",
        user.id,
        fair.id,
        stands.created.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(FairResponse {
            fair,
            stands_created: stands.created,
            stands_removed: stands.removed,
        }),
    ))
}

/// Get all fairs
pub async fn get_fairs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_READ)?;

    let fairs = state.fair_repository.get_all().await.map_err(|e| {
        error!("Failed to get fairs: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(fairs))
}

/// Get a fair by ID
pub async fn get_fair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_READ)?;

    let fair = state
        .fair_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get fair: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound(format!("Fair {} not found", id)))?;

    Ok(Json(fair))
}

/// Update a fair; a capacity change reconciles its stands
pub async fn update_fair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFairRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_UPDATE)?;
    validation::validate_update_fair(&payload).map_err(ApiError::BadRequest)?;

    let (fair, stands) = state.fair_repository.update(id, &payload).await?;

    Ok(Json(FairResponse {
        fair,
        stands_created: stands.created,
        stands_removed: stands.removed,
    }))
}

/// Activate or deactivate a fair
pub async fn set_fair_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FairStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_UPDATE)?;

    let fair = state
        .fair_repository
        .set_active(id, payload.is_active)
        .await
        .map_err(|e| {
            error!("Failed to update fair status: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound(format!("Fair {} not found", id)))?;

    Ok(Json(fair))
}

/// Delete a fair and its stands
pub async fn delete_fair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::FAIRS_DELETE)?;

    let deleted = state.fair_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete fair: {}", e);
        ApiError::InternalServerError
    })?;

    if deleted {
        Ok(Json(json!({"message": "Fair deleted successfully"})))
    } else {
        Err(ApiError::NotFound(format!("Fair {} not found", id)))
    }
}

/// Stands of one fair ordered by code
pub async fn get_fair_stands(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::STANDS_READ)?;

    let exists = state
        .fair_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get fair: {}", e);
            ApiError::InternalServerError
        })?
        .is_some();

    if !exists {
        return Err(ApiError::NotFound(format!("Fair {} not found", id)));
    }

    let stands = state.stand_repository.list_by_fair(id).await.map_err(|e| {
        error!("Failed to get stands: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(stands))
}

/// All stands ordered by fair then code
pub async fn get_stands(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::STANDS_READ)?;

    let stands = state.stand_repository.list_all().await.map_err(|e| {
        error!("Failed to get stands: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(stands))
}

/// Set the occupied flag of a stand
pub async fn set_stand_occupancy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StandOccupancyRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .resolver
        .require_permission(&user, permissions::STANDS_UPDATE)?;

    let stand = state
        .stand_repository
        .set_occupied(id, payload.occupied)
        .await
        .map_err(|e| {
            error!("Failed to update stand: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound(format!("Stand {} not found", id)))?;

    Ok(Json(stand))
}
