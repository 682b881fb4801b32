// handlers/protected/areas.rs - /api-bitacora/areas

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::database::models::area::{Area, AreaInput};
use crate::database::{IntoRecord, Repository};
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::inserted_id;
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

fn repo(state: &AppState) -> Repository<Area> {
    Repository::new(&state.db, "areas", "idarea")
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Area>> {
    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::asc("nombrearea"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Area> {
    Ok(ApiResponse::success(repo(&state).select_404(id, "Área no encontrada").await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<AreaInput>,
) -> ApiResult<Area> {
    user.require(Level::SYSTEM)?;
    body.validate_create()?;

    let repo = repo(&state);
    let id = inserted_id(repo.insert(&body.into_record()).await?)?;
    info!(idarea = id, login = %user.login, "area created");
    Ok(ApiResponse::created(repo.select_404(id, "Área no encontrada").await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<AreaInput>,
) -> ApiResult<Area> {
    user.require(Level::SYSTEM)?;

    let repo = repo(&state);
    repo.select_404(id, "Área no encontrada").await?;
    repo.update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(repo.select_404(id, "Área no encontrada").await?))
}

/// Areas still referenced by users, logs or equipment fail with 409.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    user.require(Level::SYSTEM)?;

    let repo = repo(&state);
    repo.select_404(id, "Área no encontrada").await?;
    repo.delete(id).await?;
    info!(idarea = id, login = %user.login, "area deleted");
    Ok(ApiResponse::success(message("Área eliminada exitosamente")))
}
