// handlers/protected/equipos.rs - /api-bitacora/equipos

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::database::models::equipo::{Equipo, EquipoInput, EQUIPO_FROM, EQUIPO_SELECT};
use crate::database::{IntoRecord, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::{fetch_all, fetch_joined, inserted_id};
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

const NOT_FOUND: &str = "Equipo no encontrado";

fn repo(state: &AppState) -> Repository<Equipo> {
    Repository::new(&state.db, "equipos", "idequipo")
}

async fn load(state: &AppState, id: i32) -> Result<Equipo, ApiError> {
    fetch_joined(state, EQUIPO_SELECT, EQUIPO_FROM, "e.idequipo", id, NOT_FOUND).await
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Equipo>> {
    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::asc("e.descripcion_equipo"));
    Ok(ApiResponse::success(fetch_all(&state, &filter, EQUIPO_SELECT, EQUIPO_FROM).await?))
}

pub async fn by_area(State(state): State<AppState>, ApiPath(area): ApiPath<i32>) -> ApiResult<Vec<Equipo>> {
    let mut filter = Filter::new();
    filter.where_clause().eq("e.fkarea", area);
    filter.order(FilterOrderInfo::asc("e.descripcion_equipo"));
    Ok(ApiResponse::success(fetch_all(&state, &filter, EQUIPO_SELECT, EQUIPO_FROM).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Equipo> {
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<EquipoInput>,
) -> ApiResult<Equipo> {
    user.require(Level::MANAGER)?;
    body.validate_create()?;

    let id = inserted_id(repo(&state).insert(&body.into_record()).await?)?;
    info!(idequipo = id, login = %user.login, "equipment created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<EquipoInput>,
) -> ApiResult<Equipo> {
    user.require(Level::MANAGER)?;
    load(&state, id).await?;

    repo(&state).update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// Equipment still referenced by logs or incidents is refused by the foreign key.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    user.require(Level::SUPERVISOR)?;
    load(&state, id).await?;

    repo(&state).delete(id).await?;
    info!(idequipo = id, login = %user.login, "equipment deleted");
    Ok(ApiResponse::success(message("Equipo eliminado exitosamente")))
}
