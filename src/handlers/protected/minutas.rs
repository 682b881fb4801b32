// handlers/protected/minutas.rs - /api-bitacora/minutas
//
// Minutes carry no owner of their own; writes are checked against the meeting.

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::database::models::reunion::{Minuta, MinutaInput};
use crate::database::{IntoRecord, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::protected::reuniones;
use crate::handlers::{ensure_mutate, inserted_id};
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

const NOT_FOUND: &str = "Minuta no encontrada";

fn repo(state: &AppState) -> Repository<Minuta> {
    Repository::new(&state.db, "minutas", "idminuta")
}

async fn load(state: &AppState, id: i32) -> Result<Minuta, ApiError> {
    Ok(repo(state).select_404(id, NOT_FOUND).await?)
}

async fn ensure_meeting_mutate(state: &AppState, user: &AuthUser, reunion: i32) -> Result<(), ApiError> {
    let reunion = reuniones::load(state, reunion).await?;
    ensure_mutate(user, &reunion, Level::SUPERVISOR)
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Minuta>> {
    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::desc("idminuta"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn by_reunion(State(state): State<AppState>, ApiPath(reunion): ApiPath<i32>) -> ApiResult<Vec<Minuta>> {
    let mut filter = Filter::new();
    filter.where_clause().eq("fkreunion", reunion);
    filter.order(FilterOrderInfo::asc("idminuta"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Minuta> {
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<MinutaInput>,
) -> ApiResult<Minuta> {
    body.validate_create()?;
    if let Some(reunion) = body.fkreunion {
        ensure_meeting_mutate(&state, &user, reunion).await?;
    }

    let id = inserted_id(repo(&state).insert(&body.into_record()).await?)?;
    info!(idminuta = id, login = %user.login, "minute created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<MinutaInput>,
) -> ApiResult<Minuta> {
    let current = load(&state, id).await?;
    ensure_meeting_mutate(&state, &user, current.fkreunion).await?;
    if let Some(target) = body.fkreunion.filter(|r| *r != current.fkreunion) {
        ensure_meeting_mutate(&state, &user, target).await?;
    }

    repo(&state).update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let current = load(&state, id).await?;
    ensure_meeting_mutate(&state, &user, current.fkreunion).await?;

    repo(&state).delete(id).await?;
    Ok(ApiResponse::success(message("Minuta eliminada exitosamente")))
}
