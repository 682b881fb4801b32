// handlers/protected/integrantes.rs - /api-bitacora/integrantes-reunion

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::database::models::reunion::{AsistenciaInput, IntegranteInput, IntegranteReunion, IntegrantesBulkInput};
use crate::database::query_builder::execute_on;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::protected::reuniones;
use crate::handlers::{ensure_mutate, inserted_id};
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

const TABLE: &str = "integrantes_reunion";
const NOT_FOUND: &str = "Integrante no encontrado";

fn repo(state: &AppState) -> Repository<IntegranteReunion> {
    Repository::new(&state.db, TABLE, "idintegrantereunion")
}

async fn load(state: &AppState, id: i32) -> Result<IntegranteReunion, ApiError> {
    Ok(repo(state).select_404(id, NOT_FOUND).await?)
}

async fn ensure_meeting_mutate(state: &AppState, user: &AuthUser, reunion: i32) -> Result<(), ApiError> {
    let reunion = reuniones::load(state, reunion).await?;
    ensure_mutate(user, &reunion, Level::SUPERVISOR)
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<IntegranteReunion>> {
    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::desc("idintegrantereunion"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn by_reunion(
    State(state): State<AppState>,
    ApiPath(reunion): ApiPath<i32>,
) -> ApiResult<Vec<IntegranteReunion>> {
    let mut filter = Filter::new();
    filter.where_clause().eq("fkreunion", reunion);
    filter.order(FilterOrderInfo::asc("nombres_apellidos_integrante"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<IntegranteReunion> {
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<IntegranteInput>,
) -> ApiResult<IntegranteReunion> {
    body.validate_create()?;
    if let Some(reunion) = body.fkreunion {
        ensure_meeting_mutate(&state, &user, reunion).await?;
    }

    let id = inserted_id(repo(&state).insert(&body.into_record()).await?)?;
    Ok(ApiResponse::created(load(&state, id).await?))
}

/// POST /bulk - all attendees or none.
pub async fn bulk(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<IntegrantesBulkInput>,
) -> ApiResult<Vec<IntegranteReunion>> {
    let (reunion, records) = body.into_records()?;
    ensure_meeting_mutate(&state, &user, reunion).await?;

    let mut tx = state.db.begin().await?;
    let mut ids = Vec::with_capacity(records.len());
    for record in &records {
        let result = execute_on(&mut tx, &record.insert_sql(TABLE)).await?;
        ids.push(inserted_id(result.last_insert_id())?);
    }
    tx.commit().await?;
    info!(idreunion = reunion, count = ids.len(), "attendees added");

    let mut filter = Filter::new();
    filter
        .where_clause()
        .in_list("idintegrantereunion", ids.into_iter().map(Value::from).collect());
    filter.order(FilterOrderInfo::asc("idintegrantereunion"));
    Ok(ApiResponse::created(repo(&state).select_any(&filter).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<IntegranteInput>,
) -> ApiResult<IntegranteReunion> {
    let current = load(&state, id).await?;
    ensure_meeting_mutate(&state, &user, current.fkreunion).await?;
    if let Some(target) = body.fkreunion.filter(|r| *r != current.fkreunion) {
        ensure_meeting_mutate(&state, &user, target).await?;
    }

    repo(&state).update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// PUT /:id/asistencia
pub async fn asistencia(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<AsistenciaInput>,
) -> ApiResult<IntegranteReunion> {
    let asistio = body.asistio.ok_or_else(|| ApiError::missing_fields(&["asistio"]))?;
    let current = load(&state, id).await?;
    ensure_meeting_mutate(&state, &user, current.fkreunion).await?;

    let mut record = Record::new();
    record.set("asistio", asistio);
    repo(&state).update(id, &record).await?;
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
    Ok(ApiResponse::success(message("Integrante eliminado exitosamente")))
}
