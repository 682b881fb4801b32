// handlers/protected/tareas.rs - /api-bitacora/tareas
//
// Task details carry their own audit columns but no access rules of their own:
// every detail operation is checked against the parent task.

use axum::extract::{Extension, State};
use chrono::Local;
use tracing::info;

use crate::database::models::tarea::{
    DetalleInput, DetalleStatusInput, DetalleTarea, EstatusTarea, Tarea, TareaInput, TareaQuery, DETALLE_FROM,
    DETALLE_SELECT, TAREA_FROM, TAREA_SCOPE, TAREA_SELECT,
};
use crate::database::models::StatusInput;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::{
    ensure_access, ensure_mutate, fetch_all, fetch_joined, fetch_page, inserted_id, stamp_update,
};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::{scope_filter, Level};
use crate::state::AppState;

fn tareas(state: &AppState) -> Repository<Tarea> {
    Repository::new(&state.db, "tareas", "idtarea")
}

fn detalles(state: &AppState) -> Repository<DetalleTarea> {
    Repository::new(&state.db, "detallestareas", "iddetalletarea")
}

async fn load(state: &AppState, id: i32) -> Result<Tarea, ApiError> {
    fetch_joined(state, TAREA_SELECT, TAREA_FROM, "t.idtarea", id, "Tarea no encontrada").await
}

async fn load_detalle(state: &AppState, id: i32) -> Result<DetalleTarea, ApiError> {
    fetch_joined(
        state,
        DETALLE_SELECT,
        DETALLE_FROM,
        "d.iddetalletarea",
        id,
        "Detalle de tarea no encontrado",
    )
    .await
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<TareaQuery>,
) -> ApiResult<Page<Tarea>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    scope_filter(filter.where_clause(), &user, Level::SUPERVISOR, TAREA_SCOPE);
    filter.order(FilterOrderInfo::desc("t.fecha_registrado"));

    let page = fetch_page(&state, &mut filter, TAREA_SELECT, TAREA_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Tarea> {
    let tarea = load(&state, id).await?;
    ensure_access(&user, &tarea, Level::SUPERVISOR)?;
    Ok(ApiResponse::success(tarea))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<TareaInput>,
) -> ApiResult<Tarea> {
    body.validate_create()?;
    let fkarea = body
        .fkarea
        .or(user.fkarea)
        .ok_or_else(|| ApiError::missing_fields(&["fkarea"]))?;

    let mut record = body.into_record();
    record
        .set("fkarea", fkarea)
        .set("login_registrado", user.login.as_str())
        .set_now("fecha_registrado");
    if !record.contains("estatus") {
        record.set("estatus", EstatusTarea::Pendiente);
    }

    let id = inserted_id(tareas(&state).insert(&record).await?)?;
    info!(idtarea = id, login = %user.login, "task created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<TareaInput>,
) -> ApiResult<Tarea> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = body.into_record();
    stamp_update(&mut record, &user)?;
    tareas(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// PATCH /:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<StatusInput<EstatusTarea>>,
) -> ApiResult<Tarea> {
    let estatus = body.require()?;
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = Record::new();
    record.set("estatus", estatus);
    stamp_update(&mut record, &user)?;
    tareas(&state).update(id, &record).await?;
    info!(idtarea = id, estatus = %estatus, "task status changed");
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// GET /:id/detalles
pub async fn list_detalles(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Vec<DetalleTarea>> {
    let tarea = load(&state, id).await?;
    ensure_access(&user, &tarea, Level::SUPERVISOR)?;

    let mut filter = Filter::new();
    filter.where_clause().eq("d.fktarea", id);
    filter.order(FilterOrderInfo::asc("d.fecha_registro"));
    Ok(ApiResponse::success(fetch_all(&state, &filter, DETALLE_SELECT, DETALLE_FROM).await?))
}

/// POST /:id/detalles
pub async fn create_detalle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<DetalleInput>,
) -> ApiResult<DetalleTarea> {
    body.validate_create()?;
    let tarea = load(&state, id).await?;
    ensure_mutate(&user, &tarea, Level::SUPERVISOR)?;

    let mut record = body.into_record();
    record
        .set("fktarea", id)
        .set("login_registrado", user.login.as_str())
        .set_now("fecha_registro");
    if !record.contains("estatus") {
        record.set("estatus", EstatusTarea::Pendiente);
    }

    let detalle = inserted_id(detalles(&state).insert(&record).await?)?;
    info!(idtarea = id, iddetalletarea = detalle, "task detail created");
    Ok(ApiResponse::created(load_detalle(&state, detalle).await?))
}

/// GET /detalles/:id
pub async fn show_detalle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<DetalleTarea> {
    let detalle = load_detalle(&state, id).await?;
    let tarea = load(&state, detalle.fktarea).await?;
    ensure_access(&user, &tarea, Level::SUPERVISOR)?;
    Ok(ApiResponse::success(detalle))
}

/// PUT /detalles/:id
pub async fn update_detalle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<DetalleInput>,
) -> ApiResult<DetalleTarea> {
    body.validate_dates()?;
    let detalle = load_detalle(&state, id).await?;
    let tarea = load(&state, detalle.fktarea).await?;
    ensure_mutate(&user, &tarea, Level::SUPERVISOR)?;

    let mut record = body.into_record();
    stamp_update(&mut record, &user)?;
    detalles(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load_detalle(&state, id).await?))
}

/// PATCH /detalles/:id/status
pub async fn update_detalle_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<DetalleStatusInput>,
) -> ApiResult<DetalleTarea> {
    let mut record = body.into_record(Local::now().naive_local())?;
    let detalle = load_detalle(&state, id).await?;
    let tarea = load(&state, detalle.fktarea).await?;
    ensure_mutate(&user, &tarea, Level::SUPERVISOR)?;

    stamp_update(&mut record, &user)?;
    detalles(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load_detalle(&state, id).await?))
}
