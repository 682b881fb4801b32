// handlers/protected/incidencias.rs - /api-bitacora/incidencias

use axum::extract::{Extension, State};
use tracing::info;

use crate::database::models::incidencia::{
    EstatusIncidencia, Incidencia, IncidenciaInput, IncidenciaQuery, INCIDENCIA_FROM, INCIDENCIA_SCOPE,
    INCIDENCIA_SELECT,
};
use crate::database::models::StatusInput;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::protected::board::{set_on_board, BoardState, Origin};
use crate::handlers::{ensure_access, ensure_mutate, fetch_joined, fetch_page, inserted_id, stamp_update, store_today};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::{scope_filter, Level};
use crate::state::AppState;

const NOT_FOUND: &str = "Incidencia no encontrada";

fn repo(state: &AppState) -> Repository<Incidencia> {
    Repository::new(&state.db, "incidencias", "idincidencia")
}

async fn load(state: &AppState, id: i32) -> Result<Incidencia, ApiError> {
    fetch_joined(state, INCIDENCIA_SELECT, INCIDENCIA_FROM, "i.idincidencia", id, NOT_FOUND).await
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<IncidenciaQuery>,
) -> ApiResult<Page<Incidencia>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    scope_filter(filter.where_clause(), &user, Level::SUPERVISOR, INCIDENCIA_SCOPE);
    filter
        .order(FilterOrderInfo::desc("i.fecha"))
        .order(FilterOrderInfo::desc("i.hora"));

    let page = fetch_page(&state, &mut filter, INCIDENCIA_SELECT, INCIDENCIA_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Incidencia> {
    let incidencia = load(&state, id).await?;
    ensure_access(&user, &incidencia, Level::SUPERVISOR)?;
    Ok(ApiResponse::success(incidencia))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<IncidenciaInput>,
) -> ApiResult<Incidencia> {
    body.validate_create()?;
    let fkarea = body
        .fkarea
        .or(user.fkarea)
        .ok_or_else(|| ApiError::missing_fields(&["fkarea"]))?;

    let mut record = body.into_record();
    record
        .set("fkarea", fkarea)
        .set("login", user.login.as_str())
        .set_now("fecha_registro");
    if !record.contains("estatus") {
        record.set("estatus", EstatusIncidencia::Activo);
    }

    let id = inserted_id(repo(&state).insert(&record).await?)?;
    info!(idincidencia = id, login = %user.login, "incident created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<IncidenciaInput>,
) -> ApiResult<Incidencia> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = body.into_record();
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<StatusInput<EstatusIncidencia>>,
) -> ApiResult<Incidencia> {
    let estatus = body.require()?;
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = Record::new();
    record.set("estatus", estatus);
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    info!(idincidencia = id, estatus = %estatus, "incident status changed");
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn board_on(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<BoardState> {
    toggle(state, user, id, true).await
}

pub async fn board_off(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<BoardState> {
    toggle(state, user, id, false).await
}

async fn toggle(state: AppState, user: AuthUser, id: i32, want_on: bool) -> ApiResult<BoardState> {
    let incidencia = load(&state, id).await?;
    ensure_mutate(&user, &incidencia, Level::SUPERVISOR)?;

    let bulletin = incidencia.derived_bulletin(&user.login, store_today(&state).await?);
    let result = set_on_board(&state, Origin::Incidencia(id), bulletin, want_on).await?;
    Ok(ApiResponse::success(result))
}
