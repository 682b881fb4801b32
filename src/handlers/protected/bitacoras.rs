// handlers/protected/bitacoras.rs - /api-bitacora/bitacoras

use axum::extract::{Extension, State};
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::bitacora::{
    Bitacora, BitacoraInput, BitacoraQuery, EstatusBitacora, BITACORA_FROM, BITACORA_SCOPE, BITACORA_SELECT,
};
use crate::database::models::StatusInput;
use crate::database::query_builder::execute_on;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::protected::board::{set_on_board, BoardState, Origin};
use crate::handlers::{ensure_access, ensure_mutate, fetch_joined, fetch_page, inserted_id, stamp_update, store_today};
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::{scope_filter, Level};
use crate::state::AppState;

const NOT_FOUND: &str = "Bitácora no encontrada";

fn repo(state: &AppState) -> Repository<Bitacora> {
    Repository::new(&state.db, "bitacora", "idbitacora")
}

pub(crate) async fn load(state: &AppState, id: i32) -> Result<Bitacora, ApiError> {
    fetch_joined(state, BITACORA_SELECT, BITACORA_FROM, "b.idbitacora", id, NOT_FOUND).await
}

/// GET / and GET /search
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<BitacoraQuery>,
) -> ApiResult<Page<Bitacora>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    scope_filter(filter.where_clause(), &user, Level::SUPERVISOR, BITACORA_SCOPE);
    filter
        .order(FilterOrderInfo::desc("b.fecha"))
        .order(FilterOrderInfo::desc("b.fecha_hora_registrado"));

    let page = fetch_page(&state, &mut filter, BITACORA_SELECT, BITACORA_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Bitacora> {
    let bitacora = load(&state, id).await?;
    ensure_access(&user, &bitacora, Level::SUPERVISOR)?;
    Ok(ApiResponse::success(bitacora))
}

/// The caller owns the new entry; the area defaults to the caller's.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<BitacoraInput>,
) -> ApiResult<Bitacora> {
    body.validate_create()?;
    let fkarea = body
        .fkarea
        .or(user.fkarea)
        .ok_or_else(|| ApiError::missing_fields(&["fkarea"]))?;

    let mut record = body.into_record();
    record
        .set("login", user.login.as_str())
        .set("fkarea", fkarea)
        .set_now("fecha_hora_registrado");
    if !record.contains("estatus") {
        record.set("estatus", EstatusBitacora::Activo);
    }

    let id = inserted_id(repo(&state).insert(&record).await?)?;
    info!(idbitacora = id, login = %user.login, "log entry created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<BitacoraInput>,
) -> ApiResult<Bitacora> {
    body.validate_common()?;
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
    ApiJson(body): ApiJson<StatusInput<EstatusBitacora>>,
) -> ApiResult<Bitacora> {
    let estatus = body.require()?;
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = Record::new();
    record.set("estatus", estatus);
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    info!(idbitacora = id, estatus = %estatus, "log entry status changed");
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// Removes the derived bulletin with the entry. Entries that still have
/// attachments are refused by the foreign key (409).
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut tx = state.db.begin().await?;
    for query in [
        "DELETE FROM carteleras WHERE fkbitacora = ?",
        "DELETE FROM bitacora WHERE idbitacora = ?",
    ] {
        let sql = SqlResult { query: query.to_string(), params: vec![json!(id)] };
        execute_on(&mut tx, &sql).await?;
    }
    tx.commit().await?;

    info!(idbitacora = id, login = %user.login, "log entry deleted");
    Ok(ApiResponse::success(message("Bitácora eliminada exitosamente")))
}

/// POST /:id/cartelera
pub async fn board_on(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<BoardState> {
    toggle(state, user, id, true).await
}

/// DELETE /:id/cartelera
pub async fn board_off(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<BoardState> {
    toggle(state, user, id, false).await
}

async fn toggle(state: AppState, user: AuthUser, id: i32, want_on: bool) -> ApiResult<BoardState> {
    let bitacora = load(&state, id).await?;
    ensure_mutate(&user, &bitacora, Level::SUPERVISOR)?;

    let bulletin = bitacora.derived_bulletin(&user.login, store_today(&state).await?);
    let result = set_on_board(&state, Origin::Bitacora(id), bulletin, want_on).await?;
    Ok(ApiResponse::success(result))
}
