// handlers/protected/carteleras.rs - /api-bitacora/carteleras

use axum::extract::{Extension, State};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::database::models::cartelera::{
    Cartelera, CarteleraInput, CarteleraQuery, EstatusCartelera, CARTELERA_FROM, CARTELERA_SCOPE,
    CARTELERA_SELECT, EXPIRE_SQL,
};
use crate::database::models::StatusInput;
use crate::database::query_builder::execute_on;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::{ensure_access, ensure_mutate, fetch_all, fetch_joined, fetch_page, inserted_id};
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::{scope_filter, Level};
use crate::state::AppState;

const NOT_FOUND: &str = "Cartelera no encontrada";

fn repo(state: &AppState) -> Repository<Cartelera> {
    Repository::new(&state.db, "carteleras", "idcartelera")
}

async fn load(state: &AppState, id: i32) -> Result<Cartelera, ApiError> {
    fetch_joined(state, CARTELERA_SELECT, CARTELERA_FROM, "c.idcartelera", id, NOT_FOUND).await
}

/// Move lapsed ACTIVO bulletins to VENCIDO.
pub(crate) async fn expire_lapsed(state: &AppState) -> Result<(), ApiError> {
    let result = sqlx::query(EXPIRE_SQL).execute(state.db.pool()).await?;
    if result.rows_affected() > 0 {
        debug!(count = result.rows_affected(), "bulletins expired");
    }
    Ok(())
}

/// GET / and GET /search
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<CarteleraQuery>,
) -> ApiResult<Page<Cartelera>> {
    expire_lapsed(&state).await?;

    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    scope_filter(filter.where_clause(), &user, Level::SUPERVISOR, CARTELERA_SCOPE);
    filter
        .order(FilterOrderInfo::desc("c.fecha_inicio_publicacion"))
        .order(FilterOrderInfo::desc("c.idcartelera"));

    let page = fetch_page(&state, &mut filter, CARTELERA_SELECT, CARTELERA_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn by_area(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(area): ApiPath<i32>,
) -> ApiResult<Vec<Cartelera>> {
    expire_lapsed(&state).await?;

    let mut filter = Filter::new();
    filter.where_clause().eq("c.fkarea", area);
    scope_filter(filter.where_clause(), &user, Level::SUPERVISOR, CARTELERA_SCOPE);
    filter.order(FilterOrderInfo::desc("c.fecha_inicio_publicacion"));

    Ok(ApiResponse::success(fetch_all(&state, &filter, CARTELERA_SELECT, CARTELERA_FROM).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Cartelera> {
    let cartelera = load(&state, id).await?;
    ensure_access(&user, &cartelera, Level::SUPERVISOR)?;
    Ok(ApiResponse::success(cartelera))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CarteleraInput>,
) -> ApiResult<Cartelera> {
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
        record.set("estatus", EstatusCartelera::Activo);
    }

    let id = inserted_id(repo(&state).insert(&record).await?)?;
    info!(idcartelera = id, login = %user.login, "bulletin created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<CarteleraInput>,
) -> ApiResult<Cartelera> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;
    body.validate_window_against(Some(&current))?;

    repo(&state).update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<StatusInput<EstatusCartelera>>,
) -> ApiResult<Cartelera> {
    let estatus = body.require()?;
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut record = Record::new();
    record.set("estatus", estatus);
    repo(&state).update(id, &record).await?;
    info!(idcartelera = id, estatus = %estatus, "bulletin status changed");
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// Deleting a derived bulletin also clears `en_cartelera` on its origin.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    let mut tx = state.db.begin().await?;
    if let Some(bitacora) = current.fkbitacora {
        let clear = SqlResult {
            query: "UPDATE bitacora SET en_cartelera = 0 WHERE idbitacora = ?".to_string(),
            params: vec![json!(bitacora)],
        };
        execute_on(&mut tx, &clear).await?;
    }
    if let Some(incidencia) = current.fkincidencia {
        let clear = SqlResult {
            query: "UPDATE incidencias SET en_cartelera = 0 WHERE idincidencia = ?".to_string(),
            params: vec![json!(incidencia)],
        };
        execute_on(&mut tx, &clear).await?;
    }
    let delete = SqlResult {
        query: "DELETE FROM carteleras WHERE idcartelera = ?".to_string(),
        params: vec![json!(id)],
    };
    execute_on(&mut tx, &delete).await?;
    tx.commit().await?;

    info!(idcartelera = id, login = %user.login, "bulletin deleted");
    Ok(ApiResponse::success(message("Cartelera eliminada exitosamente")))
}
