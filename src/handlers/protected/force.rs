// handlers/protected/force.rs - /api-bitacora/force

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::database::models::force::{
    CatalogKind, EstatusForce, Force, ForceInput, ForceQuery, FORCE_FROM, FORCE_SELECT,
};
use crate::database::models::StatusInput;
use crate::database::{IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::protected::force_catalogos;
use crate::handlers::{ensure_mutate, fetch_all, fetch_joined, fetch_page, inserted_id, stamp_update};
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::Level;
use crate::state::AppState;

const NOT_FOUND: &str = "Force no encontrado";

fn repo(state: &AppState) -> Repository<Force> {
    Repository::new(&state.db, "force", "idforce")
}

async fn load(state: &AppState, id: i32) -> Result<Force, ApiError> {
    fetch_joined(state, FORCE_SELECT, FORCE_FROM, "f.idforce", id, NOT_FOUND).await
}

/// Every catalog id given in the body must exist.
async fn check_catalogs(state: &AppState, body: &ForceInput) -> Result<(), ApiError> {
    for (kind, id) in [(CatalogKind::Senal, body.fksenal), (CatalogKind::Sistema, body.fksistema)] {
        let Some(id) = id else { continue };
        match force_catalogos::load(state, kind, id).await {
            Ok(_) => {}
            Err(e) if e.status_code() == 404 => {
                return Err(ApiError::bad_request(format!("{} {} no existe", kind.label(), id)));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn newest_first(filter: &mut Filter) {
    filter.order(FilterOrderInfo::desc("f.fecha_registrado"));
}

/// GET / and GET /search
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<ForceQuery>) -> ApiResult<Page<Force>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    newest_first(&mut filter);
    let page = fetch_page(&state, &mut filter, FORCE_SELECT, FORCE_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn by_sistema(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Vec<Force>> {
    by_catalog(&state, "f.fksistema", id).await
}

pub async fn by_senal(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Vec<Force>> {
    by_catalog(&state, "f.fksenal", id).await
}

async fn by_catalog(state: &AppState, column: &str, id: i32) -> ApiResult<Vec<Force>> {
    let mut filter = Filter::new();
    filter.where_clause().eq(column, id);
    newest_first(&mut filter);
    Ok(ApiResponse::success(fetch_all(state, &filter, FORCE_SELECT, FORCE_FROM).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Force> {
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<ForceInput>,
) -> ApiResult<Force> {
    body.validate_create()?;
    check_catalogs(&state, &body).await?;

    let mut record = body.into_record();
    record
        .set("login_registrado", user.login.as_str())
        .set_now("fecha_registrado");
    if !record.contains("estatusforce") {
        record.set("estatusforce", EstatusForce::Activo);
    }

    let id = inserted_id(repo(&state).insert(&record).await?)?;
    info!(idforce = id, login = %user.login, "force created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

/// Partial update. Closed records are read-only.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<ForceInput>,
) -> ApiResult<Force> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;
    if current.is_closed() {
        return Err(ApiError::bad_request(format!(
            "No se puede modificar un force {}",
            current.estatusforce
        )));
    }
    check_catalogs(&state, &body).await?;

    let mut record = body.into_record();
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<StatusInput<EstatusForce>>,
) -> ApiResult<Force> {
    let estatus = body.require()?;
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;
    current.check_transition(estatus)?;

    let mut record = Record::new();
    record.set("estatusforce", estatus);
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    info!(idforce = id, estatus = %estatus, "force status changed");
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    repo(&state).delete(id).await?;
    info!(idforce = id, login = %user.login, "force deleted");
    Ok(ApiResponse::success(message("Force eliminado exitosamente")))
}
