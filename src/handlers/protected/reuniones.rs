// handlers/protected/reuniones.rs - /api-bitacora/reuniones

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::database::models::reunion::{Reunion, ReunionInput, ReunionQuery, REUNION_FROM, REUNION_SELECT};
use crate::database::{IntoRecord, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::{ensure_mutate, fetch_all, fetch_joined, fetch_page, inserted_id, stamp_update};
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Page};
use crate::policy::Level;
use crate::state::AppState;

const NOT_FOUND: &str = "Reunión no encontrada";

fn repo(state: &AppState) -> Repository<Reunion> {
    Repository::new(&state.db, "reuniones", "idreunion")
}

/// Also used by minutas and integrantes, whose access follows the meeting.
pub(crate) async fn load(state: &AppState, id: i32) -> Result<Reunion, ApiError> {
    fetch_joined(state, REUNION_SELECT, REUNION_FROM, "r.idreunion", id, NOT_FOUND).await
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn newest_first(filter: &mut Filter) {
    filter
        .order(FilterOrderInfo::desc("r.fecha_inicio"))
        .order(FilterOrderInfo::desc("r.hora_inicio"));
}

pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<PageQuery>) -> ApiResult<Page<Reunion>> {
    let mut filter = Filter::new();
    newest_first(&mut filter);
    let page = fetch_page(&state, &mut filter, REUNION_SELECT, REUNION_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReunionQuery>,
) -> ApiResult<Page<Reunion>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    newest_first(&mut filter);
    let page = fetch_page(&state, &mut filter, REUNION_SELECT, REUNION_FROM, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

pub async fn by_area(State(state): State<AppState>, ApiPath(area): ApiPath<i32>) -> ApiResult<Vec<Reunion>> {
    let mut filter = Filter::new();
    filter.where_clause().eq("r.fkarea", area);
    newest_first(&mut filter);
    Ok(ApiResponse::success(fetch_all(&state, &filter, REUNION_SELECT, REUNION_FROM).await?))
}

pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<Reunion> {
    Ok(ApiResponse::success(load(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<ReunionInput>,
) -> ApiResult<Reunion> {
    body.validate_create()?;

    let mut record = body.into_record();
    if !record.contains("fkarea") {
        record.set_opt("fkarea", user.fkarea);
    }
    record
        .set("login_registrado", user.login.as_str())
        .set_now("fecha_registrado");

    let id = inserted_id(repo(&state).insert(&record).await?)?;
    info!(idreunion = id, login = %user.login, "meeting created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<ReunionInput>,
) -> ApiResult<Reunion> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;
    body.validate_dates()?;

    let inicio = body.fecha_inicio.unwrap_or(current.fecha_inicio);
    if let Some(fin) = body.fecha_fin.or(current.fecha_fin) {
        if fin < inicio {
            return Err(ApiError::bad_request(
                "La fecha de fin no puede ser anterior a la fecha de inicio",
            ));
        }
    }

    let mut record = body.into_record();
    stamp_update(&mut record, &user)?;
    repo(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// Meetings that still have minutes or attendees are refused by the foreign keys.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    let current = load(&state, id).await?;
    ensure_mutate(&user, &current, Level::SUPERVISOR)?;

    repo(&state).delete(id).await?;
    info!(idreunion = id, login = %user.login, "meeting deleted");
    Ok(ApiResponse::success(message("Reunión eliminada exitosamente")))
}
