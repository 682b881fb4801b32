// handlers/protected/menus_usuarios.rs - /api-bitacora/menus-usuarios
//
// Grants are keyed by (idmenu, login); everything except /my-menus is SYSTEM-only.

use axum::extract::{Extension, State};
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::menu_usuario::{
    BulkAssignInput, MenuUsuario, MenuUsuarioDetalle, MenuUsuarioInput, Permisos, MY_MENUS_SQL,
};
use crate::database::query_builder::{self, execute_on};
use crate::database::{DatabaseError, IntoRecord};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::fetch_all;
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

const TABLE: &str = "menus_usuarios";
const NOT_FOUND: &str = "Permiso de menú no encontrado";

async fn find(state: &AppState, idmenu: i32, login: &str) -> Result<Option<MenuUsuario>, ApiError> {
    let mut filter = Filter::new();
    filter.where_clause().eq("idmenu", idmenu).eq("login", login);
    filter.limit(1, 0);
    Ok(query_builder::fetch_optional(state.db.pool(), &filter.to_sql("*", TABLE)).await?)
}

async fn load(state: &AppState, idmenu: i32, login: &str) -> Result<MenuUsuario, ApiError> {
    find(state, idmenu, login)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

async fn grants_where(state: &AppState, column: &str, value: Value) -> Result<Vec<MenuUsuario>, ApiError> {
    let mut filter = Filter::new();
    filter.where_clause().eq(column, value);
    filter
        .order(FilterOrderInfo::asc("idmenu"))
        .order(FilterOrderInfo::asc("login"));
    fetch_all(state, &filter, "*", TABLE).await
}

async fn details_for(state: &AppState, login: &str) -> Result<Vec<MenuUsuarioDetalle>, ApiError> {
    let sql = SqlResult { query: MY_MENUS_SQL.to_string(), params: vec![json!(login)] };
    Ok(query_builder::fetch_all(state.db.pool(), &sql).await?)
}

/// GET /my-menus
pub async fn my_menus(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<MenuUsuarioDetalle>> {
    Ok(ApiResponse::success(details_for(&state, &user.login).await?))
}

pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<MenuUsuario>> {
    user.require(Level::SYSTEM)?;
    let mut filter = Filter::new();
    filter
        .order(FilterOrderInfo::asc("login"))
        .order(FilterOrderInfo::asc("idmenu"));
    Ok(ApiResponse::success(fetch_all(&state, &filter, "*", TABLE).await?))
}

/// GET /menu/:idmenu/:login
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((idmenu, login)): ApiPath<(i32, String)>,
) -> ApiResult<MenuUsuario> {
    user.require(Level::SYSTEM)?;
    Ok(ApiResponse::success(load(&state, idmenu, &login).await?))
}

/// GET /menu/:idmenu
pub async fn by_menu(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(idmenu): ApiPath<i32>,
) -> ApiResult<Vec<MenuUsuario>> {
    user.require(Level::SYSTEM)?;
    Ok(ApiResponse::success(grants_where(&state, "idmenu", json!(idmenu)).await?))
}

/// GET /usuario/:login
pub async fn by_usuario(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
) -> ApiResult<Vec<MenuUsuario>> {
    user.require(Level::SYSTEM)?;
    Ok(ApiResponse::success(grants_where(&state, "login", json!(login)).await?))
}

/// GET /usuario/:login/details
pub async fn usuario_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
) -> ApiResult<Vec<MenuUsuarioDetalle>> {
    user.require(Level::SYSTEM)?;
    Ok(ApiResponse::success(details_for(&state, &login).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<MenuUsuarioInput>,
) -> ApiResult<MenuUsuario> {
    user.require(Level::SYSTEM)?;
    let (idmenu, login) = body.validate()?;
    if find(&state, idmenu, &login).await?.is_some() {
        return Err(ApiError::conflict("El usuario ya tiene asignado este menú"));
    }

    let mut record = body.permisos().with_defaults().into_record();
    record.set("idmenu", idmenu).set("login", login.as_str());
    query_builder::execute(state.db.pool(), &record.insert_sql(TABLE)).await?;

    info!(idmenu, login = %login, granted_by = %user.login, "menu granted");
    Ok(ApiResponse::created(load(&state, idmenu, &login).await?))
}

/// POST /:login/bulk-assign - replaces every grant of the user.
pub async fn bulk_assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
    ApiJson(body): ApiJson<BulkAssignInput>,
) -> ApiResult<Vec<MenuUsuario>> {
    user.require(Level::SYSTEM)?;
    let menu_ids = body.validate()?;
    let permisos = body.permisos.with_defaults();

    let mut tx = state.db.begin().await?;
    let clear = SqlResult {
        query: format!("DELETE FROM {} WHERE login = ?", TABLE),
        params: vec![json!(login)],
    };
    execute_on(&mut tx, &clear).await?;
    for idmenu in &menu_ids {
        let mut record = permisos.clone().into_record();
        record.set("idmenu", *idmenu).set("login", login.as_str());
        execute_on(&mut tx, &record.insert_sql(TABLE)).await?;
    }
    tx.commit().await?;

    info!(login = %login, count = menu_ids.len(), granted_by = %user.login, "menu grants replaced");
    Ok(ApiResponse::success(grants_where(&state, "login", json!(login)).await?))
}

/// PUT /:idmenu/:login
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((idmenu, login)): ApiPath<(i32, String)>,
    ApiJson(body): ApiJson<Permisos>,
) -> ApiResult<MenuUsuario> {
    user.require(Level::SYSTEM)?;
    load(&state, idmenu, &login).await?;

    let record = body.into_record();
    if record.is_empty() {
        return Err(DatabaseError::EmptyChangeset.into());
    }
    let sql = record.update_sql(TABLE, &[("idmenu", json!(idmenu)), ("login", json!(login))]);
    query_builder::execute(state.db.pool(), &sql).await?;
    Ok(ApiResponse::success(load(&state, idmenu, &login).await?))
}

/// DELETE /:idmenu/:login
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((idmenu, login)): ApiPath<(i32, String)>,
) -> ApiResult<Value> {
    user.require(Level::SYSTEM)?;
    load(&state, idmenu, &login).await?;

    let sql = SqlResult {
        query: format!("DELETE FROM {} WHERE idmenu = ? AND login = ?", TABLE),
        params: vec![json!(idmenu), json!(login)],
    };
    query_builder::execute(state.db.pool(), &sql).await?;
    info!(idmenu, login = %login, revoked_by = %user.login, "menu grant revoked");
    Ok(ApiResponse::success(message("Permiso de menú eliminado exitosamente")))
}
