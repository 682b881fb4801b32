// handlers/protected/menus.rs - /api-bitacora/menus

use std::collections::HashMap;

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlConnection;
use tracing::{info, warn};

use crate::database::models::menu::{Menu, MenuInput, MenuParent, MenuStatusInput, USER_MENUS_SQL};
use crate::database::query_builder;
use crate::database::{DatabaseError, IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::inserted_id;
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::policy::menu_tree::{build_tree, check_reparent, MenuNode, MenuTreeError};
use crate::policy::Level;
use crate::state::AppState;

const TABLE: &str = "menus";
const NOT_FOUND: &str = "Menú no encontrado";

fn repo(state: &AppState) -> Repository<Menu> {
    Repository::new(&state.db, TABLE, "idmenu")
}

async fn load(state: &AppState, id: i32) -> Result<Menu, ApiError> {
    Ok(repo(state).select_404(id, NOT_FOUND).await?)
}

async fn user_menus(state: &AppState, login: &str) -> Result<Vec<Menu>, ApiError> {
    let sql = SqlResult { query: USER_MENUS_SQL.to_string(), params: vec![json!(login)] };
    Ok(query_builder::fetch_all(state.db.pool(), &sql).await?)
}

/// Current parent of every menu, keyed by id. The rows stay locked until the
/// surrounding transaction ends, so tree checks and the write they guard see
/// the same hierarchy.
async fn lock_parent_map(conn: &mut MySqlConnection) -> Result<HashMap<i32, Option<i32>>, ApiError> {
    let rows: Vec<MenuParent> = sqlx::query_as("SELECT idmenu, idpadre FROM menus FOR UPDATE")
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|r| (r.idmenu, r.idpadre)).collect())
}

async fn locked_count(conn: &mut MySqlConnection, query: &str, id: i32) -> Result<i64, ApiError> {
    let sql = SqlResult { query: query.to_string(), params: vec![json!(id)] };
    Ok(query_builder::fetch_count_on(conn, &sql).await?)
}

/// GET /user
pub async fn user_tree(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<MenuNode<Menu>>> {
    let rows = user_menus(&state, &user.login).await?;
    Ok(ApiResponse::success(build_tree(rows)))
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    pub login: Option<String>,
}

/// GET /tree[?login=] - other users' trees are SYSTEM-only.
pub async fn tree(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<TreeQuery>,
) -> ApiResult<Vec<MenuNode<Menu>>> {
    let login = match query.login.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(login) if login != user.login => {
            user.require(Level::SYSTEM)?;
            login.to_string()
        }
        _ => user.login.clone(),
    };
    let rows = user_menus(&state, &login).await?;
    Ok(ApiResponse::success(build_tree(rows)))
}

pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Menu>> {
    user.require(Level::SYSTEM)?;
    let mut filter = Filter::new();
    filter
        .order(FilterOrderInfo::asc("orden"))
        .order(FilterOrderInfo::asc("idmenu"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Menu> {
    user.require(Level::SYSTEM)?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// GET /parent/:parent_id/:user
///
/// `null` (or `0`) lists every root menu; a parent id lists that parent's active
/// children the user holds an active permission for.
pub async fn by_parent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((parent, login)): ApiPath<(String, String)>,
) -> ApiResult<Vec<Menu>> {
    user.require(Level::SYSTEM)?;

    let mut filter = Filter::new();
    match parent.trim() {
        "null" | "0" => {
            filter.where_clause().raw("(idpadre IS NULL OR idpadre = 0)");
        }
        id => {
            let id: i32 = id
                .parse()
                .map_err(|_| ApiError::bad_request("Identificador de menú padre inválido"))?;
            filter
                .where_clause()
                .eq("idpadre", id)
                .eq("estatus", true)
                .raw_with(
                    "idmenu IN (SELECT idmenu FROM menus_usuarios WHERE estatus = 'ACTIVO' AND login = ?)",
                    vec![json!(login)],
                );
        }
    }
    filter
        .order(FilterOrderInfo::asc("orden"))
        .order(FilterOrderInfo::asc("idmenu"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<MenuInput>,
) -> ApiResult<Menu> {
    user.require(Level::SYSTEM)?;
    body.validate_create()?;

    let mut tx = state.db.begin().await?;
    if let Some(Some(parent)) = body.requested_parent() {
        let parents = lock_parent_map(&mut tx).await?;
        if !parents.contains_key(&parent) {
            return Err(MenuTreeError::UnknownParent(parent).into());
        }
    }
    let result = query_builder::execute_on(&mut tx, &body.into_record().insert_sql(TABLE)).await?;
    tx.commit().await?;

    let id = inserted_id(result.last_insert_id())?;
    info!(idmenu = id, login = %user.login, "menu created");
    Ok(ApiResponse::created(load(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<MenuInput>,
) -> ApiResult<Menu> {
    user.require(Level::SYSTEM)?;
    let parent = body.requested_parent();
    let record = body.into_record();
    if record.is_empty() {
        return Err(DatabaseError::EmptyChangeset.into());
    }

    let mut tx = state.db.begin().await?;
    let parents = lock_parent_map(&mut tx).await?;
    if !parents.contains_key(&id) {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    if let Some(parent) = parent {
        if let Err(err) = check_reparent(&parents, id, parent) {
            warn!(idmenu = id, error = %err, "menu reparent rejected");
            return Err(err.into());
        }
    }
    query_builder::execute_on(&mut tx, &record.update_sql(TABLE, &[("idmenu", json!(id))])).await?;
    tx.commit().await?;

    Ok(ApiResponse::success(load(&state, id).await?))
}

/// PATCH /:id/estatus
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<MenuStatusInput>,
) -> ApiResult<Menu> {
    user.require(Level::SYSTEM)?;
    let estatus = body.estatus.ok_or_else(|| ApiError::missing_fields(&["estatus"]))?;
    load(&state, id).await?;

    let mut record = Record::new();
    record.set("estatus", estatus);
    repo(&state).update(id, &record).await?;
    Ok(ApiResponse::success(load(&state, id).await?))
}

/// Menus with submenus or user grants are kept.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    user.require(Level::SYSTEM)?;

    let mut tx = state.db.begin().await?;
    let parents = lock_parent_map(&mut tx).await?;
    if !parents.contains_key(&id) {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    if parents.values().any(|p| *p == Some(id)) {
        return Err(ApiError::conflict("No se puede eliminar un menú que tiene submenús"));
    }
    let grants = locked_count(
        &mut tx,
        "SELECT COUNT(*) AS count FROM menus_usuarios WHERE idmenu = ? FOR UPDATE",
        id,
    )
    .await?;
    if grants > 0 {
        return Err(ApiError::conflict("No se puede eliminar un menú asignado a usuarios"));
    }

    query_builder::execute_on(
        &mut tx,
        &SqlResult { query: "DELETE FROM menus WHERE idmenu = ?".to_string(), params: vec![json!(id)] },
    )
    .await?;
    tx.commit().await?;

    info!(idmenu = id, login = %user.login, "menu deleted");
    Ok(ApiResponse::success(message("Menú eliminado exitosamente")))
}
