// handlers/protected/force_catalogos.rs - /api-bitacora/sistemas-force and /senales-force
//
// Both catalogs share one set of handlers; the route picks the catalog through
// the type parameter.

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::force::{CatalogEntry, CatalogInput, CatalogKind};
use crate::database::query_builder;
use crate::database::{IntoRecord, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::{fetch_all, inserted_id};
use crate::middleware::{message, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

pub trait Catalog: Send + Sync + 'static {
    const KIND: CatalogKind;
}

pub struct Sistemas;
pub struct Senales;

impl Catalog for Sistemas {
    const KIND: CatalogKind = CatalogKind::Sistema;
}

impl Catalog for Senales {
    const KIND: CatalogKind = CatalogKind::Senal;
}

fn repo(state: &AppState, kind: CatalogKind) -> Repository<CatalogEntry> {
    Repository::new(&state.db, kind.table(), kind.id_column())
}

fn select(kind: CatalogKind) -> String {
    format!("{} AS id, descripcion", kind.id_column())
}

fn not_found(kind: CatalogKind) -> String {
    format!("{} no encontrado", kind.label())
}

pub(crate) async fn load(state: &AppState, kind: CatalogKind, id: i32) -> Result<CatalogEntry, ApiError> {
    let mut filter = Filter::new();
    filter.where_clause().eq(kind.id_column(), id);
    filter.limit(1, 0);
    query_builder::fetch_optional(state.db.pool(), &filter.to_sql(&select(kind), kind.table()))
        .await?
        .ok_or_else(|| ApiError::not_found(not_found(kind)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub descripcion: Option<String>,
}

/// GET / and GET /search?descripcion=
pub async fn list<C: Catalog>(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResult<Vec<CatalogEntry>> {
    let mut filter = Filter::new();
    if let Some(text) = query.descripcion.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter.where_clause().contains("descripcion", text);
    }
    filter.order(FilterOrderInfo::asc("descripcion"));
    let rows = fetch_all(&state, &filter, &select(C::KIND), C::KIND.table()).await?;
    Ok(ApiResponse::success(rows))
}

pub async fn show<C: Catalog>(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> ApiResult<CatalogEntry> {
    Ok(ApiResponse::success(load(&state, C::KIND, id).await?))
}

pub async fn create<C: Catalog>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CatalogInput>,
) -> ApiResult<CatalogEntry> {
    user.require(Level::SYSTEM)?;
    body.validate()?;

    let id = inserted_id(repo(&state, C::KIND).insert(&body.into_record()).await?)?;
    info!(table = C::KIND.table(), id, "force catalog entry created");
    Ok(ApiResponse::created(load(&state, C::KIND, id).await?))
}

pub async fn update<C: Catalog>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<CatalogInput>,
) -> ApiResult<CatalogEntry> {
    user.require(Level::SYSTEM)?;
    body.validate()?;
    load(&state, C::KIND, id).await?;

    repo(&state, C::KIND).update(id, &body.into_record()).await?;
    Ok(ApiResponse::success(load(&state, C::KIND, id).await?))
}

/// Entries still referenced by a force record cannot be removed.
pub async fn remove<C: Catalog>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Value> {
    user.require(Level::SYSTEM)?;
    load(&state, C::KIND, id).await?;

    let usage = SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM `force` WHERE {} = ?", C::KIND.force_column()),
        params: vec![json!(id)],
    };
    let references = query_builder::fetch_count(state.db.pool(), &usage).await?;
    if references > 0 {
        return Err(ApiError::conflict(format!(
            "{} en uso por {} registro(s) de force",
            C::KIND.label(),
            references
        )));
    }

    repo(&state, C::KIND).delete(id).await?;
    info!(table = C::KIND.table(), id, "force catalog entry deleted");
    Ok(ApiResponse::success(message(format!("{} eliminado exitosamente", C::KIND.label()))))
}
