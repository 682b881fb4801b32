// handlers/protected/old_bitacoras.rs - /api-bitacora/old-bitacoras
//
// Read-only access to the logs kept from the previous system.

use axum::extract::State;

use crate::database::models::old_bitacora::{OldBitacora, OldBitacoraCatalogos, OldBitacoraQuery};
use crate::database::models::{parse_date, parse_time, sql_date, sql_time};
use crate::database::query_builder;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::fetch_page;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, Page};
use crate::state::AppState;

const TABLE: &str = "old_bitacoras";

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OldBitacoraQuery>,
) -> ApiResult<Page<OldBitacora>> {
    let mut filter = Filter::new();
    query.apply(filter.where_clause());
    for info in query.order()? {
        filter.order(info);
    }
    let page = fetch_page(&state, &mut filter, "*", TABLE, query.page, query.limit).await?;
    Ok(ApiResponse::success(page))
}

async fn distinct(state: &AppState, column: &str) -> Result<Vec<String>, ApiError> {
    let query = format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL AND {col} <> '' ORDER BY {col}",
        col = column,
        table = TABLE
    );
    Ok(sqlx::query_scalar(&query).fetch_all(state.db.pool()).await?)
}

/// GET /catalogos
pub async fn catalogos(State(state): State<AppState>) -> ApiResult<OldBitacoraCatalogos> {
    Ok(ApiResponse::success(OldBitacoraCatalogos {
        tipos: distinct(&state, "tipo").await?,
        turnos: distinct(&state, "turno").await?,
        usuarios: distinct(&state, "usuario").await?,
    }))
}

/// GET /:fecha/:hora
pub async fn show(
    State(state): State<AppState>,
    ApiPath((fecha, hora)): ApiPath<(String, String)>,
) -> ApiResult<OldBitacora> {
    let fecha = parse_date(&fecha).ok_or_else(|| ApiError::bad_request("Fecha inválida, use YYYY-MM-DD"))?;
    let hora = parse_time(&hora).ok_or_else(|| ApiError::bad_request("Hora inválida, use HH:MM:SS"))?;

    let mut filter = Filter::new();
    filter
        .where_clause()
        .eq("fecha", sql_date(fecha))
        .eq("hora", sql_time(hora));
    filter.limit(1, 0);

    let entry = query_builder::fetch_optional(state.db.pool(), &filter.to_sql("*", TABLE))
        .await?
        .ok_or_else(|| ApiError::not_found("Bitácora histórica no encontrada"))?;
    Ok(ApiResponse::success(entry))
}
