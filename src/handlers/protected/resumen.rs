// handlers/protected/resumen.rs - /api-bitacora/resumen-sistema

use axum::extract::State;
use serde::Serialize;
use sqlx::FromRow;

use crate::database::models::reunion::{EstatusReunion, Reunion, REUNION_FROM, REUNION_SELECT};
use crate::database::query_builder;
use crate::filter::{Filter, FilterOrderInfo, SqlResult};
use crate::handlers::fetch_all;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TotalUsuarios {
    pub total: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ActividadUsuarios {
    pub activos: i64,
    pub ultimos_7_dias: i64,
    pub ultimos_30_dias: i64,
}

const ACTIVIDAD_SQL: &str = "SELECT \
    CAST(COALESCE(SUM(estatus = 'ACTIVO'), 0) AS SIGNED) AS activos, \
    CAST(COALESCE(SUM(fecha_ultima_sesion >= NOW() - INTERVAL 7 DAY), 0) AS SIGNED) AS ultimos_7_dias, \
    CAST(COALESCE(SUM(fecha_ultima_sesion >= NOW() - INTERVAL 30 DAY), 0) AS SIGNED) AS ultimos_30_dias \
    FROM usuarios";

/// GET /usuarios/total
pub async fn total_usuarios(State(state): State<AppState>) -> ApiResult<TotalUsuarios> {
    let sql = SqlResult { query: "SELECT COUNT(*) AS count FROM usuarios".to_string(), params: vec![] };
    let total = query_builder::fetch_count(state.db.pool(), &sql).await?;
    Ok(ApiResponse::success(TotalUsuarios { total }))
}

/// GET /usuarios/actividad
pub async fn actividad_usuarios(State(state): State<AppState>) -> ApiResult<ActividadUsuarios> {
    let actividad: ActividadUsuarios = sqlx::query_as(ACTIVIDAD_SQL).fetch_one(state.db.pool()).await?;
    Ok(ApiResponse::success(actividad))
}

/// GET /reuniones/pendientes - scheduled meetings from today on, soonest first.
pub async fn reuniones_pendientes(State(state): State<AppState>) -> ApiResult<Vec<Reunion>> {
    let mut filter = Filter::new();
    filter
        .where_clause()
        .eq("r.estatus", EstatusReunion::Programada)
        .raw("r.fecha_inicio >= CURDATE()");
    filter
        .order(FilterOrderInfo::asc("r.fecha_inicio"))
        .order(FilterOrderInfo::asc("r.hora_inicio"));

    Ok(ApiResponse::success(fetch_all(&state, &filter, REUNION_SELECT, REUNION_FROM).await?))
}
