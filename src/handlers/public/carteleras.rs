// handlers/public/carteleras.rs - GET /api-bitacora/carteleras/active/:limit/:offset

use axum::extract::State;

use crate::database::models::cartelera::{Cartelera, EstatusCartelera, CARTELERA_FROM, CARTELERA_SELECT};
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::fetch_all;
use crate::handlers::protected::carteleras::expire_lapsed;
use crate::middleware::{ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;

/// Public bulletins currently inside their publication window.
pub async fn active(
    State(state): State<AppState>,
    ApiPath((limit, offset)): ApiPath<(u32, u64)>,
) -> ApiResult<Vec<Cartelera>> {
    expire_lapsed(&state).await?;

    let mut filter = Filter::new();
    filter
        .where_clause()
        .eq("c.estatus", EstatusCartelera::Activo)
        .raw("c.publico = 1")
        .raw("c.fecha_inicio_publicacion <= CURDATE()")
        .raw("c.fecha_fin_publicacion >= CURDATE()");
    filter
        .order(FilterOrderInfo::desc("c.fecha_inicio_publicacion"))
        .order(FilterOrderInfo::desc("c.idcartelera"))
        .limit(state.config.page_limit(Some(limit)), offset);

    let rows = fetch_all(&state, &filter, CARTELERA_SELECT, CARTELERA_FROM).await?;
    Ok(ApiResponse::success(rows))
}
