// handlers/protected/tipos_bitacora.rs - /api-bitacora/tiposbitacoras

use axum::extract::State;

use crate::database::models::tipo_bitacora::TipoBitacora;
use crate::database::Repository;
use crate::filter::{Filter, FilterOrderInfo};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<TipoBitacora>> {
    let repo: Repository<TipoBitacora> = Repository::new(&state.db, "tipos_bitacora", "idtipo");
    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::asc("descripciontipo"));
    Ok(ApiResponse::success(repo.select_any(&filter).await?))
}
