// handlers/protected/auth/profile.rs - GET /api-bitacora/auth/profile

use axum::extract::{Extension, State};

use crate::database::models::usuario::{Usuario, USUARIO_COLUMNS, USUARIO_FROM};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// The caller's own user row, without the password hash.
pub async fn profile(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Usuario> {
    let row: Option<Usuario> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE u.login = ?",
        USUARIO_COLUMNS, USUARIO_FROM
    ))
    .bind(&user.login)
    .fetch_optional(state.db.pool())
    .await?;

    row.map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))
}
