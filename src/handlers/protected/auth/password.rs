// handlers/protected/auth/password.rs - PUT /api-bitacora/auth/change-password

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::database::models::usuario::ChangePasswordInput;
use crate::error::ApiError;
use crate::handlers::off_thread;
use crate::middleware::{message, ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<ChangePasswordInput>,
) -> ApiResult<Value> {
    body.validate()?;
    let current = body.current_password.unwrap_or_default();
    let new_password = body.new_password.unwrap_or_default();

    let stored: Option<String> = sqlx::query_scalar("SELECT password FROM usuarios WHERE login = ?")
        .bind(&user.login)
        .fetch_optional(state.db.pool())
        .await?;
    let stored = stored.ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    let (matches, hashed) = off_thread(move || {
        let matches = verify_password(&current, &stored);
        let hashed = if matches { Some(hash_password(&new_password)) } else { None };
        (matches, hashed)
    })
    .await?;

    if !matches {
        warn!(login = %user.login, "password change refused: current password mismatch");
        return Err(ApiError::unauthorized("La contraseña actual es incorrecta"));
    }
    let hashed = hashed
        .transpose()?
        .ok_or_else(|| ApiError::internal_server_error("Error al procesar la contraseña"))?;

    sqlx::query("UPDATE usuarios SET password = ? WHERE login = ?")
        .bind(&hashed)
        .bind(&user.login)
        .execute(state.db.pool())
        .await?;

    info!(login = %user.login, "password changed");
    Ok(ApiResponse::success(message("Contraseña actualizada exitosamente")))
}
