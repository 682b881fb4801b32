// handlers/public/auth/login.rs - POST /api-bitacora/auth/login

use axum::extract::State;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{generate_jwt, verify_password, Claims};
use crate::database::models::usuario::{LoginInput, Usuario, UsuarioCredentials, USUARIO_COLUMNS, USUARIO_FROM};
use crate::error::ApiError;
use crate::handlers::off_thread;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Usuario,
}

/// Exchange `{login, password}` for a bearer token.
///
/// Unknown logins and wrong passwords share the same 401 so the response does
/// not reveal which logins exist. Inactive accounts get 403 after the password
/// has been verified.
pub async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginInput>) -> ApiResult<LoginResponse> {
    let (login, password) = body.validate()?;

    let credentials: Option<UsuarioCredentials> = sqlx::query_as(
        "SELECT login, nombres, nivel, fkarea, estatus, password FROM usuarios WHERE login = ?",
    )
    .bind(&login)
    .fetch_optional(state.db.pool())
    .await?;

    let Some(credentials) = credentials else {
        warn!(login = %login, "login failed: unknown user");
        return Err(ApiError::unauthorized("Credenciales inválidas"));
    };

    let hash = credentials.password.clone();
    let matches = off_thread(move || verify_password(&password, &hash)).await?;
    if !matches {
        warn!(login = %login, "login failed: bad password");
        return Err(ApiError::unauthorized("Credenciales inválidas"));
    }

    if !credentials.is_active() {
        warn!(login = %login, "login refused: inactive user");
        return Err(ApiError::forbidden("Usuario inactivo"));
    }

    sqlx::query("UPDATE usuarios SET fecha_ultima_sesion = NOW() WHERE login = ?")
        .bind(&credentials.login)
        .execute(state.db.pool())
        .await?;

    let claims = Claims::new(
        credentials.login.clone(),
        credentials.nombres.clone(),
        credentials.nivel,
        credentials.fkarea,
        state.config.security.jwt_expiry_hours,
    );
    let token = generate_jwt(&claims, state.jwt_secret())?;

    let user: Usuario = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE u.login = ?",
        USUARIO_COLUMNS, USUARIO_FROM
    ))
    .bind(&credentials.login)
    .fetch_one(state.db.pool())
    .await?;

    info!(login = %user.login, nivel = user.nivel, "user logged in");
    Ok(ApiResponse::success(LoginResponse { token, user }))
}
