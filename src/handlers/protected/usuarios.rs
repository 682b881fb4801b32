// handlers/protected/usuarios.rs - /api-bitacora/usuarios

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::info;

use crate::auth::hash_password;
use crate::database::models::usuario::{ProfileInput, Usuario, UsuarioInput, USUARIO_COLUMNS, USUARIO_FROM};
use crate::database::{DatabaseError, IntoRecord, Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::{fetch_all, off_thread};
use crate::middleware::{message, ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::Level;
use crate::state::AppState;

fn repo(state: &AppState) -> Repository<Usuario> {
    Repository::new(&state.db, "usuarios", "login")
}

async fn fetch_usuario(state: &AppState, login: &str) -> Result<Usuario, ApiError> {
    let mut filter = Filter::new();
    filter.where_clause().eq("u.login", login);
    filter.limit(1, 0);
    fetch_all::<Usuario>(state, &filter, USUARIO_COLUMNS, USUARIO_FROM)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))
}

/// bcrypt is CPU-bound; keep it off the async workers.
async fn hash_off_thread(password: String) -> Result<String, ApiError> {
    off_thread(move || hash_password(&password)).await?.map_err(ApiError::from)
}

pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Usuario>> {
    user.require(Level::MANAGER)?;

    let mut filter = Filter::new();
    filter.order(FilterOrderInfo::asc("u.nombres"));
    Ok(ApiResponse::success(fetch_all(&state, &filter, USUARIO_COLUMNS, USUARIO_FROM).await?))
}

/// Users may read their own row; everyone else needs MANAGER.
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
) -> ApiResult<Usuario> {
    if login != user.login {
        user.require(Level::MANAGER)?;
    }
    Ok(ApiResponse::success(fetch_usuario(&state, &login).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(mut body): ApiJson<UsuarioInput>,
) -> ApiResult<Usuario> {
    user.require(Level::SYSTEM)?;
    body.validate_create()?;

    let password = body.take_password().unwrap_or_default();
    let login = body.login.as_deref().unwrap_or_default().trim().to_string();
    let mut record = body.into_record();
    record.set("password", hash_off_thread(password).await?);

    repo(&state).insert(&record).await?;
    info!(created = %login, by = %user.login, "user created");
    Ok(ApiResponse::created(fetch_usuario(&state, &login).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
    ApiJson(mut body): ApiJson<UsuarioInput>,
) -> ApiResult<Usuario> {
    user.require(Level::SYSTEM)?;
    body.validate_update()?;
    fetch_usuario(&state, &login).await?;

    let password = body.take_password();
    let mut record = body.into_record();
    if let Some(password) = password {
        record.set("password", hash_off_thread(password).await?);
    }

    repo(&state).update(login.as_str(), &record).await?;
    info!(updated = %login, by = %user.login, "user updated");
    Ok(ApiResponse::success(fetch_usuario(&state, &login).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(login): ApiPath<String>,
) -> ApiResult<Value> {
    user.require(Level::SYSTEM)?;
    if login == user.login {
        return Err(ApiError::bad_request("No puede eliminar su propio usuario"));
    }
    fetch_usuario(&state, &login).await?;

    repo(&state).delete(login.as_str()).await?;
    info!(deleted = %login, by = %user.login, "user deleted");
    Ok(ApiResponse::success(message("Usuario eliminado exitosamente")))
}

/// PUT /profile/update - self-service edit of nombres, email and password.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(mut body): ApiJson<ProfileInput>,
) -> ApiResult<Usuario> {
    body.validate()?;

    let password = body.take_password();
    let mut record: Record = body.into_record();
    if let Some(password) = password {
        record.set("password", hash_off_thread(password).await?);
    }
    if record.is_empty() {
        return Err(DatabaseError::EmptyChangeset.into());
    }

    repo(&state).update(user.login.as_str(), &record).await?;
    Ok(ApiResponse::success(fetch_usuario(&state, &user.login).await?))
}
