// handlers/protected/archivos.rs - /api-bitacora/archivos
//
// Attachments of a bitácora. Bytes live in FileStorage, the row keeps the
// generated stored name. Deletes are soft (`activo = 0`) and leave the file.

use axum::extract::{multipart::MultipartError, Extension, Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;
use tracing::{info, warn};

use crate::database::models::archivo::Archivo;
use crate::database::models::clean;
use crate::database::{Record, Repository};
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo, FilterWhere};
use crate::handlers::protected::bitacoras;
use crate::handlers::{ensure_access, file_response, inserted_id};
use crate::middleware::{message, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::policy::{can_mutate, Level};
use crate::services::storage::content_type_for;
use crate::state::AppState;

const NOT_FOUND: &str = "Archivo no encontrado";

fn repo(state: &AppState) -> Repository<Archivo> {
    Repository::new(&state.db, "archivos", "idarchivo")
}

/// Active attachment `archivo` of bitácora `bitacora`.
async fn load(state: &AppState, bitacora: i32, archivo: i32) -> Result<Archivo, ApiError> {
    let mut where_ = FilterWhere::new();
    where_
        .eq("idarchivo", archivo)
        .eq("fkbitacora", bitacora)
        .eq("activo", true);
    repo(state)
        .select_one(where_)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("El archivo excede el tamaño máximo permitido");
    }
    ApiError::bad_request(format!("Formulario inválido: {}", err.body_text()))
}

/// GET /:bitacora_id
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(bitacora): ApiPath<i32>,
) -> ApiResult<Vec<Archivo>> {
    let parent = bitacoras::load(&state, bitacora).await?;
    ensure_access(&user, &parent, Level::SUPERVISOR)?;

    let mut filter = Filter::new();
    filter.where_clause().eq("fkbitacora", bitacora).eq("activo", true);
    filter.order(FilterOrderInfo::desc("fecha_carga"));
    Ok(ApiResponse::success(repo(&state).select_any(&filter).await?))
}

/// POST /:bitacora_id - multipart with a `file` part and an optional `descripcion`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(bitacora): ApiPath<i32>,
    mut multipart: Multipart,
) -> ApiResult<Archivo> {
    let parent = bitacoras::load(&state, bitacora).await?;
    ensure_access(&user, &parent, Level::SUPERVISOR)?;

    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut descripcion = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("archivo").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                state.storage.check_size(bytes.len())?;
                file = Some((name, content_type, bytes.to_vec()));
            }
            Some("descripcion") => {
                descripcion = clean(Some(field.text().await.map_err(multipart_error)?));
            }
            _ => {}
        }
    }

    let Some((name, content_type, bytes)) = file else {
        return Err(ApiError::bad_request("No se ha proporcionado ningún archivo"));
    };
    let content_type = content_type.unwrap_or_else(|| content_type_for(&name).to_string());

    let stored = state.storage.store(&name, &bytes).await?;

    let mut record = Record::new();
    record
        .set("fkbitacora", bitacora)
        .set("nombre_archivo", name.as_str())
        .set("ruta_archivo", stored.stored_name.as_str())
        .set("tipo_archivo", content_type)
        .set("tamano", stored.size)
        .set("login_carga", user.login.as_str())
        .set_opt("descripcion", descripcion)
        .set_now("fecha_carga")
        .set("activo", true);

    let id = match repo(&state).insert(&record).await {
        Ok(id) => inserted_id(id)?,
        Err(err) => {
            warn!(stored = %stored.stored_name, "attachment insert failed, removing stored file");
            if let Err(cleanup) = state.storage.remove(&stored.stored_name).await {
                warn!(error = %cleanup, "could not remove orphaned upload");
            }
            return Err(err.into());
        }
    };

    info!(idarchivo = id, idbitacora = bitacora, size = stored.size, login = %user.login, "attachment uploaded");
    Ok(ApiResponse::created(load(&state, bitacora, id).await?))
}

/// GET /:bitacora_id/:archivo_id - file bytes as a download.
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((bitacora, archivo)): ApiPath<(i32, i32)>,
) -> Result<Response, ApiError> {
    let parent = bitacoras::load(&state, bitacora).await?;
    ensure_access(&user, &parent, Level::SUPERVISOR)?;

    let row = load(&state, bitacora, archivo).await?;
    let bytes = state.storage.read(&row.ruta_archivo).await?;
    Ok(file_response(bytes, &row.tipo_archivo, &row.nombre_archivo, "attachment"))
}

/// DELETE /:bitacora_id/:archivo_id - allowed to whoever may change the log and to the uploader.
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((bitacora, archivo)): ApiPath<(i32, i32)>,
) -> ApiResult<Value> {
    let parent = bitacoras::load(&state, bitacora).await?;
    let row = load(&state, bitacora, archivo).await?;
    if !can_mutate(&user, &parent, Level::SUPERVISOR) && row.login_carga != user.login {
        warn!(login = %user.login, idarchivo = archivo, "attachment delete denied");
        return Err(ApiError::forbidden("No tiene permiso para eliminar este archivo"));
    }

    let mut record = Record::new();
    record.set("activo", false);
    repo(&state).update(archivo, &record).await?;

    info!(idarchivo = archivo, login = %user.login, "attachment deactivated");
    Ok(ApiResponse::success(message("Archivo eliminado exitosamente")))
}
