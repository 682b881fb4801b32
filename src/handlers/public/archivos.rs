// handlers/public/archivos.rs - /api-bitacora/archivos-publicos
//
// Image attachments of public bitácoras, served without a token.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Response,
};
use serde::Deserialize;

use crate::database::models::archivo::{
    public_image_condition, ImagenPublica, IMAGEN_PUBLICA_FROM, IMAGEN_PUBLICA_SELECT,
};
use crate::database::query_builder;
use crate::error::ApiError;
use crate::filter::{Filter, FilterOrderInfo};
use crate::handlers::{fetch_all, file_response};
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::storage::content_type_for;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImagenesQuery {
    pub limit: Option<u32>,
}

/// GET /imagenes - newest public images with a link to fetch each one.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ImagenesQuery>,
) -> ApiResult<Vec<ImagenPublica>> {
    let mut filter = Filter::new();
    filter.where_clause().raw(public_image_condition());
    filter
        .order(FilterOrderInfo::desc("f.fecha_carga"))
        .limit(state.config.page_limit(query.limit), 0);

    let mut images: Vec<ImagenPublica> =
        fetch_all(&state, &filter, IMAGEN_PUBLICA_SELECT, IMAGEN_PUBLICA_FROM).await?;

    let base = base_url(&state, &headers);
    for image in &mut images {
        image.url_imagen = image_url(&base, image.idarchivo);
    }
    Ok(ApiResponse::success(images))
}

/// GET /imagenes/:archivo_id - image bytes, only while the attachment is still public.
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i32>) -> Result<Response, ApiError> {
    let mut filter = Filter::new();
    filter.where_clause().raw(public_image_condition()).eq("f.idarchivo", id);
    filter.limit(1, 0);

    let image: ImagenPublica = query_builder::fetch_optional(
        state.db.pool(),
        &filter.to_sql(IMAGEN_PUBLICA_SELECT, IMAGEN_PUBLICA_FROM),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Imagen no encontrada"))?;

    let bytes = state.storage.read(&image.ruta_archivo).await?;
    Ok(file_response(
        bytes,
        content_type_for(&image.nombre_archivo),
        &image.nombre_archivo,
        "inline",
    ))
}

/// Configured public URL, else `http://` plus the request host.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.server.public_url {
        return url.clone();
    }
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_default()
}

fn image_url(base: &str, id: i32) -> String {
    format!("{}/api-bitacora/archivos-publicos/imagenes/{}", base.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_point_at_public_route() {
        assert_eq!(
            image_url("http://plant.local/", 7),
            "http://plant.local/api-bitacora/archivos-publicos/imagenes/7"
        );
        assert_eq!(image_url("", 7), "/api-bitacora/archivos-publicos/imagenes/7");
    }
}
