// handlers/mod.rs - two handler tiers
//
// public:    no token (login, public bulletins, public images)
// protected: bearer token required; the JWT middleware puts `AuthUser` in the
//            request extensions and each handler applies its own level or
//            row-level policy on top.

pub mod protected;
pub mod public;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{mysql::MySqlRow, FromRow};

use crate::database::{query_builder, DatabaseError, Record};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{AuthUser, Page};
use crate::policy::{can_access, can_mutate, Level, Scoped};
use crate::state::AppState;

/// Calendar date on the database server. Expiry and the public window compare
/// against `CURDATE()`, so derived bulletin windows start from the same clock.
pub(crate) async fn store_today(state: &AppState) -> Result<NaiveDate, ApiError> {
    Ok(sqlx::query_scalar::<_, NaiveDate>("SELECT CURDATE()").fetch_one(state.db.pool()).await?)
}

/// Run `filter` one page at a time and wrap the rows with pagination metadata.
pub(crate) async fn fetch_page<T>(
    state: &AppState,
    filter: &mut Filter,
    select: &str,
    from: &str,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<Page<T>, ApiError>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin + Serialize,
{
    let page = page.unwrap_or(1).max(1);
    let limit = state.config.page_limit(limit);
    filter.paginate(page, limit);

    let (items, total) = query_builder::fetch_page(state.db.pool(), filter, select, from).await?;
    Ok(Page::new(items, total, page, limit))
}

/// Fetch every row matching `filter` without paging.
pub(crate) async fn fetch_all<T>(state: &AppState, filter: &Filter, select: &str, from: &str) -> Result<Vec<T>, ApiError>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    Ok(query_builder::fetch_all(state.db.pool(), &filter.to_sql(select, from)).await?)
}

/// Single row from a joined SELECT, or 404 with `what` as the message.
pub(crate) async fn fetch_joined<T>(
    state: &AppState,
    select: &str,
    from: &str,
    id_column: &str,
    id: i32,
    what: &str,
) -> Result<T, ApiError>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let mut filter = Filter::new();
    filter.where_clause().eq(id_column, id);
    filter.limit(1, 0);

    query_builder::fetch_optional(state.db.pool(), &filter.to_sql(select, from))
        .await?
        .ok_or_else(|| ApiError::not_found(what))
}

pub(crate) fn ensure_access<R: Scoped>(user: &AuthUser, record: &R, level: Level) -> Result<(), ApiError> {
    if can_access(user, record, level) {
        return Ok(());
    }
    tracing::warn!(login = %user.login, owner = record.owner_login(), "read denied by row policy");
    Err(ApiError::forbidden("No tiene permiso para ver este registro"))
}

pub(crate) fn ensure_mutate<R: Scoped>(user: &AuthUser, record: &R, level: Level) -> Result<(), ApiError> {
    if can_mutate(user, record, level) {
        return Ok(());
    }
    tracing::warn!(login = %user.login, owner = record.owner_login(), "write denied by row policy");
    Err(ApiError::forbidden("No tiene permiso para modificar este registro"))
}

/// Add the audit columns to an update, refusing bodies that change nothing.
pub(crate) fn stamp_update(record: &mut Record, user: &AuthUser) -> Result<(), ApiError> {
    if record.is_empty() {
        return Err(DatabaseError::EmptyChangeset.into());
    }
    record
        .set("login_modificacion", user.login.as_str())
        .set_now("fecha_modificacion");
    Ok(())
}

/// Run CPU-bound work (bcrypt) on the blocking pool. A panicked or cancelled
/// task is a server error, never a failed password check.
pub(crate) async fn off_thread<F, T>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!("blocking task failed: {}", e);
        ApiError::internal_server_error("Error al procesar la contraseña")
    })
}

/// Convert an AUTO_INCREMENT id from the driver to the column type.
pub(crate) fn inserted_id(id: u64) -> Result<i32, ApiError> {
    i32::try_from(id).map_err(|_| ApiError::internal_server_error("Identificador fuera de rango"))
}

/// Raw file body with content headers. `disposition` is `inline` or `attachment`.
pub(crate) fn file_response(
    bytes: Vec<u8>,
    content_type: &str,
    file_name: &str,
    disposition: &'static str,
) -> axum::response::Response {
    use axum::http::{header, HeaderValue};
    use axum::response::IntoResponse;

    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let file_name = crate::services::storage::sanitize_file_name(file_name);
    let disposition = HeaderValue::from_str(&format!("{}; filename=\"{}\"", disposition, file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn off_thread_returns_the_result() {
        assert_eq!(off_thread(|| 6 * 7).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn panicked_work_is_a_server_error() {
        let err = off_thread(|| -> bool { panic!("bcrypt exploded") }).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn inserted_id_rejects_out_of_range() {
        assert_eq!(inserted_id(7).unwrap(), 7);
        assert_eq!(inserted_id(u64::MAX).unwrap_err().status_code(), 500);
    }
}
