// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use sqlx::mysql::MySqlDatabaseError;
use std::collections::HashMap;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // Store failure classified by driver error code
    Database {
        status: u16,
        code: &'static str,
        message: String,
        details: String,
    },
}

/// Full error body (including driver details) stashed on the response for the
/// development-only detail middleware.
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub Value);

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Database { status, .. } => *status,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::Database { message, .. } => message,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Database { code, .. } => code,
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation error listing the missing required fields.
    pub fn missing_fields(fields: &[&str]) -> Self {
        let field_errors = fields
            .iter()
            .map(|f| (f.to_string(), "Campo requerido".to_string()))
            .collect();
        ApiError::validation_error(
            format!("Faltan campos obligatorios: {}", fields.join(", ")),
            Some(field_errors),
        )
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

/// Status, code and client message for a MySQL server error number.
///
/// Numbers follow the server error reference: 1062 ER_DUP_ENTRY, 1216/1452
/// ER_NO_REFERENCED_ROW(_2), 1217/1451 ER_ROW_IS_REFERENCED(_2), 1044/1045 access
/// denied, 1049 ER_BAD_DB_ERROR, 1064 ER_PARSE_ERROR, 1205 ER_LOCK_WAIT_TIMEOUT,
/// 1213 ER_LOCK_DEADLOCK.
pub fn mysql_error_status(number: u16) -> (u16, &'static str, &'static str) {
    match number {
        1062 => (409, "DUPLICATE_ENTRY", "Ya existe un registro con esos datos"),
        1216 | 1452 => (400, "MISSING_REFERENCE", "El registro referenciado no existe"),
        1217 | 1451 => (409, "ROW_IS_REFERENCED", "El registro está referenciado por otros registros"),
        1044 | 1045 => (403, "DATABASE_ACCESS_DENIED", "Acceso denegado a la base de datos"),
        1049 => (500, "DATABASE_NOT_FOUND", "La base de datos no existe"),
        1064 => (400, "SQL_SYNTAX_ERROR", "Error de sintaxis en la consulta"),
        1205 | 1213 => (409, "LOCK_CONFLICT", "Conflicto de concurrencia, intente nuevamente"),
        _ => (500, "DATABASE_ERROR", "Error en la base de datos"),
    }
}

fn database_error(status: u16, code: &'static str, message: &str, details: String) -> ApiError {
    ApiError::Database {
        status,
        code,
        message: message.to_string(),
        details,
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("Registro no encontrado"),
            sqlx::Error::Database(db_err) => {
                let number = db_err
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(|e| e.number())
                    .unwrap_or(0);
                let (status, code, message) = mysql_error_status(number);
                if status >= 500 {
                    tracing::error!("Database error {}: {}", number, db_err.message());
                } else {
                    tracing::warn!("Database error {}: {}", number, db_err.message());
                }
                database_error(status, code, message, db_err.message().to_string())
            }
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                tracing::error!("Database connection refused: {}", io);
                database_error(503, "DATABASE_UNAVAILABLE", "No se pudo conectar a la base de datos", io.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                tracing::error!("Database pool unavailable: {}", err);
                database_error(503, "DATABASE_UNAVAILABLE", "Base de datos temporalmente no disponible", err.to_string())
            }
            _ => {
                tracing::error!("SQLx error: {}", err);
                database_error(500, "DATABASE_ERROR", "Error en la base de datos", err.to_string())
            }
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::EmptyChangeset => ApiError::bad_request("No se enviaron campos para actualizar"),
            DatabaseError::Filter(e) => ApiError::bad_request(e.to_string()),
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Servicio en mantenimiento, intente más tarde")
            }
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::filter::FilterError> for ApiError {
    fn from(err: crate::filter::FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<crate::services::storage::StorageError> for ApiError {
    fn from(err: crate::services::storage::StorageError) -> Self {
        use crate::services::storage::StorageError;
        match err {
            StorageError::NotFound(name) => {
                ApiError::not_found(format!("Archivo no encontrado en el servidor: {}", name))
            }
            StorageError::TooLarge { limit } => ApiError::payload_too_large(format!(
                "El archivo excede el tamaño máximo de {} MB",
                limit / (1024 * 1024)
            )),
            StorageError::Io(e) => {
                tracing::error!("File storage error: {}", e);
                ApiError::internal_server_error("Error al procesar el archivo")
            }
        }
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            AuthError::InvalidToken(msg) => ApiError::unauthorized(msg),
            AuthError::InvalidSecret | AuthError::TokenGeneration(_) | AuthError::Hash(_) => {
                tracing::error!("Auth error: {}", err);
                ApiError::internal_server_error("Error interno de autenticación")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.to_json();
        let detailed = match &self {
            ApiError::Database { details, .. } => {
                let mut full = body.clone();
                full["details"] = json!(details);
                Some(ErrorDetails(full))
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detailed) = detailed {
            response.extensions_mut().insert(detailed);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_mysql_error_numbers() {
        assert_eq!(mysql_error_status(1062).0, 409);
        assert_eq!(mysql_error_status(1452).0, 400);
        assert_eq!(mysql_error_status(1216).0, 400);
        assert_eq!(mysql_error_status(1451).0, 409);
        assert_eq!(mysql_error_status(1045).0, 403);
        assert_eq!(mysql_error_status(1049).0, 500);
        assert_eq!(mysql_error_status(1064).0, 400);
        assert_eq!(mysql_error_status(1205).0, 409);
        assert_eq!(mysql_error_status(1213).0, 409);
        assert_eq!(mysql_error_status(9999), (500, "DATABASE_ERROR", "Error en la base de datos"));
    }

    #[test]
    fn row_not_found_becomes_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn connection_refused_becomes_503() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: ApiError = sqlx::Error::Io(io).into();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.error_code(), "DATABASE_UNAVAILABLE");

        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn database_errors_hide_details_in_body() {
        let err = database_error(500, "DATABASE_ERROR", "Error en la base de datos", "secret table".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let details = response.extensions().get::<ErrorDetails>().cloned();
        let details = details.expect("details extension");
        assert_eq!(details.0["details"], "secret table");
        assert_eq!(details.0["error"], true);
    }

    #[test]
    fn missing_fields_lists_each_field() {
        let err = ApiError::missing_fields(&["fecha", "turno"]);
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["fecha"].is_string());
        assert!(body["field_errors"]["turno"].is_string());
    }
}
