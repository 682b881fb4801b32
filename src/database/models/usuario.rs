use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, Activo, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;

/// Columns safe to return to clients. `password` is never selected into this row.
pub const USUARIO_COLUMNS: &str =
    "u.login, u.trabajador, u.estatus, u.nivel, u.fecha_ultima_sesion, u.nombres, u.fkarea, u.email, a.nombrearea AS nombre_area";

pub const USUARIO_FROM: &str = "usuarios u LEFT JOIN areas a ON a.idarea = u.fkarea";

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Usuario {
    pub login: String,
    pub trabajador: Option<String>,
    pub estatus: String,
    pub nivel: i32,
    pub fecha_ultima_sesion: Option<NaiveDateTime>,
    pub nombres: String,
    pub fkarea: Option<i32>,
    pub email: Option<String>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
}

/// Row used only for password verification.
#[derive(Debug, Clone, FromRow)]
pub struct UsuarioCredentials {
    pub login: String,
    pub nombres: String,
    pub nivel: i32,
    pub fkarea: Option<i32>,
    pub estatus: String,
    pub password: String,
}

impl UsuarioCredentials {
    pub fn is_active(&self) -> bool {
        self.estatus == Activo::Activo.as_str()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginInput {
    pub login: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        Required::new()
            .text("login", &self.login)
            .text("password", &self.password)
            .finish()?;
        Ok((
            self.login.as_deref().unwrap_or_default().trim().to_string(),
            self.password.clone().unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl ChangePasswordInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        Required::new()
            .text("currentPassword", &self.current_password)
            .text("newPassword", &self.new_password)
            .finish()?;
        validate_password(self.new_password.as_deref().unwrap_or_default())
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "La contraseña debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Create/update body for user management. `password` is hashed by the caller
/// and never copied into the record as plain text.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsuarioInput {
    pub login: Option<String>,
    pub trabajador: Option<String>,
    pub estatus: Option<Activo>,
    pub nivel: Option<i32>,
    pub nombres: Option<String>,
    pub fkarea: Option<i32>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UsuarioInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("login", &self.login)
            .text("nombres", &self.nombres)
            .field("nivel", &self.nivel)
            .text("password", &self.password)
            .finish()?;
        self.validate_common()
    }

    pub fn validate_update(&self) -> Result<(), ApiError> {
        if self.login.is_some() {
            return Err(ApiError::bad_request("El login no se puede modificar"));
        }
        self.validate_common()
    }

    fn validate_common(&self) -> Result<(), ApiError> {
        if let Some(nivel) = self.nivel {
            if nivel < 1 {
                return Err(ApiError::bad_request("El nivel debe ser un entero positivo"));
            }
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    /// Split off the plain-text password before mapping to columns.
    pub fn take_password(&mut self) -> Option<String> {
        self.password.take()
    }
}

impl IntoRecord for UsuarioInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("login", clean(self.login))
            .set_opt("trabajador", self.trabajador)
            .set_opt("estatus", self.estatus)
            .set_opt("nivel", self.nivel)
            .set_opt("nombres", clean(self.nombres))
            .set_opt("fkarea", self.fkarea)
            .set_opt("email", self.email);
        record
    }
}

/// Self-service profile edit.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileInput {
    pub nombres: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    pub fn take_password(&mut self) -> Option<String> {
        self.password.take()
    }
}

impl IntoRecord for ProfileInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("nombres", clean(self.nombres))
            .set_opt("email", self.email);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_body_rejects_unknown_columns() {
        let err = serde_json::from_value::<UsuarioInput>(json!({ "login": "ana", "nivel": 1, "is_admin": true }));
        assert!(err.is_err());
    }

    #[test]
    fn password_never_lands_in_record() {
        let mut input: UsuarioInput = serde_json::from_value(json!({
            "login": "ana", "nombres": "Ana", "nivel": 5, "password": "secreto1"
        }))
        .unwrap();
        input.validate_create().unwrap();
        assert_eq!(input.take_password().as_deref(), Some("secreto1"));
        let record = input.into_record();
        assert!(!record.contains("password"));
        assert!(record.contains("login"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let body: ChangePasswordInput =
            serde_json::from_value(json!({ "currentPassword": "viejo123", "newPassword": "abc" })).unwrap();
        assert_eq!(body.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn login_requires_both_fields() {
        let body: LoginInput = serde_json::from_value(json!({ "login": "ana" })).unwrap();
        assert!(body.validate().unwrap_err().message().contains("password"));
    }
}
