use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{flag, Activo, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;

pub const MY_MENUS_SQL: &str = "SELECT mu.*, m.name, m.url, m.icon, m.idpadre \
    FROM menus_usuarios mu \
    INNER JOIN menus m ON m.idmenu = mu.idmenu \
    WHERE mu.login = ? AND mu.estatus = 'ACTIVO' AND m.estatus = 1 \
    ORDER BY m.orden, m.idmenu";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuUsuario {
    pub idmenu: i32,
    pub login: String,
    pub pupdate: bool,
    pub pinsert: bool,
    pub pdelete: bool,
    pub pselect: bool,
    pub export: bool,
    pub estatus: String,
}

/// Permission row joined with the menu it grants.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuUsuarioDetalle {
    pub idmenu: i32,
    pub login: String,
    pub pupdate: bool,
    pub pinsert: bool,
    pub pdelete: bool,
    pub pselect: bool,
    pub export: bool,
    pub estatus: String,
    pub name: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub idpadre: Option<i32>,
}

/// The five permission flags plus status.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Permisos {
    #[serde(default, deserialize_with = "flag")]
    pub pupdate: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pinsert: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pdelete: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pselect: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub export: Option<bool>,
    pub estatus: Option<Activo>,
}

impl Permisos {
    /// Fill unset flags with insert defaults: read-only, active.
    pub fn with_defaults(self) -> Self {
        Self {
            pupdate: Some(self.pupdate.unwrap_or(false)),
            pinsert: Some(self.pinsert.unwrap_or(false)),
            pdelete: Some(self.pdelete.unwrap_or(false)),
            pselect: Some(self.pselect.unwrap_or(true)),
            export: Some(self.export.unwrap_or(false)),
            estatus: Some(self.estatus.unwrap_or(Activo::Activo)),
        }
    }
}

impl IntoRecord for Permisos {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("pupdate", self.pupdate)
            .set_opt("pinsert", self.pinsert)
            .set_opt("pdelete", self.pdelete)
            .set_opt("pselect", self.pselect)
            .set_opt("export", self.export)
            .set_opt("estatus", self.estatus);
        record
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuUsuarioInput {
    pub idmenu: Option<i32>,
    pub login: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub pupdate: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pinsert: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pdelete: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pselect: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub export: Option<bool>,
    pub estatus: Option<Activo>,
}

impl MenuUsuarioInput {
    pub fn validate(&self) -> Result<(i32, String), ApiError> {
        Required::new()
            .field("idmenu", &self.idmenu)
            .text("login", &self.login)
            .finish()?;
        Ok((
            self.idmenu.unwrap_or_default(),
            self.login.as_deref().unwrap_or_default().trim().to_string(),
        ))
    }

    pub fn permisos(&self) -> Permisos {
        Permisos {
            pupdate: self.pupdate,
            pinsert: self.pinsert,
            pdelete: self.pdelete,
            pselect: self.pselect,
            export: self.export,
            estatus: self.estatus,
        }
    }
}

/// Replace a user's menu grants with `menu_ids`, all using `permisos`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BulkAssignInput {
    #[serde(alias = "menu_ids")]
    pub menu_ids: Option<Vec<i32>>,
    #[serde(default)]
    pub permisos: Permisos,
}

impl BulkAssignInput {
    pub fn validate(&self) -> Result<Vec<i32>, ApiError> {
        let Some(ids) = &self.menu_ids else {
            return Err(ApiError::missing_fields(&["menuIds"]));
        };
        let mut ids = ids.clone();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_read_only_active() {
        let record = Permisos::default().with_defaults().into_record();
        assert_eq!(record.get("pselect"), Some(&json!(true)));
        assert_eq!(record.get("pupdate"), Some(&json!(false)));
        assert_eq!(record.get("estatus"), Some(&json!("ACTIVO")));
    }

    #[test]
    fn bulk_assign_dedups_ids() {
        let body: BulkAssignInput =
            serde_json::from_value(json!({ "menuIds": [3, 1, 3], "permisos": { "pinsert": true } })).unwrap();
        assert_eq!(body.validate().unwrap(), vec![1, 3]);
        assert_eq!(body.permisos.pinsert, Some(true));
    }

    #[test]
    fn bulk_assign_requires_ids() {
        let body: BulkAssignInput = serde_json::from_value(json!({})).unwrap();
        assert!(body.validate().is_err());
    }
}
