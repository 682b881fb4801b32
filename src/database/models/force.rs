use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, flexible_date, sql_date, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::policy::Scoped;

pub const FORCE_SELECT: &str =
    "f.*, s.descripcion AS sistema_descripcion, n.descripcion AS senal_descripcion";

pub const FORCE_FROM: &str = "`force` f \
    LEFT JOIN sistemas_force s ON s.idsistema = f.fksistema \
    LEFT JOIN senales_force n ON n.idsenal = f.fksenal";

status_enum!(EstatusForce {
    Activo => "ACTIVO",
    Inactivo => "INACTIVO",
    Completado => "COMPLETADO",
    Cancelado => "CANCELADO",
});

impl EstatusForce {
    /// COMPLETADO and CANCELADO records are closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EstatusForce::Completado | EstatusForce::Cancelado)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Force {
    pub idforce: i32,
    pub fksenal: Option<i32>,
    pub fksistema: Option<i32>,
    pub causas: String,
    pub valor: Option<f64>,
    pub solicitado_por: Option<String>,
    pub autorizado_por: Option<String>,
    pub ejecutor_por: Option<String>,
    pub tipoforce: Option<String>,
    pub estatusforce: String,
    pub fecha_registrado: NaiveDateTime,
    pub login_registrado: String,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub login_modificacion: Option<String>,
    #[sqlx(default)]
    pub sistema_descripcion: Option<String>,
    #[sqlx(default)]
    pub senal_descripcion: Option<String>,
}

impl Force {
    pub fn status(&self) -> Option<EstatusForce> {
        EstatusForce::parse(&self.estatusforce)
    }

    pub fn is_closed(&self) -> bool {
        self.status().map_or(false, |s| s.is_terminal())
    }

    /// Reject a status change on a closed record unless it keeps the same status.
    pub fn check_transition(&self, next: EstatusForce) -> Result<(), ApiError> {
        if self.is_closed() && self.status() != Some(next) {
            return Err(ApiError::bad_request(format!(
                "No se puede cambiar el estatus de un force {}",
                self.estatusforce
            )));
        }
        Ok(())
    }
}

impl Scoped for Force {
    fn owner_login(&self) -> &str {
        &self.login_registrado
    }
    fn area(&self) -> Option<i32> {
        None
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForceInput {
    pub fksenal: Option<i32>,
    pub fksistema: Option<i32>,
    pub causas: Option<String>,
    pub valor: Option<f64>,
    pub solicitado_por: Option<String>,
    pub autorizado_por: Option<String>,
    pub ejecutor_por: Option<String>,
    pub tipoforce: Option<String>,
    pub estatusforce: Option<EstatusForce>,
}

impl ForceInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("causas", &self.causas)
            .field("valor", &self.valor)
            .text("solicitado_por", &self.solicitado_por)
            .text("autorizado_por", &self.autorizado_por)
            .text("ejecutor_por", &self.ejecutor_por)
            .text("tipoforce", &self.tipoforce)
            .finish()?;
        if self.fksenal.is_none() && self.fksistema.is_none() {
            return Err(ApiError::bad_request("Debe indicar al menos una señal o un sistema"));
        }
        Ok(())
    }
}

impl IntoRecord for ForceInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fksenal", self.fksenal)
            .set_opt("fksistema", self.fksistema)
            .set_opt("causas", clean(self.causas))
            .set_opt("valor", self.valor)
            .set_opt("solicitado_por", self.solicitado_por)
            .set_opt("autorizado_por", self.autorizado_por)
            .set_opt("ejecutor_por", self.ejecutor_por)
            .set_opt("tipoforce", self.tipoforce)
            .set_opt("estatusforce", self.estatusforce);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceQuery {
    pub fksistema: Option<i32>,
    pub fksenal: Option<i32>,
    pub estatusforce: Option<EstatusForce>,
    pub tipoforce: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ForceQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(id) = self.fksistema {
            where_.eq("f.fksistema", id);
        }
        if let Some(id) = self.fksenal {
            where_.eq("f.fksenal", id);
        }
        if let Some(estatus) = self.estatusforce {
            where_.eq("f.estatusforce", estatus);
        }
        if let Some(tipo) = self.tipoforce.as_deref().filter(|t| !t.is_empty()) {
            where_.eq("f.tipoforce", tipo);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("DATE(f.fecha_registrado)", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("DATE(f.fecha_registrado)", sql_date(hasta));
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            where_.contains_any(
                &["f.causas", "f.solicitado_por", "f.autorizado_por", "f.ejecutor_por"],
                keyword,
            );
        }
    }
}

/// The two force catalogs share one shape and differ only in naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Sistema,
    Senal,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Sistema => "sistemas_force",
            CatalogKind::Senal => "senales_force",
        }
    }

    pub fn id_column(&self) -> &'static str {
        match self {
            CatalogKind::Sistema => "idsistema",
            CatalogKind::Senal => "idsenal",
        }
    }

    /// Column in `force` that references this catalog.
    pub fn force_column(&self) -> &'static str {
        match self {
            CatalogKind::Sistema => "fksistema",
            CatalogKind::Senal => "fksenal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Sistema => "Sistema",
            CatalogKind::Senal => "Señal",
        }
    }
}

/// Catalog row with the id column aliased to `id`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogEntry {
    pub id: i32,
    pub descripcion: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogInput {
    pub descripcion: Option<String>,
}

impl CatalogInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        Required::new().text("descripcion", &self.descripcion).finish()
    }
}

impl IntoRecord for CatalogInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record.set_opt("descripcion", clean(self.descripcion));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn force(estatus: &str) -> Force {
        Force {
            idforce: 1,
            fksenal: Some(2),
            fksistema: None,
            causas: "Prueba".into(),
            valor: Some(1.0),
            solicitado_por: None,
            autorizado_por: None,
            ejecutor_por: None,
            tipoforce: None,
            estatusforce: estatus.into(),
            fecha_registrado: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(8, 0, 0).unwrap(),
            login_registrado: "ana".into(),
            fecha_modificacion: None,
            login_modificacion: None,
            sistema_descripcion: None,
            senal_descripcion: None,
        }
    }

    #[test]
    fn closed_records_reject_status_changes() {
        assert!(force("COMPLETADO").check_transition(EstatusForce::Activo).is_err());
        assert!(force("CANCELADO").check_transition(EstatusForce::Completado).is_err());
        assert!(force("CANCELADO").check_transition(EstatusForce::Cancelado).is_ok());
        assert!(force("ACTIVO").check_transition(EstatusForce::Completado).is_ok());
    }

    #[test]
    fn create_needs_signal_or_system() {
        let input: ForceInput = serde_json::from_value(json!({
            "causas": "Falla sensor", "valor": 12.5, "solicitado_por": "A",
            "autorizado_por": "B", "ejecutor_por": "C", "tipoforce": "BYPASS"
        }))
        .unwrap();
        assert!(input.validate_create().unwrap_err().message().contains("señal"));
    }

    #[test]
    fn catalog_kinds_name_their_reference_column() {
        assert_eq!(CatalogKind::Sistema.force_column(), "fksistema");
        assert_eq!(CatalogKind::Senal.table(), "senales_force");
    }
}
