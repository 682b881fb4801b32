use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::cartelera::{DerivedBulletin, TipoInfo};
use super::{clean, flag, flexible_date, flexible_time, sql_date, sql_time, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::policy::board::derived_window;
use crate::policy::{ScopeColumns, Scoped};

pub const INCIDENCIA_SELECT: &str = "i.*, a.nombrearea AS nombre_area, u.nombres AS nombre_usuario, \
    e.descripcion_equipo AS nombre_equipo";

pub const INCIDENCIA_FROM: &str = "incidencias i \
    LEFT JOIN areas a ON a.idarea = i.fkarea \
    LEFT JOIN usuarios u ON u.login = i.login \
    LEFT JOIN equipos e ON e.idequipo = i.fkequipo";

pub const INCIDENCIA_SCOPE: ScopeColumns = ScopeColumns {
    owner: "i.login",
    area: "i.fkarea",
    public: None,
};

status_enum!(EstatusIncidencia {
    Activo => "ACTIVO",
    Inactivo => "INACTIVO",
    Finalizado => "FINALIZADO",
    Proceso => "PROCESO",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Incidencia {
    pub idincidencia: i32,
    pub descripcion: String,
    pub fecha: NaiveDate,
    pub hora: NaiveTime,
    pub observacion: Option<String>,
    pub que_se_hizo: Option<String>,
    pub tipoincidencia: String,
    pub critico: bool,
    pub login: String,
    pub fecha_registro: NaiveDateTime,
    pub login_modificacion: Option<String>,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub fkarea: i32,
    pub involucrados: Option<String>,
    pub en_cartelera: bool,
    pub estatus: String,
    pub fkequipo: Option<i32>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
    #[sqlx(default)]
    pub nombre_usuario: Option<String>,
    #[sqlx(default)]
    pub nombre_equipo: Option<String>,
}

impl Scoped for Incidencia {
    fn owner_login(&self) -> &str {
        &self.login
    }
    fn area(&self) -> Option<i32> {
        Some(self.fkarea)
    }
}

impl Incidencia {
    /// Bulletin published when the incident goes on the board.
    pub fn derived_bulletin(&self, login: &str, today: NaiveDate) -> DerivedBulletin {
        let (inicio, fin) = derived_window(today);
        DerivedBulletin {
            fkarea: self.fkarea,
            titulo: format!("Incidencia: {}", self.tipoincidencia),
            descripcion: self.descripcion.clone(),
            login_registrado: login.to_string(),
            inicio,
            fin,
            tipo_info: if self.critico { TipoInfo::Danger } else { TipoInfo::Warning },
            publico: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncidenciaInput {
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_time")]
    pub hora: Option<NaiveTime>,
    pub observacion: Option<String>,
    pub que_se_hizo: Option<String>,
    pub tipoincidencia: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub critico: Option<bool>,
    pub fkarea: Option<i32>,
    pub involucrados: Option<String>,
    pub estatus: Option<EstatusIncidencia>,
    pub fkequipo: Option<i32>,
}

impl IncidenciaInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("descripcion", &self.descripcion)
            .field("fecha", &self.fecha)
            .field("hora", &self.hora)
            .text("tipoincidencia", &self.tipoincidencia)
            .finish()
    }
}

impl IntoRecord for IncidenciaInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("descripcion", clean(self.descripcion))
            .set_opt("fecha", self.fecha.map(sql_date))
            .set_opt("hora", self.hora.map(sql_time))
            .set_opt("observacion", self.observacion)
            .set_opt("que_se_hizo", self.que_se_hizo)
            .set_opt("tipoincidencia", clean(self.tipoincidencia))
            .set_opt("critico", self.critico)
            .set_opt("fkarea", self.fkarea)
            .set_opt("involucrados", self.involucrados)
            .set_opt("estatus", self.estatus)
            .set_opt("fkequipo", self.fkequipo);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IncidenciaQuery {
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub tipoincidencia: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub critico: Option<bool>,
    pub estatus: Option<EstatusIncidencia>,
    pub fkarea: Option<i32>,
    pub fkequipo: Option<i32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl IncidenciaQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(text) = self.descripcion.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            where_.contains("i.descripcion", text);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("i.fecha", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("i.fecha", sql_date(hasta));
        }
        if let Some(tipo) = self.tipoincidencia.as_deref().filter(|t| !t.is_empty()) {
            where_.eq("i.tipoincidencia", tipo);
        }
        if let Some(critico) = self.critico {
            where_.eq("i.critico", critico);
        }
        if let Some(estatus) = self.estatus {
            where_.eq("i.estatus", estatus);
        }
        if let Some(fkarea) = self.fkarea {
            where_.eq("i.fkarea", fkarea);
        }
        if let Some(fkequipo) = self.fkequipo {
            where_.eq("i.fkequipo", fkequipo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn incidencia(critico: bool) -> Incidencia {
        Incidencia {
            idincidencia: 7,
            descripcion: "Fuga en línea 3".into(),
            fecha: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            hora: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            observacion: None,
            que_se_hizo: None,
            tipoincidencia: "FUGA".into(),
            critico,
            login: "ana".into(),
            fecha_registro: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(9, 5, 0).unwrap(),
            login_modificacion: None,
            fecha_modificacion: None,
            fkarea: 10,
            involucrados: None,
            en_cartelera: false,
            estatus: "ACTIVO".into(),
            fkequipo: None,
            nombre_area: None,
            nombre_usuario: None,
            nombre_equipo: None,
        }
    }

    #[test]
    fn critical_incident_gets_danger_bulletin() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let bulletin = incidencia(true).derived_bulletin("ana", today);
        assert_eq!(bulletin.tipo_info, TipoInfo::Danger);
        assert_eq!(bulletin.titulo, "Incidencia: FUGA");
        assert!(bulletin.publico);
        assert_eq!(bulletin.fin, NaiveDate::from_ymd_opt(2025, 7, 10).unwrap());

        assert_eq!(incidencia(false).derived_bulletin("ana", today).tipo_info, TipoInfo::Warning);
    }
}
