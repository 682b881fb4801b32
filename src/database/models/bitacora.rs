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

pub const BITACORA_SELECT: &str =
    "b.*, u.nombres AS nombre_usuario, a.nombrearea AS nombre_area, e.descripcion_equipo AS nombre_equipo";

pub const BITACORA_FROM: &str = "bitacora b \
    LEFT JOIN usuarios u ON u.login = b.login \
    LEFT JOIN areas a ON a.idarea = b.fkarea \
    LEFT JOIN equipos e ON e.idequipo = b.fkequipo";

pub const BITACORA_SCOPE: ScopeColumns = ScopeColumns {
    owner: "b.login",
    area: "b.fkarea",
    public: Some("b.publico"),
};

status_enum!(Turno {
    Primero => "1",
    Segundo => "2",
    Tercero => "3",
});

status_enum!(EstatusBitacora {
    Activo => "ACTIVO",
    Inactivo => "INACTIVO",
    Pendiente => "PENDIENTE",
    Finalizado => "FINALIZADO",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Bitacora {
    pub idbitacora: i32,
    pub fecha: NaiveDate,
    pub hora: NaiveTime,
    pub turno: String,
    pub login: String,
    pub fecha_hora_registrado: NaiveDateTime,
    pub fkequipo: Option<i32>,
    pub tema: String,
    pub descripcion: String,
    pub estatus: String,
    pub critico: bool,
    pub fkarea: i32,
    pub lugar: Option<String>,
    pub tipo: Option<String>,
    pub responsables: Option<String>,
    pub observacion: Option<String>,
    pub que_se_hizo: Option<String>,
    pub horas_duracion: Option<f64>,
    pub publico: bool,
    pub login_modificacion: Option<String>,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub en_cartelera: bool,
    #[sqlx(default)]
    pub nombre_usuario: Option<String>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
    #[sqlx(default)]
    pub nombre_equipo: Option<String>,
}

impl Scoped for Bitacora {
    fn owner_login(&self) -> &str {
        &self.login
    }
    fn area(&self) -> Option<i32> {
        Some(self.fkarea)
    }
    fn is_public(&self) -> bool {
        self.publico
    }
}

impl Bitacora {
    /// Bulletin published when the log goes on the board. Visibility follows the log.
    pub fn derived_bulletin(&self, login: &str, today: NaiveDate) -> DerivedBulletin {
        let (inicio, fin) = derived_window(today);
        DerivedBulletin {
            fkarea: self.fkarea,
            titulo: self.tema.clone(),
            descripcion: self.descripcion.clone(),
            login_registrado: login.to_string(),
            inicio,
            fin,
            tipo_info: TipoInfo::Warning,
            publico: self.publico,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BitacoraInput {
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_time")]
    pub hora: Option<NaiveTime>,
    pub turno: Option<Turno>,
    pub fkequipo: Option<i32>,
    pub tema: Option<String>,
    pub descripcion: Option<String>,
    pub estatus: Option<EstatusBitacora>,
    #[serde(default, deserialize_with = "flag")]
    pub critico: Option<bool>,
    pub fkarea: Option<i32>,
    pub lugar: Option<String>,
    pub tipo: Option<String>,
    pub responsables: Option<String>,
    pub observacion: Option<String>,
    pub que_se_hizo: Option<String>,
    pub horas_duracion: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    pub publico: Option<bool>,
}

impl BitacoraInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .field("fecha", &self.fecha)
            .field("hora", &self.hora)
            .field("turno", &self.turno)
            .text("tema", &self.tema)
            .text("descripcion", &self.descripcion)
            .finish()?;
        self.validate_common()
    }

    pub fn validate_common(&self) -> Result<(), ApiError> {
        if let Some(horas) = self.horas_duracion {
            if !horas.is_finite() || horas < 0.0 {
                return Err(ApiError::bad_request("horas_duracion debe ser un número positivo"));
            }
        }
        Ok(())
    }
}

impl IntoRecord for BitacoraInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fecha", self.fecha.map(sql_date))
            .set_opt("hora", self.hora.map(sql_time))
            .set_opt("turno", self.turno)
            .set_opt("fkequipo", self.fkequipo)
            .set_opt("tema", clean(self.tema))
            .set_opt("descripcion", clean(self.descripcion))
            .set_opt("estatus", self.estatus)
            .set_opt("critico", self.critico)
            .set_opt("fkarea", self.fkarea)
            .set_opt("lugar", self.lugar)
            .set_opt("tipo", self.tipo)
            .set_opt("responsables", self.responsables)
            .set_opt("observacion", self.observacion)
            .set_opt("que_se_hizo", self.que_se_hizo)
            .set_opt("horas_duracion", self.horas_duracion)
            .set_opt("publico", self.publico);
        record
    }
}

/// Filters shared by the list and search endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitacoraQuery {
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub turno: Option<Turno>,
    pub login: Option<String>,
    pub fkequipo: Option<i32>,
    pub fkarea: Option<i32>,
    #[serde(default, deserialize_with = "flag")]
    pub critico: Option<bool>,
    pub estatus: Option<EstatusBitacora>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BitacoraQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(desde) = self.fecha_inicio {
            where_.gte("b.fecha", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("b.fecha", sql_date(hasta));
        }
        if let Some(turno) = self.turno {
            where_.eq("b.turno", turno);
        }
        if let Some(login) = self.login.as_deref().filter(|l| !l.is_empty()) {
            where_.eq("b.login", login);
        }
        if let Some(fkequipo) = self.fkequipo {
            where_.eq("b.fkequipo", fkequipo);
        }
        if let Some(fkarea) = self.fkarea {
            where_.eq("b.fkarea", fkarea);
        }
        if let Some(critico) = self.critico {
            where_.eq("b.critico", critico);
        }
        if let Some(estatus) = self.estatus {
            where_.eq("b.estatus", estatus);
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            where_.contains_any(&["b.descripcion", "b.tema"], keyword);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_core_fields() {
        let input: BitacoraInput = serde_json::from_value(json!({ "tema": "Falla" })).unwrap();
        let err = input.validate_create().unwrap_err();
        for field in ["fecha", "hora", "turno", "descripcion"] {
            assert!(err.message().contains(field), "missing {}", field);
        }
    }

    #[test]
    fn turno_outside_range_is_rejected() {
        let body = json!({ "fecha": "2025-06-01", "hora": "07:00", "turno": "4", "tema": "x", "descripcion": "y" });
        assert!(serde_json::from_value::<BitacoraInput>(body).is_err());
    }

    #[test]
    fn login_cannot_be_spoofed_through_body() {
        let body = json!({ "tema": "x", "login": "root" });
        assert!(serde_json::from_value::<BitacoraInput>(body).is_err());
    }

    #[test]
    fn query_builds_filters() {
        let query: BitacoraQuery = serde_json::from_value(json!({
            "fechaInicio": "2025-06-01",
            "turno": "2",
            "critico": "1",
            "keyword": "bomba"
        }))
        .unwrap();
        let mut where_ = FilterWhere::new();
        query.apply(&mut where_);
        let (sql, params) = where_.build();
        assert_eq!(
            sql,
            "b.fecha >= ? AND b.turno = ? AND b.critico = ? AND (b.descripcion LIKE ? OR b.tema LIKE ?)"
        );
        assert_eq!(params, vec![json!("2025-06-01"), json!("2"), json!(true), json!("%bomba%"), json!("%bomba%")]);
    }
}
