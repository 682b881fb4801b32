use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, flag, flexible_date, flexible_time, sql_date, sql_time, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::policy::Scoped;

pub const REUNION_SELECT: &str = "r.*, a.nombrearea AS nombre_area";
pub const REUNION_FROM: &str = "reuniones r LEFT JOIN areas a ON a.idarea = r.fkarea";

status_enum!(EstatusReunion {
    Programada => "PROGRAMADA",
    EnProceso => "EN_PROCESO",
    Finalizada => "FINALIZADA",
    Cancelada => "CANCELADA",
});

status_enum!(TipoReunion {
    Urgente => "URGENTE",
    Critica => "CRITICA",
    Diaria => "DIARIA",
    Semanal => "SEMANAL",
    Mensual => "MENSUAL",
    Anual => "ANUAL",
    Extraordinaria => "EXTRAORDINARIA",
    Normal => "NORMAL",
    Festejo => "FESTEJO",
    Reconocimiento => "RECONOCIMIENTO",
    Adiestramiento => "ADISTRAMIENTO",
    Presentacion => "PRESENTACION",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reunion {
    pub idreunion: i32,
    pub tema: String,
    pub fkarea: Option<i32>,
    pub fecha_inicio: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub fecha_fin: Option<NaiveDate>,
    pub horafin: Option<NaiveTime>,
    pub login_registrado: String,
    pub fecha_registrado: NaiveDateTime,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub login_modificacion: Option<String>,
    pub estatus: String,
    pub lugar: Option<String>,
    pub responsable: Option<String>,
    pub tipo: String,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
}

impl Scoped for Reunion {
    fn owner_login(&self) -> &str {
        &self.login_registrado
    }
    fn area(&self) -> Option<i32> {
        self.fkarea
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReunionInput {
    pub tema: Option<String>,
    pub fkarea: Option<i32>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_time")]
    pub hora_inicio: Option<NaiveTime>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_time")]
    pub horafin: Option<NaiveTime>,
    pub estatus: Option<EstatusReunion>,
    pub lugar: Option<String>,
    pub responsable: Option<String>,
    pub tipo: Option<TipoReunion>,
}

impl ReunionInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("tema", &self.tema)
            .field("fecha_inicio", &self.fecha_inicio)
            .field("hora_inicio", &self.hora_inicio)
            .field("tipo", &self.tipo)
            .finish()?;
        self.validate_dates()
    }

    pub fn validate_dates(&self) -> Result<(), ApiError> {
        if let (Some(inicio), Some(fin)) = (self.fecha_inicio, self.fecha_fin) {
            if fin < inicio {
                return Err(ApiError::bad_request(
                    "La fecha de fin no puede ser anterior a la fecha de inicio",
                ));
            }
        }
        Ok(())
    }
}

impl IntoRecord for ReunionInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("tema", clean(self.tema))
            .set_opt("fkarea", self.fkarea)
            .set_opt("fecha_inicio", self.fecha_inicio.map(sql_date))
            .set_opt("hora_inicio", self.hora_inicio.map(sql_time))
            .set_opt("fecha_fin", self.fecha_fin.map(sql_date))
            .set_opt("horafin", self.horafin.map(sql_time))
            .set_opt("estatus", self.estatus)
            .set_opt("lugar", self.lugar)
            .set_opt("responsable", self.responsable)
            .set_opt("tipo", self.tipo);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReunionQuery {
    pub tema: Option<String>,
    pub fkarea: Option<i32>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub estatus: Option<EstatusReunion>,
    pub tipo: Option<TipoReunion>,
    pub responsable: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ReunionQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(tema) = self.tema.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            where_.contains("r.tema", tema);
        }
        if let Some(fkarea) = self.fkarea {
            where_.eq("r.fkarea", fkarea);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("r.fecha_inicio", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("r.fecha_inicio", sql_date(hasta));
        }
        if let Some(estatus) = self.estatus {
            where_.eq("r.estatus", estatus);
        }
        if let Some(tipo) = self.tipo {
            where_.eq("r.tipo", tipo);
        }
        if let Some(responsable) = self.responsable.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            where_.contains("r.responsable", responsable);
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Minuta {
    pub idminuta: i32,
    pub fkreunion: i32,
    pub descripcionminuta: String,
    pub responsable: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinutaInput {
    pub fkreunion: Option<i32>,
    pub descripcionminuta: Option<String>,
    pub responsable: Option<String>,
}

impl MinutaInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .field("fkreunion", &self.fkreunion)
            .text("descripcionminuta", &self.descripcionminuta)
            .finish()
    }
}

impl IntoRecord for MinutaInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fkreunion", self.fkreunion)
            .set_opt("descripcionminuta", clean(self.descripcionminuta))
            .set_opt("responsable", self.responsable);
        record
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IntegranteReunion {
    pub idintegrantereunion: i32,
    pub fkreunion: i32,
    pub nombres_apellidos_integrante: String,
    pub asistio: bool,
    pub emailintegrante: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegranteInput {
    pub fkreunion: Option<i32>,
    pub nombres_apellidos_integrante: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub asistio: Option<bool>,
    pub emailintegrante: Option<String>,
}

impl IntegranteInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .field("fkreunion", &self.fkreunion)
            .text("nombres_apellidos_integrante", &self.nombres_apellidos_integrante)
            .finish()
    }
}

impl IntoRecord for IntegranteInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fkreunion", self.fkreunion)
            .set_opt("nombres_apellidos_integrante", clean(self.nombres_apellidos_integrante))
            .set_opt("asistio", self.asistio)
            .set_opt("emailintegrante", self.emailintegrante);
        record
    }
}

/// One attendee inside a bulk request; the meeting comes from the envelope.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegranteBulkItem {
    pub nombres_apellidos_integrante: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub asistio: Option<bool>,
    pub emailintegrante: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrantesBulkInput {
    pub fkreunion: Option<i32>,
    #[serde(default)]
    pub integrantes: Vec<IntegranteBulkItem>,
}

impl IntegrantesBulkInput {
    /// Validate the envelope and turn every item into an insertable row.
    pub fn into_records(self) -> Result<(i32, Vec<Record>), ApiError> {
        let Some(fkreunion) = self.fkreunion else {
            return Err(ApiError::missing_fields(&["fkreunion"]));
        };
        if self.integrantes.is_empty() {
            return Err(ApiError::bad_request("Debe enviar al menos un integrante"));
        }

        let mut records = Vec::with_capacity(self.integrantes.len());
        for (idx, item) in self.integrantes.into_iter().enumerate() {
            let Some(nombre) = clean(item.nombres_apellidos_integrante) else {
                return Err(ApiError::bad_request(format!(
                    "El integrante {} no tiene nombres_apellidos_integrante",
                    idx + 1
                )));
            };
            let mut record = Record::new();
            record
                .set("fkreunion", fkreunion)
                .set("nombres_apellidos_integrante", nombre)
                .set("asistio", item.asistio.unwrap_or(false))
                .set_opt("emailintegrante", item.emailintegrante);
            records.push(record);
        }
        Ok((fkreunion, records))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsistenciaInput {
    #[serde(default, deserialize_with = "flag")]
    pub asistio: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meeting_type_comes_from_fixed_list() {
        let body = json!({ "tema": "Arranque", "fecha_inicio": "2025-06-02", "hora_inicio": "08:00", "tipo": "CASUAL" });
        assert!(serde_json::from_value::<ReunionInput>(body).is_err());

        let body = json!({ "tema": "Arranque", "fecha_inicio": "2025-06-02", "hora_inicio": "08:00", "tipo": "DIARIA" });
        let input: ReunionInput = serde_json::from_value(body).unwrap();
        assert!(input.validate_create().is_ok());
    }

    #[test]
    fn bulk_requires_names() {
        let body: IntegrantesBulkInput = serde_json::from_value(json!({
            "fkreunion": 3,
            "integrantes": [{ "nombres_apellidos_integrante": "Ana Pérez" }, { "emailintegrante": "x@y.z" }]
        }))
        .unwrap();
        let err = body.into_records().unwrap_err();
        assert!(err.message().contains("integrante 2"));
    }

    #[test]
    fn bulk_maps_each_item() {
        let body: IntegrantesBulkInput = serde_json::from_value(json!({
            "fkreunion": 3,
            "integrantes": [{ "nombres_apellidos_integrante": "Ana" }, { "nombres_apellidos_integrante": "Luis", "asistio": 1 }]
        }))
        .unwrap();
        let (reunion, records) = body.into_records().unwrap();
        assert_eq!(reunion, 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("asistio"), Some(&json!(true)));
    }
}
