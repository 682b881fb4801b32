use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, flexible_date, flexible_datetime, sql_date, sql_datetime, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::policy::{ScopeColumns, Scoped};

pub const TAREA_SELECT: &str = "t.*, u.nombres AS nombre_usuario, a.nombrearea AS nombre_area, \
    (SELECT COUNT(*) FROM detallestareas d WHERE d.fktarea = t.idtarea) AS detalles_count";

pub const TAREA_FROM: &str = "tareas t \
    LEFT JOIN areas a ON a.idarea = t.fkarea \
    LEFT JOIN usuarios u ON u.login = t.login_registrado";

pub const TAREA_SCOPE: ScopeColumns = ScopeColumns {
    owner: "t.login_registrado",
    area: "t.fkarea",
    public: None,
};

pub const DETALLE_SELECT: &str = "d.*, u.nombres AS nombre_usuario, e.descripcion_equipo AS nombre_equipo";

pub const DETALLE_FROM: &str = "detallestareas d \
    LEFT JOIN usuarios u ON u.login = d.login_registrado \
    LEFT JOIN equipos e ON e.idequipo = d.fkequipo";

status_enum!(EstatusTarea {
    Pendiente => "PENDIENTE",
    EnProceso => "EN_PROCESO",
    Finalizada => "FINALIZADA",
    Cancelada => "CANCELADA",
});

status_enum!(TipoTarea {
    Normal => "NORMAL",
    Urgente => "URGENTE",
    Preventiva => "PREVENTIVA",
    Correctiva => "CORRECTIVA",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tarea {
    pub idtarea: i32,
    pub fecha_registrado: NaiveDateTime,
    pub login_registrado: String,
    pub tipo_tarea: String,
    pub descripcion: String,
    pub estatus: String,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub login_modificacion: Option<String>,
    pub fkarea: i32,
    #[sqlx(default)]
    pub nombre_usuario: Option<String>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
    #[sqlx(default)]
    pub detalles_count: Option<i64>,
}

impl Scoped for Tarea {
    fn owner_login(&self) -> &str {
        &self.login_registrado
    }
    fn area(&self) -> Option<i32> {
        Some(self.fkarea)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TareaInput {
    pub tipo_tarea: Option<TipoTarea>,
    pub descripcion: Option<String>,
    pub estatus: Option<EstatusTarea>,
    pub fkarea: Option<i32>,
}

impl TareaInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("descripcion", &self.descripcion)
            .field("tipo_tarea", &self.tipo_tarea)
            .finish()
    }
}

impl IntoRecord for TareaInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("tipo_tarea", self.tipo_tarea)
            .set_opt("descripcion", clean(self.descripcion))
            .set_opt("estatus", self.estatus)
            .set_opt("fkarea", self.fkarea);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TareaQuery {
    pub descripcion: Option<String>,
    pub tipo_tarea: Option<TipoTarea>,
    pub estatus: Option<EstatusTarea>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub login_registrado: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TareaQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(text) = self.descripcion.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            where_.contains("t.descripcion", text);
        }
        if let Some(tipo) = self.tipo_tarea {
            where_.eq("t.tipo_tarea", tipo);
        }
        if let Some(estatus) = self.estatus {
            where_.eq("t.estatus", estatus);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("DATE(t.fecha_registrado)", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("DATE(t.fecha_registrado)", sql_date(hasta));
        }
        if let Some(login) = self.login_registrado.as_deref().filter(|l| !l.is_empty()) {
            where_.eq("t.login_registrado", login);
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DetalleTarea {
    pub iddetalletarea: i32,
    pub fktarea: i32,
    pub fkequipo: Option<i32>,
    pub descripcion: String,
    pub responsable: String,
    pub estatus: String,
    pub fecha_inicio: Option<NaiveDateTime>,
    pub fecha_fin: Option<NaiveDateTime>,
    pub fecha_registro: NaiveDateTime,
    pub login_registrado: String,
    pub fecha_modificacion: Option<NaiveDateTime>,
    pub login_modificacion: Option<String>,
    #[sqlx(default)]
    pub nombre_usuario: Option<String>,
    #[sqlx(default)]
    pub nombre_equipo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetalleInput {
    pub fkequipo: Option<i32>,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub estatus: Option<EstatusTarea>,
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub fecha_inicio: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub fecha_fin: Option<NaiveDateTime>,
}

impl DetalleInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("descripcion", &self.descripcion)
            .text("responsable", &self.responsable)
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

impl IntoRecord for DetalleInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fkequipo", self.fkequipo)
            .set_opt("descripcion", clean(self.descripcion))
            .set_opt("responsable", clean(self.responsable))
            .set_opt("estatus", self.estatus)
            .set_opt("fecha_inicio", self.fecha_inicio.map(sql_datetime))
            .set_opt("fecha_fin", self.fecha_fin.map(sql_datetime));
        record
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetalleStatusInput {
    pub estatus: Option<EstatusTarea>,
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub fecha_fin: Option<NaiveDateTime>,
}

impl DetalleStatusInput {
    /// Status columns to write. Finishing without an end time stamps `now`.
    pub fn into_record(self, now: NaiveDateTime) -> Result<Record, ApiError> {
        let Some(estatus) = self.estatus else {
            return Err(ApiError::missing_fields(&["estatus"]));
        };
        let mut record = Record::new();
        record.set("estatus", estatus);
        match (estatus, self.fecha_fin) {
            (_, Some(fin)) => {
                record.set("fecha_fin", sql_datetime(fin));
            }
            (EstatusTarea::Finalizada, None) => {
                record.set("fecha_fin", sql_datetime(now));
            }
            _ => {}
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap().and_hms_opt(15, 30, 0).unwrap()
    }

    #[test]
    fn finishing_without_end_stamps_now() {
        let body: DetalleStatusInput = serde_json::from_value(json!({ "estatus": "FINALIZADA" })).unwrap();
        let record = body.into_record(now()).unwrap();
        assert_eq!(record.get("fecha_fin"), Some(&json!("2025-06-10 15:30:00")));
    }

    #[test]
    fn explicit_end_is_kept() {
        let body: DetalleStatusInput =
            serde_json::from_value(json!({ "estatus": "FINALIZADA", "fecha_fin": "2025-06-09 08:00:00" })).unwrap();
        let record = body.into_record(now()).unwrap();
        assert_eq!(record.get("fecha_fin"), Some(&json!("2025-06-09 08:00:00")));
    }

    #[test]
    fn other_statuses_leave_end_untouched() {
        let body: DetalleStatusInput = serde_json::from_value(json!({ "estatus": "EN_PROCESO" })).unwrap();
        assert!(!body.into_record(now()).unwrap().contains("fecha_fin"));
    }

    #[test]
    fn task_create_requires_type() {
        let input: TareaInput = serde_json::from_value(json!({ "descripcion": "Revisar bomba" })).unwrap();
        assert!(input.validate_create().unwrap_err().message().contains("tipo_tarea"));
    }
}
