use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;

pub const EQUIPO_SELECT: &str = "e.*, a.nombrearea AS nombre_area";
pub const EQUIPO_FROM: &str = "equipos e LEFT JOIN areas a ON a.idarea = e.fkarea";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Equipo {
    pub idequipo: i32,
    pub fkarea: Option<i32>,
    pub descripcion_equipo: String,
    pub codigo_sap: Option<String>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipoInput {
    pub fkarea: Option<i32>,
    pub descripcion_equipo: Option<String>,
    pub codigo_sap: Option<String>,
}

impl EquipoInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("descripcion_equipo", &self.descripcion_equipo)
            .field("fkarea", &self.fkarea)
            .finish()
    }
}

impl IntoRecord for EquipoInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fkarea", self.fkarea)
            .set_opt("descripcion_equipo", clean(self.descripcion_equipo))
            .set_opt("codigo_sap", self.codigo_sap);
        record
    }
}
