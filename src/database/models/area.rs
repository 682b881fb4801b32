use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, Activo, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Area {
    pub idarea: i32,
    pub nombrearea: String,
    pub estatusarea: String,
    pub responsable: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaInput {
    pub nombrearea: Option<String>,
    pub estatusarea: Option<Activo>,
    pub responsable: Option<String>,
}

impl AreaInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new().text("nombrearea", &self.nombrearea).finish()
    }
}

impl IntoRecord for AreaInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("nombrearea", clean(self.nombrearea))
            .set_opt("estatusarea", self.estatusarea)
            .set_opt("responsable", self.responsable);
        record
    }
}
