use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, flag, flexible_date, sql_date, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::policy::board::validate_window;
use crate::policy::{ScopeColumns, Scoped};

pub const CARTELERA_SELECT: &str = "c.*, a.nombrearea AS nombre_area, u.nombres AS nombre_usuario";

pub const CARTELERA_FROM: &str = "carteleras c \
    LEFT JOIN areas a ON a.idarea = c.fkarea \
    LEFT JOIN usuarios u ON u.login = c.login_registrado";

pub const CARTELERA_SCOPE: ScopeColumns = ScopeColumns {
    owner: "c.login_registrado",
    area: "c.fkarea",
    public: Some("c.publico"),
};

/// Moves every lapsed ACTIVO bulletin to VENCIDO. Run before listing.
pub const EXPIRE_SQL: &str = "UPDATE carteleras SET estatus = 'VENCIDO' \
    WHERE estatus = 'ACTIVO' AND fecha_fin_publicacion < CURDATE()";

status_enum!(EstatusCartelera {
    Activo => "ACTIVO",
    Inactivo => "INACTIVO",
    Vencido => "VENCIDO",
});

status_enum!(TipoInfo {
    Info => "INFO",
    Warning => "WARNING",
    Danger => "DANGER",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cartelera {
    pub idcartelera: i32,
    pub fkarea: i32,
    pub titulo: String,
    pub descripcion: String,
    pub login_registrado: String,
    pub fecha_registrado: NaiveDateTime,
    pub fecha_inicio_publicacion: NaiveDate,
    pub fecha_fin_publicacion: NaiveDate,
    pub estatus: String,
    pub tipo_info: String,
    pub publico: bool,
    pub fkbitacora: Option<i32>,
    pub fkincidencia: Option<i32>,
    #[sqlx(default)]
    pub nombre_area: Option<String>,
    #[sqlx(default)]
    pub nombre_usuario: Option<String>,
}

impl Scoped for Cartelera {
    fn owner_login(&self) -> &str {
        &self.login_registrado
    }
    fn area(&self) -> Option<i32> {
        Some(self.fkarea)
    }
    fn is_public(&self) -> bool {
        self.publico
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarteleraInput {
    pub fkarea: Option<i32>,
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio_publicacion: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin_publicacion: Option<NaiveDate>,
    pub estatus: Option<EstatusCartelera>,
    pub tipo_info: Option<TipoInfo>,
    #[serde(default, deserialize_with = "flag")]
    pub publico: Option<bool>,
}

impl CarteleraInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new()
            .text("titulo", &self.titulo)
            .text("descripcion", &self.descripcion)
            .field("fecha_inicio_publicacion", &self.fecha_inicio_publicacion)
            .field("fecha_fin_publicacion", &self.fecha_fin_publicacion)
            .finish()?;
        self.validate_window_against(None)
    }

    /// Check the window after merging this body over an existing bulletin.
    pub fn validate_window_against(&self, current: Option<&Cartelera>) -> Result<(), ApiError> {
        let start = self
            .fecha_inicio_publicacion
            .or(current.map(|c| c.fecha_inicio_publicacion));
        let end = self.fecha_fin_publicacion.or(current.map(|c| c.fecha_fin_publicacion));
        match (start, end) {
            (Some(start), Some(end)) => validate_window(start, end),
            _ => Ok(()),
        }
    }
}

impl IntoRecord for CarteleraInput {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set_opt("fkarea", self.fkarea)
            .set_opt("titulo", clean(self.titulo))
            .set_opt("descripcion", clean(self.descripcion))
            .set_opt("fecha_inicio_publicacion", self.fecha_inicio_publicacion.map(sql_date))
            .set_opt("fecha_fin_publicacion", self.fecha_fin_publicacion.map(sql_date))
            .set_opt("estatus", self.estatus)
            .set_opt("tipo_info", self.tipo_info)
            .set_opt("publico", self.publico);
        record
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarteleraQuery {
    pub titulo: Option<String>,
    pub fkarea: Option<i32>,
    pub estatus: Option<EstatusCartelera>,
    #[serde(rename = "tipo_info", alias = "tipoInfo")]
    pub tipo_info: Option<TipoInfo>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CarteleraQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(titulo) = self.titulo.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            where_.contains("c.titulo", titulo);
        }
        if let Some(fkarea) = self.fkarea {
            where_.eq("c.fkarea", fkarea);
        }
        if let Some(estatus) = self.estatus {
            where_.eq("c.estatus", estatus);
        }
        if let Some(tipo) = self.tipo_info {
            where_.eq("c.tipo_info", tipo);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("c.fecha_inicio_publicacion", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("c.fecha_fin_publicacion", sql_date(hasta));
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            where_.contains_any(&["c.titulo", "c.descripcion"], keyword);
        }
    }
}

/// Bulletin derived from a board toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedBulletin {
    pub fkarea: i32,
    pub titulo: String,
    pub descripcion: String,
    pub login_registrado: String,
    pub inicio: NaiveDate,
    pub fin: NaiveDate,
    pub tipo_info: TipoInfo,
    pub publico: bool,
}

impl IntoRecord for DerivedBulletin {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record
            .set("fkarea", self.fkarea)
            .set("titulo", self.titulo)
            .set("descripcion", self.descripcion)
            .set("login_registrado", self.login_registrado)
            .set("fecha_inicio_publicacion", sql_date(self.inicio))
            .set("fecha_fin_publicacion", sql_date(self.fin))
            .set("estatus", EstatusCartelera::Activo)
            .set("tipo_info", self.tipo_info)
            .set("publico", self.publico);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inverted_window_is_rejected_on_create() {
        let input: CarteleraInput = serde_json::from_value(json!({
            "titulo": "Corte de agua",
            "descripcion": "Mantenimiento",
            "fecha_inicio_publicacion": "2025-06-10",
            "fecha_fin_publicacion": "2025-06-01"
        }))
        .unwrap();
        assert_eq!(input.validate_create().unwrap_err().status_code(), 400);
    }

    fn search(uri: &str) -> crate::filter::SqlResult {
        let uri: axum::http::Uri = uri.parse().unwrap();
        let axum::extract::Query(query) = axum::extract::Query::<CarteleraQuery>::try_from_uri(&uri).unwrap();
        let mut filter = crate::filter::Filter::new();
        query.apply(filter.where_clause());
        filter.to_sql("c.*", "carteleras c")
    }

    #[test]
    fn search_filters_on_tipo_info_query_key() {
        let sql = search("/carteleras/search?tipo_info=DANGER&estatus=ACTIVO");
        assert!(sql.query.contains("c.tipo_info"), "{}", sql.query);
        assert!(sql.query.contains("c.estatus"), "{}", sql.query);
        assert!(sql.params.contains(&json!("DANGER")));

        let sql = search("/carteleras/search?tipoInfo=WARNING");
        assert!(sql.params.contains(&json!("WARNING")));

        let sql = search("/carteleras/search?fechaInicio=2025-06-01&titulo=agua");
        assert!(sql.query.contains("c.fecha_inicio_publicacion"));
        assert!(!sql.query.contains("c.tipo_info"));
    }

    #[test]
    fn unknown_tipo_info_is_rejected() {
        let body = json!({ "tipo_info": "CRITICAL" });
        assert!(serde_json::from_value::<CarteleraInput>(body).is_err());
    }
}
