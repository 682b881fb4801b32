use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{flag, flexible_date, sql_date};
use crate::filter::{FilterError, FilterOrder, FilterOrderInfo, FilterWhere};

/// Columns the legacy list can be sorted by, as `(query name, column)`.
pub const OLD_BITACORA_ORDER: &[(&str, &str)] = &[
    ("fecha", "fecha"),
    ("hora", "hora"),
    ("folio", "folio"),
    ("turno", "turno"),
    ("tipo", "tipo"),
    ("tema", "tema"),
    ("usuario", "usuario"),
    ("codigoEQ", "codigoEQ"),
    ("critico", "critico"),
    ("revisado", "revisado"),
];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OldBitacora {
    pub fecha: NaiveDate,
    pub hora: NaiveTime,
    pub folio: i32,
    pub turno: Option<String>,
    pub tipo: Option<String>,
    pub tema: Option<String>,
    pub descripcion: Option<String>,
    pub usuario: Option<String>,
    #[sqlx(rename = "codigoEQ")]
    #[serde(rename = "codigoEQ")]
    pub codigo_eq: Option<String>,
    pub critico: bool,
    pub revisado: bool,
    pub quepaso: Option<String>,
    pub porquepaso: Option<String>,
    pub quesehizo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OldBitacoraQuery {
    pub folio: Option<i32>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub fecha_fin: Option<NaiveDate>,
    pub tipo: Option<String>,
    pub tema: Option<String>,
    pub descripcion: Option<String>,
    pub usuario: Option<String>,
    #[serde(rename = "codigoEQ")]
    pub codigo_eq: Option<String>,
    pub turno: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub critico: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub revisado: Option<bool>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
    #[serde(rename = "orderDir")]
    pub order_dir: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OldBitacoraQuery {
    pub fn apply(&self, where_: &mut FilterWhere) {
        if let Some(folio) = self.folio {
            where_.eq("folio", folio);
        }
        if let Some(desde) = self.fecha_inicio {
            where_.gte("fecha", sql_date(desde));
        }
        if let Some(hasta) = self.fecha_fin {
            where_.lte("fecha", sql_date(hasta));
        }
        if let Some(tipo) = non_blank(&self.tipo) {
            where_.eq("tipo", tipo);
        }
        if let Some(tema) = non_blank(&self.tema) {
            where_.contains("tema", tema);
        }
        if let Some(text) = non_blank(&self.descripcion) {
            where_.contains_any(&["descripcion", "quepaso", "porquepaso", "quesehizo"], text);
        }
        if let Some(usuario) = non_blank(&self.usuario) {
            where_.contains("usuario", usuario);
        }
        if let Some(codigo) = non_blank(&self.codigo_eq) {
            where_.contains("codigoEQ", codigo);
        }
        if let Some(turno) = non_blank(&self.turno) {
            where_.eq("turno", turno);
        }
        if let Some(critico) = self.critico {
            where_.eq("critico", critico);
        }
        if let Some(revisado) = self.revisado {
            where_.eq("revisado", revisado);
        }
    }

    /// Requested sort, defaulting to newest first.
    pub fn order(&self) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match FilterOrder::from_request(
            self.order_by.as_deref(),
            self.order_dir.as_deref(),
            OLD_BITACORA_ORDER,
        )? {
            Some(info) => Ok(vec![info]),
            None => Ok(vec![
                FilterOrderInfo::desc("fecha"),
                FilterOrderInfo::desc("hora"),
                FilterOrderInfo::desc("folio"),
            ]),
        }
    }
}

/// Distinct values offered as filter choices.
#[derive(Debug, Clone, Serialize)]
pub struct OldBitacoraCatalogos {
    pub tipos: Vec<String>,
    pub turnos: Vec<String>,
    pub usuarios: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_order_is_newest_first() {
        let query = OldBitacoraQuery::default();
        let order = query.order().unwrap();
        assert_eq!(FilterOrder::generate(&order), "ORDER BY fecha DESC, hora DESC, folio DESC");
    }

    #[test]
    fn order_column_must_be_allow_listed() {
        let query: OldBitacoraQuery =
            serde_json::from_value(json!({ "orderBy": "descripcion; DROP TABLE x", "orderDir": "ASC" })).unwrap();
        assert!(query.order().is_err());

        let query: OldBitacoraQuery = serde_json::from_value(json!({ "orderBy": "folio", "orderDir": "ASC" })).unwrap();
        assert_eq!(FilterOrder::generate(&query.order().unwrap()), "ORDER BY folio ASC");
    }

    #[test]
    fn free_text_searches_narrative_columns() {
        let query: OldBitacoraQuery = serde_json::from_value(json!({ "descripcion": "válvula", "critico": "1" })).unwrap();
        let mut where_ = FilterWhere::new();
        query.apply(&mut where_);
        let (sql, params) = where_.build();
        assert_eq!(
            sql,
            "(descripcion LIKE ? OR quepaso LIKE ? OR porquepaso LIKE ? OR quesehizo LIKE ?) AND critico = ?"
        );
        assert_eq!(params.len(), 5);
    }
}
