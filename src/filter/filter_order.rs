use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse a client sort request (`column` plus optional `asc`/`desc`) against an
    /// allow-list of `(api name, sql column)` pairs.
    pub fn from_request(
        column: Option<&str>,
        direction: Option<&str>,
        allowed: &[(&str, &str)],
    ) -> Result<Option<FilterOrderInfo>, FilterError> {
        let Some(requested) = column.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        let sql_column = allowed
            .iter()
            .find(|(api, _)| api.eq_ignore_ascii_case(requested))
            .map(|(_, sql)| *sql)
            .ok_or_else(|| FilterError::InvalidOrderColumn(requested.to_string()))?;

        let sort = Self::parse_direction(direction.unwrap_or("desc"))?;
        Ok(Some(FilterOrderInfo { column: sql_column.to_string(), sort }))
    }

    pub fn parse_direction(direction: &str) -> Result<SortDirection, FilterError> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(FilterError::InvalidOrderDirection(other.to_string())),
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[(&str, &str)] = &[("fecha", "o.fecha"), ("folio", "o.folio")];

    #[test]
    fn maps_api_names_to_columns() {
        let info = FilterOrder::from_request(Some("FECHA"), Some("asc"), ALLOWED).unwrap().unwrap();
        assert_eq!(info.column, "o.fecha");
        assert_eq!(info.sort, SortDirection::Asc);
        assert_eq!(FilterOrder::from_request(None, None, ALLOWED).unwrap(), None);
    }

    #[test]
    fn rejects_columns_outside_allow_list() {
        let err = FilterOrder::from_request(Some("password; DROP"), None, ALLOWED).unwrap_err();
        assert_eq!(err, FilterError::InvalidOrderColumn("password; DROP".into()));
        assert!(FilterOrder::from_request(Some("folio"), Some("sideways"), ALLOWED).is_err());
    }

    #[test]
    fn generates_order_clause() {
        let infos = vec![
            FilterOrderInfo { column: "b.fecha".into(), sort: SortDirection::Desc },
            FilterOrderInfo { column: "b.fecha_hora_registrado".into(), sort: SortDirection::Desc },
        ];
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY b.fecha DESC, b.fecha_hora_registrado DESC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }
}
