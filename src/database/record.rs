use chrono::Local;
use serde_json::Value;

use crate::filter::SqlResult;

/// Allow-listed column/value pairs for a single INSERT or UPDATE.
///
/// Column names are `'static` so they can only come from code; request bodies are
/// mapped into a `Record` field by field through [`IntoRecord`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(&'static str, Value)>,
}

/// Explicit request-body → column mapping.
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any earlier value for it.
    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Set a column only when a value was provided.
    pub fn set_opt<V: Into<Value>>(&mut self, column: &'static str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    /// Stamp a DATETIME column with the local wall clock.
    pub fn set_now(&mut self, column: &'static str) -> &mut Self {
        self.set(column, Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(c, _)| *c == column)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(c, _)| *c)
    }

    pub fn insert_sql(&self, table: &str) -> SqlResult {
        let columns: Vec<&str> = self.columns().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        SqlResult {
            query: format!("INSERT INTO `{}` ({}) VALUES ({})", table, columns.join(", "), placeholders),
            params: self.fields.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    pub fn update_sql(&self, table: &str, where_: &[(&str, Value)]) -> SqlResult {
        let set_clause: Vec<String> = self.columns().map(|c| format!("{} = ?", c)).collect();
        let where_clause: Vec<String> = where_.iter().map(|(c, _)| format!("{} = ?", c)).collect();
        let mut params: Vec<Value> = self.fields.iter().map(|(_, v)| v.clone()).collect();
        params.extend(where_.iter().map(|(_, v)| v.clone()));
        SqlResult {
            query: format!(
                "UPDATE `{}` SET {} WHERE {}",
                table,
                set_clause.join(", "),
                where_clause.join(" AND ")
            ),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_sql_lists_only_set_columns() {
        let mut record = Record::new();
        record
            .set("tema", "Falla bomba")
            .set_opt("lugar", None::<String>)
            .set("critico", true);
        let sql = record.insert_sql("bitacora");
        assert_eq!(sql.query, "INSERT INTO `bitacora` (tema, critico) VALUES (?, ?)");
        assert_eq!(sql.params, vec![json!("Falla bomba"), json!(true)]);
    }

    #[test]
    fn update_sql_appends_key_params() {
        let mut record = Record::new();
        record.set("estatus", "INACTIVO").set("estatus", "FINALIZADO");
        let sql = record.update_sql("menus_usuarios", &[("idmenu", json!(3)), ("login", json!("ana"))]);
        assert_eq!(sql.query, "UPDATE `menus_usuarios` SET estatus = ? WHERE idmenu = ? AND login = ?");
        assert_eq!(sql.params, vec![json!("FINALIZADO"), json!(3), json!("ana")]);
    }

    #[test]
    fn set_now_formats_mysql_datetime() {
        let mut record = Record::new();
        record.set_now("fecha_modificacion");
        let stamp = record.get("fecha_modificacion").and_then(|v| v.as_str()).unwrap().to_string();
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
