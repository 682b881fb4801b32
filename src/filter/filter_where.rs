use serde_json::Value;

use super::types::Conjunction;

/// Incremental WHERE clause builder producing MySQL `?` placeholders.
///
/// Column expressions are always supplied by code, never by request input; only
/// values travel as bound parameters.
#[derive(Debug, Clone)]
pub struct FilterWhere {
    conjunction: Conjunction,
    conditions: Vec<String>,
    param_values: Vec<Value>,
}

impl Default for FilterWhere {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterWhere {
    /// Conditions joined with AND.
    pub fn new() -> Self {
        Self {
            conjunction: Conjunction::And,
            conditions: vec![],
            param_values: vec![],
        }
    }

    /// Conditions joined with OR; meant to be nested through [`FilterWhere::group`].
    pub fn any_of() -> Self {
        Self {
            conjunction: Conjunction::Or,
            ..Self::new()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if value.is_null() {
            self.conditions.push(format!("{} IS NULL", column));
        } else {
            self.push(format!("{} = ?", column), vec![value]);
        }
        self
    }

    pub fn ne(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if value.is_null() {
            self.conditions.push(format!("{} IS NOT NULL", column));
        } else {
            self.push(format!("{} <> ?", column), vec![value]);
        }
        self
    }

    pub fn gte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push(format!("{} >= ?", column), vec![value.into()]);
        self
    }

    pub fn lte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push(format!("{} <= ?", column), vec![value.into()]);
        self
    }

    /// `column LIKE %needle%`
    pub fn contains(&mut self, column: &str, needle: &str) -> &mut Self {
        self.push(format!("{} LIKE ?", column), vec![Value::String(format!("%{}%", escape_like(needle)))]);
        self
    }

    /// One needle searched across several columns: `(a LIKE ? OR b LIKE ?)`.
    pub fn contains_any(&mut self, columns: &[&str], needle: &str) -> &mut Self {
        let mut any = FilterWhere::any_of();
        for column in columns {
            any.contains(column, needle);
        }
        self.group(any)
    }

    pub fn in_list(&mut self, column: &str, values: Vec<Value>) -> &mut Self {
        if values.is_empty() {
            self.conditions.push("1=0".to_string());
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.push(format!("{} IN ({})", column, placeholders), values);
        self
    }

    /// A literal predicate with no parameters, e.g. `b.publico = 1`.
    pub fn raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.conditions.push(sql.into());
        self
    }

    /// A literal predicate with its own placeholders.
    pub fn raw_with(&mut self, sql: impl Into<String>, params: Vec<Value>) -> &mut Self {
        self.push(sql.into(), params);
        self
    }

    /// Nest another builder as a parenthesized sub-clause.
    pub fn group(&mut self, other: FilterWhere) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        let (sql, params) = other.build();
        self.push(format!("({})", sql), params);
        self
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        (self.conditions.join(self.conjunction.joiner()), self.param_values.clone())
    }

    fn push(&mut self, condition: String, params: Vec<Value>) {
        self.conditions.push(condition);
        self.param_values.extend(params);
    }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_and_chain_with_params_in_order() {
        let mut w = FilterWhere::new();
        w.gte("b.fecha", "2025-01-01").lte("b.fecha", "2025-01-31").eq("b.turno", "2");
        let (sql, params) = w.build();
        assert_eq!(sql, "b.fecha >= ? AND b.fecha <= ? AND b.turno = ?");
        assert_eq!(params, vec![json!("2025-01-01"), json!("2025-01-31"), json!("2")]);
    }

    #[test]
    fn null_equality_uses_is_null() {
        let mut w = FilterWhere::new();
        w.eq("m.idpadre", Value::Null).ne("m.url", Value::Null);
        let (sql, params) = w.build();
        assert_eq!(sql, "m.idpadre IS NULL AND m.url IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn keyword_search_groups_or_clause() {
        let mut w = FilterWhere::new();
        w.eq("estatus", "ACTIVO").contains_any(&["tema", "descripcion"], "50%_off");
        let (sql, params) = w.build();
        assert_eq!(sql, "estatus = ? AND (tema LIKE ? OR descripcion LIKE ?)");
        assert_eq!(params[1], json!("%50\\%\\_off%"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let mut w = FilterWhere::new();
        w.in_list("id", vec![]);
        assert_eq!(w.build().0, "1=0");

        let mut w = FilterWhere::new();
        w.in_list("id", vec![json!(1), json!(2)]);
        assert_eq!(w.build().0, "id IN (?, ?)");
    }

    #[test]
    fn empty_group_is_ignored() {
        let mut w = FilterWhere::new();
        w.group(FilterWhere::any_of());
        assert!(w.is_empty());
    }
}
