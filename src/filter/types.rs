use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), sort: SortDirection::Asc }
    }

    pub fn desc(column: &str) -> Self {
        Self { column: column.to_string(), sort: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn joiner(&self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

/// Generated SQL with `?` placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
