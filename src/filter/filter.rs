use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SortDirection, SqlResult};

/// A SELECT assembled from a fixed `FROM` expression, a WHERE builder, ordering
/// and pagination.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    where_data: FilterWhere,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u32>,
    offset: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_where(where_data: FilterWhere) -> Self {
        Self {
            where_data,
            ..Self::default()
        }
    }

    pub fn where_clause(&mut self) -> &mut FilterWhere {
        &mut self.where_data
    }

    pub fn order_by(&mut self, column: &str, sort: SortDirection) -> &mut Self {
        self.order_data.push(FilterOrderInfo { column: column.to_string(), sort });
        self
    }

    pub fn order(&mut self, info: FilterOrderInfo) -> &mut Self {
        self.order_data.push(info);
        self
    }

    pub fn limit(&mut self, limit: u32, offset: u64) -> &mut Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// One-based page number to LIMIT/OFFSET.
    pub fn paginate(&mut self, page: u32, per_page: u32) -> &mut Self {
        let page = page.max(1) as u64;
        self.limit(per_page, (page - 1) * per_page as u64)
    }

    pub fn to_sql(&self, select: &str, from: &str) -> SqlResult {
        let (where_clause, params) = self.where_data.build();
        let query = [
            format!("SELECT {}", select),
            format!("FROM {}", from),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self, from: &str) -> SqlResult {
        let (where_clause, params) = self.where_data.build();
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM {}", from)
        } else {
            format!("SELECT COUNT(*) AS count FROM {} WHERE {}", from, where_clause)
        };
        SqlResult { query, params }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) if o > 0 => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), _) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_with_where_order_and_page() {
        let mut filter = Filter::new();
        filter.where_clause().eq("b.turno", "1");
        filter
            .order_by("b.fecha", SortDirection::Desc)
            .paginate(3, 20);

        let sql = filter.to_sql("b.*", "bitacora b");
        assert_eq!(
            sql.query,
            "SELECT b.* FROM bitacora b WHERE b.turno = ? ORDER BY b.fecha DESC LIMIT 20 OFFSET 40"
        );
        assert_eq!(sql.params, vec![json!("1")]);
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let mut filter = Filter::new();
        filter.where_clause().eq("fkarea", 4);
        filter.order_by("fecha", SortDirection::Asc).paginate(1, 10);
        let sql = filter.to_count_sql("carteleras");
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM carteleras WHERE fkarea = ?");
        assert_eq!(sql.params, vec![json!(4)]);
    }

    #[test]
    fn unfiltered_select_has_no_where() {
        let filter = Filter::new();
        assert_eq!(filter.to_sql("*", "areas").query, "SELECT * FROM areas");
        assert_eq!(filter.to_count_sql("areas").query, "SELECT COUNT(*) AS count FROM areas");
    }
}
