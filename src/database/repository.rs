use serde_json::Value;
use sqlx::{self, mysql::MySqlRow, FromRow, MySqlPool};

use crate::database::manager::{Database, DatabaseError};
use crate::database::query_builder::{self, bind_params};
use crate::database::record::Record;
use crate::filter::{Filter, FilterWhere};

/// Typed access to a single table keyed by one column.
pub struct Repository<T> {
    table_name: &'static str,
    id_column: &'static str,
    pool: MySqlPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    pub fn new(db: &Database, table_name: &'static str, id_column: &'static str) -> Self {
        Self {
            table_name,
            id_column,
            pool: db.pool().clone(),
            _phantom: std::marker::PhantomData,
        }
    }

    fn from_clause(&self) -> String {
        format!("`{}`", self.table_name)
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        let sql = filter.to_sql("*", &self.from_clause());
        Ok(query_builder::fetch_all(&self.pool, &sql).await?)
    }

    pub async fn select_one(&self, where_: FilterWhere) -> Result<Option<T>, DatabaseError> {
        let mut filter = Filter::with_where(where_);
        filter.limit(1, 0);
        let sql = filter.to_sql("*", &self.from_clause());
        Ok(query_builder::fetch_optional(&self.pool, &sql).await?)
    }

    pub async fn select_by_id(&self, id: impl Into<Value>) -> Result<Option<T>, DatabaseError> {
        let mut where_ = FilterWhere::new();
        where_.eq(self.id_column, id);
        self.select_one(where_).await
    }

    /// Like [`select_by_id`](Self::select_by_id) but a missing row is an error.
    pub async fn select_404(&self, id: impl Into<Value>, what: &str) -> Result<T, DatabaseError> {
        self.select_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(what.to_string()))
    }

    pub async fn count(&self, where_: FilterWhere) -> Result<i64, DatabaseError> {
        let sql = Filter::with_where(where_).to_count_sql(&self.from_clause());
        Ok(query_builder::fetch_count(&self.pool, &sql).await?)
    }

    pub async fn exists(&self, id: impl Into<Value>) -> Result<bool, DatabaseError> {
        let mut where_ = FilterWhere::new();
        where_.eq(self.id_column, id);
        Ok(self.count(where_).await? > 0)
    }

    /// Insert and return the AUTO_INCREMENT id (0 for tables with natural keys).
    pub async fn insert(&self, record: &Record) -> Result<u64, DatabaseError> {
        if record.is_empty() {
            return Err(DatabaseError::EmptyChangeset);
        }
        let sql = record.insert_sql(self.table_name);
        let result = query_builder::execute(&self.pool, &sql).await?;
        Ok(result.last_insert_id())
    }

    pub async fn update(&self, id: impl Into<Value>, record: &Record) -> Result<u64, DatabaseError> {
        if record.is_empty() {
            return Err(DatabaseError::EmptyChangeset);
        }
        let sql = record.update_sql(self.table_name, &[(self.id_column, id.into())]);
        let result = query_builder::execute(&self.pool, &sql).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: impl Into<Value>) -> Result<u64, DatabaseError> {
        let query = format!("DELETE FROM `{}` WHERE {} = ?", self.table_name, self.id_column);
        let params = [id.into()];
        let result = bind_params(sqlx::query(&query), &params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
