use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::{self, FromRow, MySql, MySqlConnection, MySqlPool, Row};

use crate::filter::{Filter, SqlResult};

pub type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;
pub type MySqlQueryAs<'q, O> = sqlx::query::QueryAs<'q, MySql, O, MySqlArguments>;

/// Run a generated SELECT and map every row.
pub async fn fetch_all<T>(pool: &MySqlPool, sql: &SqlResult) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    bind_params_as(sqlx::query_as::<_, T>(&sql.query), &sql.params)
        .fetch_all(pool)
        .await
}

pub async fn fetch_optional<T>(pool: &MySqlPool, sql: &SqlResult) -> Result<Option<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    bind_params_as(sqlx::query_as::<_, T>(&sql.query), &sql.params)
        .fetch_optional(pool)
        .await
}

/// Run a `SELECT COUNT(*) AS count ...` statement.
pub async fn fetch_count(pool: &MySqlPool, sql: &SqlResult) -> Result<i64, sqlx::Error> {
    let row = bind_params(sqlx::query(&sql.query), &sql.params)
        .fetch_one(pool)
        .await?;
    row.try_get("count")
}

pub async fn execute(pool: &MySqlPool, sql: &SqlResult) -> Result<MySqlQueryResult, sqlx::Error> {
    bind_params(sqlx::query(&sql.query), &sql.params).execute(pool).await
}

/// Statement run on a borrowed connection, typically `&mut *tx` inside a transaction.
pub async fn execute_on(conn: &mut MySqlConnection, sql: &SqlResult) -> Result<MySqlQueryResult, sqlx::Error> {
    bind_params(sqlx::query(&sql.query), &sql.params).execute(conn).await
}

pub async fn fetch_count_on(conn: &mut MySqlConnection, sql: &SqlResult) -> Result<i64, sqlx::Error> {
    let row = bind_params(sqlx::query(&sql.query), &sql.params)
        .fetch_one(conn)
        .await?;
    row.try_get("count")
}

/// Fetch one page of rows plus the unpaginated total for the same filter.
/// Both queries run concurrently on separate pool connections.
pub async fn fetch_page<T>(
    pool: &MySqlPool,
    filter: &Filter,
    select: &str,
    from: &str,
) -> Result<(Vec<T>, i64), sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let rows_sql = filter.to_sql(select, from);
    let count_sql = filter.to_count_sql(from);
    futures::try_join!(fetch_all(pool, &rows_sql), fetch_count(pool, &count_sql))
}

pub fn bind_params<'q>(mut q: MySqlQuery<'q>, params: &'q [Value]) -> MySqlQuery<'q> {
    for v in params {
        q = match v {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    q.bind(i)
                } else if let Some(u) = n.as_u64() {
                    q.bind(u)
                } else if let Some(f) = n.as_f64() {
                    q.bind(f)
                } else {
                    q.bind(n.to_string())
                }
            }
            Value::String(s) => q.bind(s.as_str()),
            Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
        };
    }
    q
}

pub fn bind_params_as<'q, O>(mut q: MySqlQueryAs<'q, O>, params: &'q [Value]) -> MySqlQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, MySqlRow>,
{
    for v in params {
        q = match v {
            Value::Null => q.bind(None::<String>),
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    q.bind(i)
                } else if let Some(u) = n.as_u64() {
                    q.bind(u)
                } else if let Some(f) = n.as_f64() {
                    q.bind(f)
                } else {
                    q.bind(n.to_string())
                }
            }
            Value::String(s) => q.bind(s.as_str()),
            Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
        };
    }
    q
}
