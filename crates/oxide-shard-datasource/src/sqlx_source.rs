//! A [`DataSource`] backed by a `sqlx` connection pool.

use std::fmt;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows, SqlValue};
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Column, Row};
use tracing::debug;

use crate::source::{DataSource, run};

static DRIVERS: Lazy<()> = Lazy::new(sqlx::any::install_default_drivers);

/// A pooled handle to one database, addressed by URL
/// (`sqlite::memory:`, `mysql://...`, `postgres://...`).
///
/// Connections are opened on first use.
#[derive(Clone)]
pub struct SqlxDataSource {
    url: String,
    pool: AnyPool,
}

impl fmt::Debug for SqlxDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxDataSource")
            .field("url", &redact(&self.url))
            .finish_non_exhaustive()
    }
}

impl SqlxDataSource {
    /// Creates a lazily connected pool.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDsn`] if `url` cannot be parsed by the driver.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        Lazy::force(&DRIVERS);
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| Error::InvalidDsn(format!("{}: {e}", redact(url))))?;
        Ok(Self {
            url: String::from(url),
            pool,
        })
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DataSource for SqlxDataSource {
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows> {
        debug!(sql = %query.sql, args = query.args.len(), "query");
        let rows = run(ctx, async {
            bind(sqlx::query(&query.sql), &query.args)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::database)
        })
        .await?;
        decode_rows(&rows)
    }

    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        debug!(sql = %query.sql, args = query.args.len(), "exec");
        let done = run(ctx, async {
            bind(sqlx::query(&query.sql), &query.args)
                .execute(&self.pool)
                .await
                .map_err(Error::database)
        })
        .await?;
        Ok(ExecResult {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

type AnyQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

fn bind<'q>(mut query: AnyQuery<'q>, args: &[SqlValue]) -> AnyQuery<'q> {
    for arg in args {
        query = match arg.clone() {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Float(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Blob(b) => query.bind(b),
            SqlValue::Timestamp(t) => query.bind(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        };
    }
    query
}

fn decode_rows(rows: &[AnyRow]) -> Result<Rows> {
    let columns = rows
        .first()
        .map(|r| r.columns().iter().map(|c| String::from(c.name())).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode(row, i)).collect())
        .collect::<Result<Vec<Vec<SqlValue>>>>()?;
    Ok(Rows::new(columns, rows))
}

fn decode(row: &AnyRow, i: usize) -> Result<SqlValue> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Int));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Float));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bool));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Text));
    }
    row.try_get::<Option<Vec<u8>>, _>(i)
        .map(|v| v.map_or(SqlValue::Null, SqlValue::Blob))
        .map_err(|e| Error::Decode(format!("column {i}: {e}")))
}

/// Masks the password of a URL or DSN for logging.
fn redact(dsn: &str) -> String {
    match (dsn.find("://"), dsn.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &dsn[scheme + 3..at];
            creds.find(':').map_or_else(
                || String::from(dsn),
                |colon| format!("{}:***{}", &dsn[..scheme + 3 + colon], &dsn[at..]),
            )
        }
        (None, Some(at)) => dsn[..at].find(':').map_or_else(
            || String::from(dsn),
            |colon| format!("{}:***{}", &dsn[..colon], &dsn[at..]),
        ),
        _ => String::from(dsn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> SqlxDataSource {
        let ds = SqlxDataSource::connect_lazy("sqlite::memory:", 1).unwrap();
        ds.exec(
            &Context::new(),
            &Query::new(
                String::from(
                    "CREATE TABLE `user` (`id` INTEGER PRIMARY KEY, `first_name` TEXT, `score` REAL);",
                ),
                vec![],
            ),
        )
        .await
        .unwrap();
        ds
    }

    #[tokio::test]
    async fn test_exec_and_query_round_trip() {
        let ds = memory().await;
        let ctx = Context::new();
        let res = ds
            .exec(
                &ctx,
                &Query::new(
                    String::from("INSERT INTO `user`(`id`,`first_name`,`score`) VALUES(?,?,?),(?,?,?);"),
                    vec![
                        SqlValue::Int(1),
                        SqlValue::Text(String::from("Tom")),
                        SqlValue::Float(1.5),
                        SqlValue::Int(2),
                        SqlValue::Null,
                        SqlValue::Float(2.0),
                    ],
                ),
            )
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 2);

        let rows = ds
            .query(
                &ctx,
                &Query::new(
                    String::from("SELECT `id`,`first_name` FROM `user` ORDER BY `id`;"),
                    vec![],
                ),
            )
            .await
            .unwrap();
        assert_eq!(rows.columns, vec![String::from("id"), String::from("first_name")]);
        assert_eq!(
            rows.rows,
            vec![
                vec![SqlValue::Int(1), SqlValue::Text(String::from("Tom"))],
                vec![SqlValue::Int(2), SqlValue::Null],
            ]
        );
        ds.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_driver_error_is_wrapped() {
        let ds = memory().await;
        let err = ds
            .query(
                &Context::new(),
                &Query::new(String::from("SELECT * FROM `missing`;"), vec![]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("mysql://root:secret@db:3306/app"),
            "mysql://root:***@db:3306/app"
        );
        assert_eq!(
            redact("root:secret@tcp(db:3306)/app"),
            "root:***@tcp(db:3306)/app"
        );
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }
}
