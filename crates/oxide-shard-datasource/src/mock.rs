//! An in-process [`DataSource`] that records statements and returns canned
//! results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows};
use parking_lot::Mutex;

use crate::source::{DataSource, run};

/// Records every statement it receives.
///
/// ```rust
/// use oxide_shard_core::query::{ExecResult, Rows};
/// use oxide_shard_core::SqlValue;
/// use oxide_shard_datasource::MockDataSource;
///
/// let ds = MockDataSource::new("ds_0")
///     .with_rows(Rows::new(vec![String::from("id")], vec![vec![SqlValue::Int(1)]]))
///     .with_exec_result(ExecResult { rows_affected: 2, last_insert_id: Some(9) });
/// assert!(ds.queries().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MockDataSource {
    name: String,
    rows: Rows,
    exec_result: ExecResult,
    fail: Option<String>,
    fail_close: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<Query>>,
    closed: AtomicBool,
}

impl MockDataSource {
    /// Creates a source answering empty results.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            ..Self::default()
        }
    }

    /// Answers every query with `rows`.
    #[must_use]
    pub fn with_rows(mut self, rows: Rows) -> Self {
        self.rows = rows;
        self
    }

    /// Answers every exec with `result`.
    #[must_use]
    pub fn with_exec_result(mut self, result: ExecResult) -> Self {
        self.exec_result = result;
        self
    }

    /// Fails every query and exec with a database error carrying `message`.
    #[must_use]
    pub fn failing(mut self, message: &str) -> Self {
        self.fail = Some(String::from(message));
        self
    }

    /// Fails `close`.
    #[must_use]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Waits `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the name given at creation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the statements received so far, in arrival order.
    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    /// Returns `true` once `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn answer(&self, ctx: &Context, query: &Query) -> Result<()> {
        self.queries.lock().push(query.clone());
        run(ctx, async {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.fail.as_ref().map_or(Ok(()), |message| {
                Err(Error::database(std::io::Error::other(format!(
                    "{}: {message}",
                    self.name
                ))))
            })
        })
        .await
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows> {
        self.answer(ctx, query).await?;
        Ok(self.rows.clone())
    }

    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        self.answer(ctx, query).await?;
        Ok(self.exec_result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::Config(format!("close of `{}` failed", self.name)));
        }
        Ok(())
    }
}
