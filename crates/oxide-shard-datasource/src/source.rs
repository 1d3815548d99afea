//! The [`DataSource`] trait and context-bound execution.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows};

/// Something that can run rendered statements.
///
/// Routing implementations dispatch on `query.datasource` and
/// `query.database`; leaf implementations ignore both.
#[async_trait]
pub trait DataSource: fmt::Debug + Send + Sync {
    /// Runs a statement returning rows.
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows>;

    /// Runs a statement without result rows.
    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult>;

    /// Releases every underlying connection.
    async fn close(&self) -> Result<()>;
}

/// Drives `fut` until it completes, the context is cancelled or its deadline
/// elapses.
///
/// # Errors
///
/// [`Error::Cancelled`], [`Error::Timeout`], or the error of `fut`.
pub async fn run<T, F>(ctx: &Context, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    ctx.check()?;
    let token = ctx.cancellation_token();
    match ctx.deadline() {
        Some(deadline) => {
            tokio::select! {
                res = fut => res,
                () = token.cancelled() => Err(Error::Cancelled),
                () = tokio::time::sleep_until(deadline.into()) => Err(Error::Timeout),
            }
        }
        None => {
            tokio::select! {
                res = fut => res,
                () = token.cancelled() => Err(Error::Cancelled),
            }
        }
    }
}
