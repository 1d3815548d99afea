//! Parallel dispatch of sharded statements.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use oxide_shard_core::builder::ShardedQuery;
use oxide_shard_core::{Context, Destination, Error, ExecResult, Query, Result};
use oxide_shard_datasource::DataSource;
use tracing::{debug, warn};

/// Per-destination outcomes of a sharded write, in dispatch order.
///
/// Failed destinations do not roll back the others.
#[derive(Debug, Default)]
pub struct ShardingResult {
    slots: Vec<(Destination, Result<ExecResult>)>,
}

impl ShardingResult {
    pub const fn new(slots: Vec<(Destination, Result<ExecResult>)>) -> Self {
        Self { slots }
    }

    /// Returns every outcome with its destination.
    #[must_use]
    pub fn slots(&self) -> &[(Destination, Result<ExecResult>)] {
        &self.slots
    }

    /// Sums the rows written by the successful destinations.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.slots
            .iter()
            .filter_map(|(_, res)| res.as_ref().ok())
            .map(|r| r.rows_affected)
            .sum()
    }

    /// Returns the id reported by the last destination.
    #[must_use]
    pub fn last_insert_id(&self) -> Option<i64> {
        match self.slots.last() {
            Some((_, Ok(res))) => res.last_insert_id,
            _ => None,
        }
    }

    /// Returns the failures, in dispatch order.
    #[must_use]
    pub fn errors(&self) -> Vec<&Error> {
        self.slots
            .iter()
            .filter_map(|(_, res)| res.as_ref().err())
            .collect()
    }

    /// Collapses the outcomes into one result.
    ///
    /// # Errors
    ///
    /// The single failure, or [`Error::Multiple`] keeping dispatch order.
    pub fn into_result(self) -> Result<ExecResult> {
        let combined = ExecResult {
            rows_affected: self.rows_affected(),
            last_insert_id: self.last_insert_id(),
        };
        let errors: Vec<Error> = self
            .slots
            .into_iter()
            .filter_map(|(_, res)| res.err())
            .collect();
        Error::combine(errors).map_or(Ok(combined), Err)
    }
}

/// Runs `call` for every query on its own task and joins positionally.
pub async fn dispatch<R, F, Fut>(
    source: &Arc<dyn DataSource>,
    ctx: &Context,
    queries: Vec<ShardedQuery>,
    call: F,
) -> Vec<(Destination, Result<R>)>
where
    R: Send + 'static,
    F: Fn(Arc<dyn DataSource>, Context, Query) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    debug!(shards = queries.len(), "dispatching sharded statements");
    let (destinations, handles): (Vec<_>, Vec<_>) = queries
        .into_iter()
        .map(|sq| {
            let task = call(Arc::clone(source), ctx.clone(), sq.query);
            (sq.destination, tokio::spawn(task))
        })
        .unzip();

    let slots: Vec<(Destination, Result<R>)> = destinations
        .into_iter()
        .zip(join_all(handles).await)
        .map(|(dst, joined)| (dst, joined.map_err(Error::database).and_then(|res| res)))
        .collect();

    let failed = slots.iter().filter(|(_, res)| res.is_err()).count();
    if failed > 0 {
        warn!(failed, shards = slots.len(), "sharded statements failed");
    }
    slots
}

/// Runs writes on every destination.
pub async fn exec_all(
    source: &Arc<dyn DataSource>,
    ctx: &Context,
    queries: Vec<ShardedQuery>,
) -> ShardingResult {
    let slots = dispatch(source, ctx, queries, |source, ctx, query| async move {
        source.exec(&ctx, &query).await
    })
    .await;
    ShardingResult::new(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(rows_affected: u64, last_insert_id: Option<i64>) -> Result<ExecResult> {
        Ok(ExecResult {
            rows_affected,
            last_insert_id,
        })
    }

    fn dst(n: u8) -> Destination {
        Destination::new(&n.to_string(), "db", "tab")
    }

    #[test]
    fn test_sums_and_last_id() {
        let res = ShardingResult::new(vec![(dst(0), ok(2, Some(4))), (dst(1), ok(3, Some(9)))]);
        assert_eq!(res.rows_affected(), 5);
        assert_eq!(res.last_insert_id(), Some(9));
        assert!(res.errors().is_empty());
        assert_eq!(
            res.into_result().unwrap(),
            ExecResult {
                rows_affected: 5,
                last_insert_id: Some(9)
            }
        );
    }

    #[test]
    fn test_errors_keep_order() {
        let res = ShardingResult::new(vec![
            (dst(0), Err(Error::Config(String::from("first")))),
            (dst(1), ok(1, None)),
            (dst(2), Err(Error::Config(String::from("second")))),
        ]);
        assert_eq!(res.rows_affected(), 1);
        assert_eq!(res.last_insert_id(), None);
        assert_eq!(res.errors().len(), 2);
        match res.into_result() {
            Err(Error::Multiple(errors)) => {
                assert_eq!(errors[0].to_string(), "configuration error: first");
                assert_eq!(errors[1].to_string(), "configuration error: second");
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }
}
