//! Data sources addressed by datasource name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows};
use tracing::info;

use crate::source::DataSource;

/// Dispatches on `query.datasource`.
#[derive(Debug, Default, Clone)]
pub struct ShardingDataSource {
    sources: BTreeMap<String, Arc<dyn DataSource>>,
}

impl ShardingDataSource {
    /// Creates a router over named sources.
    #[must_use]
    pub fn new(sources: BTreeMap<String, Arc<dyn DataSource>>) -> Self {
        info!(datasources = sources.len(), "sharding data source ready");
        Self { sources }
    }

    /// Adds or replaces a source.
    #[must_use]
    pub fn with_source(mut self, name: &str, source: Arc<dyn DataSource>) -> Self {
        self.sources.insert(String::from(name), source);
        self
    }

    /// Returns the datasource names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Result<&Arc<dyn DataSource>> {
        self.sources
            .get(name)
            .ok_or_else(|| Error::NotFoundTargetDataSource(String::from(name)))
    }
}

#[async_trait]
impl DataSource for ShardingDataSource {
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows> {
        self.get(&query.datasource)?.query(ctx, query).await
    }

    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        self.get(&query.datasource)?.exec(ctx, query).await
    }

    async fn close(&self) -> Result<()> {
        let results =
            futures::future::join_all(self.sources.values().map(|s| s.close())).await;
        let errors = results.into_iter().filter_map(std::result::Result::err).collect();
        Error::combine(errors).map_or(Ok(()), Err)
    }
}
