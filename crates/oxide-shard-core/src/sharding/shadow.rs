use std::sync::Arc;

use super::{Destination, Request, Response, ShardingAlgorithm};
use crate::context::Context;
use crate::error::Result;

/// Wraps an algorithm and prefixes destination names for shadow traffic.
///
/// Which dimensions get the prefix is decided per call by the context's
/// [`ShadowFlags`](crate::context::ShadowFlags).
#[derive(Debug, Clone)]
pub struct Shadow {
    inner: Arc<dyn ShardingAlgorithm>,
    prefix: String,
}

impl Shadow {
    /// Wraps `inner`, prefixing names with `prefix`.
    #[must_use]
    pub fn new(inner: Arc<dyn ShardingAlgorithm>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: String::from(prefix),
        }
    }

    fn rewrite(&self, ctx: &Context, mut dst: Destination) -> Destination {
        let flags = ctx.shadow();
        if flags.datasource {
            dst.datasource.insert_str(0, &self.prefix);
        }
        if flags.database {
            dst.database.insert_str(0, &self.prefix);
        }
        if flags.table {
            dst.table.insert_str(0, &self.prefix);
        }
        dst
    }
}

impl ShardingAlgorithm for Shadow {
    fn sharding_keys(&self) -> Vec<String> {
        self.inner.sharding_keys()
    }

    fn sharding(&self, ctx: &Context, request: &Request) -> Result<Response> {
        let resp = self.inner.sharding(ctx, request)?;
        Ok(Response {
            destinations: resp
                .destinations
                .into_iter()
                .map(|d| self.rewrite(ctx, d))
                .collect(),
        })
    }

    fn broadcast(&self, ctx: &Context) -> Vec<Destination> {
        self.inner
            .broadcast(ctx)
            .into_iter()
            .map(|d| self.rewrite(ctx, d))
            .collect()
    }
}
