//! Read replicas and how one is picked per query.

mod dns;
mod round_robin;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use oxide_shard_core::{Context, Result};

pub use dns::{DnsSlaves, Opener, Resolver, TokioResolver};
pub use round_robin::RoundRobin;

use crate::source::DataSource;

/// A named read replica.
#[derive(Debug, Clone)]
pub struct Slave {
    /// Replica name, its DSN or address.
    pub name: String,
    /// Handle to the replica.
    pub source: Arc<dyn DataSource>,
}

impl Slave {
    /// Creates a replica.
    #[must_use]
    pub fn new(name: &str, source: Arc<dyn DataSource>) -> Self {
        Self {
            name: String::from(name),
            source,
        }
    }
}

/// Picks the replica serving the next read.
#[async_trait]
pub trait Slaves: fmt::Debug + Send + Sync {
    /// Returns the replica for the next read.
    ///
    /// # Errors
    ///
    /// [`Error::SlaveNotFound`](oxide_shard_core::Error::SlaveNotFound) when
    /// no replica is available.
    fn next(&self, ctx: &Context) -> Result<Slave>;

    /// Stops background work and closes every replica.
    async fn close(&self) -> Result<()>;
}

/// Closes replicas, combining failures in order.
pub(crate) async fn close_all(slaves: &[Slave]) -> Result<()> {
    let results = futures::future::join_all(slaves.iter().map(|s| s.source.close())).await;
    let errors: Vec<_> = results.into_iter().filter_map(std::result::Result::err).collect();
    oxide_shard_core::Error::combine(errors).map_or(Ok(()), Err)
}
