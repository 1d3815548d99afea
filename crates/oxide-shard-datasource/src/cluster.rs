//! Databases of one server, addressed by name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows};
use parking_lot::Mutex;
use tracing::info;

use crate::master_slaves::MasterSlaves;
use crate::source::DataSource;

/// Dispatches on `query.database`.
#[derive(Debug, Default)]
pub struct Cluster {
    dbs: Mutex<HashMap<String, Arc<MasterSlaves>>>,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a database.
    ///
    /// # Errors
    ///
    /// [`Error::RepeatedSetDb`] when `name` is already registered.
    pub fn set(&self, name: &str, db: MasterSlaves) -> Result<()> {
        let mut dbs = self.dbs.lock();
        if dbs.contains_key(name) {
            return Err(Error::RepeatedSetDb(String::from(name)));
        }
        dbs.insert(String::from(name), Arc::new(db));
        info!(database = name, "registered database");
        Ok(())
    }

    /// Returns the registered database names, sorted.
    #[must_use]
    pub fn databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dbs.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn get(&self, name: &str) -> Result<Arc<MasterSlaves>> {
        self.dbs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFoundTargetDb(String::from(name)))
    }
}

#[async_trait]
impl DataSource for Cluster {
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows> {
        let db = self.get(&query.database)?;
        db.query(ctx, query).await
    }

    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        let db = self.get(&query.database)?;
        db.exec(ctx, query).await
    }

    async fn close(&self) -> Result<()> {
        let dbs: Vec<_> = self.dbs.lock().values().cloned().collect();
        let results = futures::future::join_all(dbs.iter().map(|db| db.close())).await;
        let errors = results.into_iter().filter_map(std::result::Result::err).collect();
        Error::combine(errors).map_or(Ok(()), Err)
    }
}
