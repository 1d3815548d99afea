//! A master with optional read replicas.

use std::sync::Arc;

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, ExecResult, Query, Result, Rows};
use tracing::debug;

use crate::slaves::Slaves;
use crate::source::DataSource;

/// Writes go to the master. Reads go to a replica picked by the
/// [`Slaves`] selector, unless the context asks for the master or no
/// replica is available.
#[derive(Debug, Clone)]
pub struct MasterSlaves {
    master: Arc<dyn DataSource>,
    slaves: Option<Arc<dyn Slaves>>,
}

impl MasterSlaves {
    /// Creates a master-only source.
    #[must_use]
    pub fn new(master: Arc<dyn DataSource>) -> Self {
        Self {
            master,
            slaves: None,
        }
    }

    /// Serves reads from `slaves`.
    #[must_use]
    pub fn with_slaves(mut self, slaves: Arc<dyn Slaves>) -> Self {
        self.slaves = Some(slaves);
        self
    }

    /// Returns the master handle.
    #[must_use]
    pub fn master(&self) -> &Arc<dyn DataSource> {
        &self.master
    }
}

#[async_trait]
impl DataSource for MasterSlaves {
    async fn query(&self, ctx: &Context, query: &Query) -> Result<Rows> {
        let Some(slaves) = self.slaves.as_ref().filter(|_| !ctx.is_use_master()) else {
            return self.master.query(ctx, query).await;
        };
        match slaves.next(ctx) {
            Ok(slave) => {
                debug!(slave = %slave.name, "read from slave");
                slave.source.query(ctx, query).await
            }
            Err(Error::SlaveNotFound) => {
                debug!("no slave available, reading from master");
                self.master.query(ctx, query).await
            }
            Err(err) => Err(err),
        }
    }

    async fn exec(&self, ctx: &Context, query: &Query) -> Result<ExecResult> {
        self.master.exec(ctx, query).await
    }

    async fn close(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(err) = self.master.close().await {
            errors.push(err);
        }
        if let Some(slaves) = &self.slaves {
            if let Err(err) = slaves.close().await {
                errors.push(err);
            }
        }
        Error::combine(errors).map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDataSource;
    use crate::slaves::{RoundRobin, Slave};

    fn select() -> Query {
        Query::new(String::from("SELECT 1;"), vec![])
    }

    fn setup() -> (Arc<MockDataSource>, Arc<MockDataSource>, MasterSlaves) {
        let master = Arc::new(MockDataSource::new("master"));
        let slave = Arc::new(MockDataSource::new("slave"));
        let ms = MasterSlaves::new(master.clone())
            .with_slaves(Arc::new(RoundRobin::new(vec![Slave::new("s0", slave.clone())])));
        (master, slave, ms)
    }

    #[tokio::test]
    async fn test_reads_go_to_slave() {
        let (master, slave, ms) = setup();
        ms.query(&Context::new(), &select()).await.unwrap();
        assert_eq!(slave.queries().len(), 1);
        assert!(master.queries().is_empty());
    }

    #[tokio::test]
    async fn test_use_master() {
        let (master, slave, ms) = setup();
        ms.query(&Context::new().use_master(), &select()).await.unwrap();
        assert_eq!(master.queries().len(), 1);
        assert!(slave.queries().is_empty());
    }

    #[tokio::test]
    async fn test_writes_go_to_master() {
        let (master, slave, ms) = setup();
        ms.exec(&Context::new(), &Query::new(String::from("DELETE FROM `t`;"), vec![]))
            .await
            .unwrap();
        assert_eq!(master.queries().len(), 1);
        assert!(slave.queries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_slaves_fall_back_to_master() {
        let master = Arc::new(MockDataSource::new("master"));
        let ms = MasterSlaves::new(master.clone()).with_slaves(Arc::new(RoundRobin::new(vec![])));
        ms.query(&Context::new(), &select()).await.unwrap();
        assert_eq!(master.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_close_closes_master_and_slaves() {
        let (master, slave, ms) = setup();
        ms.close().await.unwrap();
        assert!(master.is_closed());
        assert!(slave.is_closed());
    }
}
