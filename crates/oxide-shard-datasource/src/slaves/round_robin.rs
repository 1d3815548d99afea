use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use oxide_shard_core::{Context, Error, Result};

use super::{Slave, Slaves, close_all};

/// A fixed replica list served in turn.
#[derive(Debug, Default)]
pub struct RoundRobin {
    slaves: Vec<Slave>,
    cnt: AtomicUsize,
}

impl RoundRobin {
    /// Creates a selector over `slaves`.
    #[must_use]
    pub fn new(slaves: Vec<Slave>) -> Self {
        Self {
            slaves,
            cnt: AtomicUsize::new(0),
        }
    }

    /// Returns the number of replicas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    /// Returns `true` without replicas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }
}

#[async_trait]
impl Slaves for RoundRobin {
    fn next(&self, _ctx: &Context) -> Result<Slave> {
        if self.slaves.is_empty() {
            return Err(Error::SlaveNotFound);
        }
        let n = self.cnt.fetch_add(1, Ordering::Relaxed);
        Ok(self.slaves[n % self.slaves.len()].clone())
    }

    async fn close(&self) -> Result<()> {
        close_all(&self.slaves).await
    }
}
