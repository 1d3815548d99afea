//! Topology configuration: datasources, their databases and the sharding
//! algorithm, loaded from JSON.
//!
//! ```json
//! {
//!   "max_connections": 8,
//!   "datasources": {
//!     "0": {
//!       "databases": {
//!         "order_db_0": {
//!           "driver": "mysql",
//!           "master": "mysql://root:pw@10.0.0.1:3306/order_db_0",
//!           "slaves": ["mysql://root:pw@10.0.0.2:3306/order_db_0"]
//!         }
//!       }
//!     }
//!   },
//!   "sharding": {
//!     "sharding_key": "user_id",
//!     "datasource": { "modulo": { "template": "{}", "base": 2 } },
//!     "database": { "modulo": { "template": "order_db_{}", "base": 2 } },
//!     "table": { "modulo": { "template": "order_tab_{}", "base": 3 } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oxide_shard_core::dialect::dialect_for_driver;
use oxide_shard_core::sharding::{Hash, ShardingAlgorithm};
use oxide_shard_core::{Context, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::Cluster;
use crate::dsn::Dsn;
use crate::master_slaves::MasterSlaves;
use crate::sharding::ShardingDataSource;
use crate::slaves::{DnsSlaves, Opener, RoundRobin, Slave, TokioResolver};
use crate::source::DataSource;
use crate::sqlx_source::SqlxDataSource;

fn default_max_connections() -> u32 {
    10
}

fn default_refresh_secs() -> u64 {
    30
}

/// The whole topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Pool size of every handle.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Datasource name to its databases.
    pub datasources: BTreeMap<String, DataSourceConfig>,
    /// Hash sharding of the routed entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharding: Option<Hash>,
}

/// One server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Database name to its handles.
    pub databases: BTreeMap<String, DatabaseConfig>,
}

/// One database: a master plus replicas, listed or discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Driver name: `mysql`, `sqlite3` or `postgres`.
    pub driver: String,
    /// Master URL.
    pub master: String,
    /// Replica URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slaves: Vec<String>,
    /// DSN whose host is resolved to find replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_slaves: Option<String>,
    /// Replica discovery interval.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl TopologyConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Checks drivers, URLs and that every destination of the sharding
    /// algorithm is configured.
    ///
    /// # Errors
    ///
    /// [`Error::Config`], [`Error::UnsupportedDriver`], [`Error::InvalidDsn`]
    /// or [`Error::MissingShardingKey`].
    pub fn validate(&self) -> Result<()> {
        if self.datasources.is_empty() {
            return Err(Error::Config(String::from("no datasource configured")));
        }
        if self.max_connections == 0 {
            return Err(Error::Config(String::from("max_connections must be positive")));
        }
        for (ds, cfg) in &self.datasources {
            for (db, cfg) in &cfg.databases {
                dialect_for_driver(&cfg.driver)?;
                if cfg.master.is_empty() {
                    return Err(Error::Config(format!("{ds}/{db}: master is empty")));
                }
                if let Some(dsn) = &cfg.dns_slaves {
                    if !cfg.slaves.is_empty() {
                        return Err(Error::Config(format!(
                            "{ds}/{db}: slaves and dns_slaves are exclusive"
                        )));
                    }
                    Dsn::parse(dsn)?;
                }
            }
        }
        if let Some(hash) = &self.sharding {
            hash.validate()?;
            for dst in hash.broadcast(&Context::new()) {
                let known = self
                    .datasources
                    .get(&dst.datasource)
                    .is_some_and(|ds| ds.databases.contains_key(&dst.database));
                if !known {
                    return Err(Error::Config(format!(
                        "destination {dst} has no configured database"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Opens every handle, lazily, and assembles the routing tree.
    ///
    /// # Errors
    ///
    /// Validation errors, invalid URLs and the first replica discovery.
    pub async fn build(&self) -> Result<ShardingDataSource> {
        self.validate()?;
        let mut sources: BTreeMap<String, Arc<dyn DataSource>> = BTreeMap::new();
        for (ds, cfg) in &self.datasources {
            let cluster = Cluster::new();
            for (db, cfg) in &cfg.databases {
                cluster.set(db, self.open_database(cfg).await?)?;
            }
            sources.insert(ds.clone(), Arc::new(cluster));
        }
        info!(datasources = sources.len(), "topology built");
        Ok(ShardingDataSource::new(sources))
    }

    async fn open_database(&self, cfg: &DatabaseConfig) -> Result<MasterSlaves> {
        let max = self.max_connections;
        let master = SqlxDataSource::connect_lazy(&cfg.master, max)?;
        let mut ms = MasterSlaves::new(Arc::new(master));
        if let Some(dsn) = &cfg.dns_slaves {
            let opener: Opener = Arc::new(move |spliced: &str| {
                let url = Dsn::parse(spliced)?.to_url();
                Ok(Arc::new(SqlxDataSource::connect_lazy(&url, max)?) as Arc<dyn DataSource>)
            });
            let slaves = DnsSlaves::start(
                dsn,
                Duration::from_secs(cfg.refresh_secs.max(1)),
                Arc::new(TokioResolver),
                opener,
            )
            .await?;
            ms = ms.with_slaves(Arc::new(slaves));
        } else if !cfg.slaves.is_empty() {
            let slaves = cfg
                .slaves
                .iter()
                .map(|url| {
                    let source = SqlxDataSource::connect_lazy(url, max)?;
                    Ok(Slave::new(url, Arc::new(source)))
                })
                .collect::<Result<Vec<_>>>()?;
            ms = ms.with_slaves(Arc::new(RoundRobin::new(slaves)));
        }
        Ok(ms)
    }
}
