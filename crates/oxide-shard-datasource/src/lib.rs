//! # oxide-shard-datasource
//!
//! The execution side of oxide-shard: everything that turns a rendered
//! [`Query`](oxide_shard_core::Query) into rows.
//!
//! Sources nest by the address fields a sharded query carries:
//!
//! - [`ShardingDataSource`] dispatches on `query.datasource`
//! - [`Cluster`] dispatches on `query.database`
//! - [`MasterSlaves`] sends writes to the master and reads to a replica
//! - [`SqlxDataSource`] runs the statement on a `sqlx` pool
//!
//! A [`TopologyConfig`] builds the whole tree from JSON.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxide_shard_datasource::{MockDataSource, ShardingDataSource};
//!
//! let sharding = ShardingDataSource::default()
//!     .with_source("0", Arc::new(MockDataSource::new("0")))
//!     .with_source("1", Arc::new(MockDataSource::new("1")));
//! assert_eq!(sharding.names(), vec!["0", "1"]);
//! ```

mod cluster;
pub mod config;
pub mod dsn;
mod master_slaves;
mod mock;
mod sharding;
pub mod slaves;
mod source;
mod sqlx_source;

pub use cluster::Cluster;
pub use config::{DataSourceConfig, DatabaseConfig, TopologyConfig};
pub use dsn::Dsn;
pub use master_slaves::MasterSlaves;
pub use mock::MockDataSource;
pub use sharding::ShardingDataSource;
pub use slaves::{DnsSlaves, RoundRobin, Slave, Slaves};
pub use source::{DataSource, run};
pub use sqlx_source::SqlxDataSource;
