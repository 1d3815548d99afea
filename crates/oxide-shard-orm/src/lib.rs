//! # oxide-shard-orm
//!
//! Runs oxide-shard builders against a data source.
//!
//! This crate provides:
//! - [`DB`], a data source plus dialect, accessor, null policy and registry
//! - [`Exec`] for INSERT, UPDATE and DELETE builders
//! - [`Fetch`] for SELECT builders, scanning rows into entities or scalars
//! - [`ShardingResult`], the per-destination outcome of a sharded write
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxide_shard_core::expr::col;
//! use oxide_shard_core::{Context, ExecResult};
//! use oxide_shard_datasource::MockDataSource;
//! use oxide_shard_orm::{DB, Entity, Exec};
//!
//! #[derive(Debug, Default, Entity)]
//! #[table(name = "user")]
//! struct User {
//!     #[column(primary_key)]
//!     id: i64,
//!     first_name: String,
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = Arc::new(MockDataSource::new("main").with_exec_result(ExecResult {
//!     rows_affected: 1,
//!     last_insert_id: None,
//! }));
//! let db = DB::new(source.clone());
//!
//! let res = db
//!     .delete::<User>()
//!     .where_([col("id").eq(7)])
//!     .exec(&Context::new(), &db)
//!     .await
//!     .unwrap();
//! assert_eq!(res.rows_affected, 1);
//! assert_eq!(source.queries()[0].sql, "DELETE FROM `user` WHERE `id`=?;");
//! # }
//! ```
//!
//! ## Sharded entities
//!
//! Registering an entity with a sharding algorithm switches every executor
//! to the sharded path: the WHERE clause is routed, one statement is
//! rendered per destination, and the statements run in parallel on the
//! data source addressed by each destination.

mod db;
mod executor;
mod sharding;

pub use db::DB;
pub use executor::{Exec, Fetch, Statement};
pub use oxide_shard_derive::Entity;
pub use sharding::ShardingResult;
