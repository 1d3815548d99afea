//! # oxide-shard-core
//!
//! Typed SQL building over described entities, with sharding.
//!
//! This crate provides:
//! - Entity metadata derived once per type and cached in a registry
//! - SELECT, INSERT, UPDATE and DELETE builders producing parameterized SQL
//! - Sharding algorithms and a predicate router that turns a WHERE clause
//!   into the set of physical destinations it can match
//!
//! ## Building SQL
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxide_shard_core::builder::{Core, Updater};
//! use oxide_shard_core::dialect::MySqlDialect;
//! use oxide_shard_core::expr::{assign, col};
//! use oxide_shard_core::{Entity, SqlValue};
//! # use oxide_shard_core::{EntityDescriptor, TypeKind, FieldDef};
//! # struct TestModel;
//! # impl Entity for TestModel {
//! #     fn descriptor() -> EntityDescriptor {
//! #         let field = |name, kind| FieldDef {
//! #             name, column: None, kind, nullable: false,
//! #             directives: &[], offset: 0, embedded: None,
//! #         };
//! #         EntityDescriptor::record("TestModel", None, vec![field("age", TypeKind::I32)])
//! #     }
//! # }
//!
//! let core = Core::new(Arc::new(MySqlDialect));
//! let query = Updater::<TestModel>::new(&core)
//!     .set(assign("age", col("age").add(1)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query.sql, "UPDATE `test_model` SET `age`=(`age`+?);");
//! assert_eq!(query.args, vec![SqlValue::Int(1)]);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Values never reach the SQL text; they are bound as `?` arguments.
//! Identifiers come from entity metadata and are quoted by the dialect.

// Lets derive output name `::oxide_shard_core` from inside this crate.
extern crate self as oxide_shard_core;

pub mod builder;
pub mod context;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod expr;
pub mod meta;
mod pool;
pub mod query;
pub mod sharding;
pub mod value;
pub mod valuer;

pub use context::{Context, ShadowFlags};
pub use entity::{Entity, EntityDescriptor, EntityKind, FieldDef, RowScanner};
pub use error::{Error, Result};
pub use meta::{ColumnMeta, MetaRegistry, TableMeta, TableMetaOption};
pub use query::{ExecResult, Query, Rows};
pub use sharding::{Destination, ShardingAlgorithm};
pub use value::{FieldValue, SqlType, SqlValue, ToSqlValue, TypeKind};

/// Commonly used items.
pub mod prelude {
    pub use crate::builder::{
        Core, Deleter, Inserter, NullPolicy, Selector, ShardedQuery, Updater, asc, desc,
    };
    pub use crate::expr::{
        assign, avg, col, columns, count, count_all, count_distinct, max, min, not, raw, sum,
    };
    pub use crate::sharding::{Hash, Pattern, Shadow};
    pub use crate::{
        Context, Destination, Entity, Error, MetaRegistry, Query, Result, SqlValue,
        TableMetaOption,
    };
}
