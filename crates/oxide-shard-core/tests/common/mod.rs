#![allow(dead_code)]

use std::sync::Arc;

use oxide_shard_core::builder::Core;
use oxide_shard_core::dialect::MySqlDialect;
use oxide_shard_core::sharding::{Hash, Pattern, ShardingAlgorithm};
use oxide_shard_core::valuer::AccessorKind;
use oxide_shard_core::{MetaRegistry, TableMetaOption};
use oxide_shard_derive::Entity;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct TestModel {
    #[column(primary_key, auto_increment)]
    pub id: i64,
    pub first_name: String,
    pub age: i8,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[table(name = "user")]
pub struct User {
    #[column(primary_key)]
    pub id: i64,
    pub first_name: String,
    #[column(name = "ctime")]
    pub created_at: i64,
    #[column(-)]
    pub session: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[table(name = "order")]
pub struct Order {
    #[column(primary_key)]
    pub order_id: i64,
    pub user_id: i64,
    pub content: String,
    pub account: f64,
}

/// `user_id` sharded over datasource `{uid%2}`, `order_db_{uid%2}` and
/// `order_tab_{uid%3}`.
pub fn order_hash() -> Hash {
    Hash::new(
        "user_id",
        Pattern::modulo("{}", 2),
        Pattern::modulo("order_db_{}", 2),
        Pattern::modulo("order_tab_{}", 3),
    )
}

/// A MySQL core with a private registry.
pub fn core() -> Core {
    Core::new(Arc::new(MySqlDialect)).with_registry(Arc::new(MetaRegistry::new()))
}

/// A MySQL core whose registry shards [`Order`] with `algorithm`.
pub fn sharded_core<A: ShardingAlgorithm + 'static>(algorithm: A) -> Core {
    let registry = Arc::new(MetaRegistry::new());
    registry
        .register::<Order>(vec![TableMetaOption::sharding_algorithm(algorithm)])
        .unwrap_or_else(|e| panic!("register order: {e}"));
    Core::new(Arc::new(MySqlDialect)).with_registry(registry)
}

pub fn both_accessors() -> [AccessorKind; 2] {
    [AccessorKind::Indexed, AccessorKind::Reflect]
}

pub fn order(order_id: i64, user_id: i64) -> Order {
    Order {
        order_id,
        user_id,
        content: format!("order {order_id}"),
        account: 1.5,
    }
}
