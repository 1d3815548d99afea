#![allow(dead_code)]

use std::sync::Arc;

use oxide_shard_core::sharding::{Hash, Pattern};
use oxide_shard_core::{ExecResult, MetaRegistry, Rows, SqlValue, TableMetaOption};
use oxide_shard_datasource::{MockDataSource, ShardingDataSource};
use oxide_shard_orm::{DB, Entity};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[table(name = "user")]
pub struct User {
    #[column(primary_key, auto_increment)]
    pub id: i64,
    pub first_name: String,
    pub age: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[table(name = "order")]
pub struct Order {
    #[column(primary_key)]
    pub order_id: i64,
    pub user_id: i64,
    pub content: String,
}

pub fn order(order_id: i64, user_id: i64) -> Order {
    Order {
        order_id,
        user_id,
        content: format!("order {order_id}"),
    }
}

pub fn order_rows(orders: &[Order]) -> Rows {
    Rows::new(
        vec![
            String::from("order_id"),
            String::from("user_id"),
            String::from("content"),
        ],
        orders
            .iter()
            .map(|o| {
                vec![
                    SqlValue::Int(o.order_id),
                    SqlValue::Int(o.user_id),
                    SqlValue::Text(o.content.clone()),
                ]
            })
            .collect(),
    )
}

pub fn written(rows_affected: u64, last_insert_id: Option<i64>) -> ExecResult {
    ExecResult {
        rows_affected,
        last_insert_id,
    }
}

/// A single mocked database with a private registry.
pub fn plain(source: MockDataSource) -> (DB, Arc<MockDataSource>) {
    let source = Arc::new(source);
    let db = DB::new(source.clone()).registry(Arc::new(MetaRegistry::new()));
    (db, source)
}

/// [`Order`] sharded by `user_id` over datasources `0` and `1`,
/// `order_db_{uid%2}` and `order_tab_{uid%3}`.
pub fn sharded(ds0: MockDataSource, ds1: MockDataSource) -> (DB, [Arc<MockDataSource>; 2]) {
    let registry = Arc::new(MetaRegistry::new());
    registry
        .register::<Order>(vec![TableMetaOption::sharding_algorithm(Hash::new(
            "user_id",
            Pattern::modulo("{}", 2),
            Pattern::modulo("order_db_{}", 2),
            Pattern::modulo("order_tab_{}", 3),
        ))])
        .unwrap_or_else(|e| panic!("register order: {e}"));

    let sources = [Arc::new(ds0), Arc::new(ds1)];
    let sharding = ShardingDataSource::default()
        .with_source("0", sources[0].clone())
        .with_source("1", sources[1].clone());
    (DB::new(Arc::new(sharding)).registry(registry), sources)
}
