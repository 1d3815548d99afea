//! Shared fixtures for datasource integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use oxide_shard_core::{Query, Rows, SqlValue};
use oxide_shard_datasource::{
    Cluster, MasterSlaves, MockDataSource, RoundRobin, ShardingDataSource, Slave,
};

/// Handles of one mocked database: its master and replicas.
pub struct MockDb {
    pub master: Arc<MockDataSource>,
    pub slaves: Vec<Arc<MockDataSource>>,
}

impl MockDb {
    pub fn new(name: &str, replicas: usize) -> Self {
        let rows = Rows::new(
            vec![String::from("served_by")],
            vec![vec![SqlValue::Text(format!("{name}/master"))]],
        );
        let master = Arc::new(MockDataSource::new(&format!("{name}/master")).with_rows(rows));
        let slaves = (0..replicas)
            .map(|i| {
                let slave = format!("{name}/slave_{i}");
                let rows = Rows::new(
                    vec![String::from("served_by")],
                    vec![vec![SqlValue::Text(slave.clone())]],
                );
                Arc::new(MockDataSource::new(&slave).with_rows(rows))
            })
            .collect();
        Self { master, slaves }
    }

    pub fn master_slaves(&self) -> MasterSlaves {
        let ms = MasterSlaves::new(self.master.clone());
        if self.slaves.is_empty() {
            return ms;
        }
        let slaves = self
            .slaves
            .iter()
            .map(|s| Slave::new(s.name(), s.clone()))
            .collect();
        ms.with_slaves(Arc::new(RoundRobin::new(slaves)))
    }
}

/// Two datasources `0` and `1`, each holding `order_db_{n}` with one replica.
pub fn topology() -> (ShardingDataSource, Vec<MockDb>) {
    let mut dbs = Vec::new();
    let mut sharding = ShardingDataSource::default();
    for ds in 0..2 {
        let db = MockDb::new(&format!("{ds}/order_db_{ds}"), 1);
        let cluster = Cluster::new();
        cluster
            .set(&format!("order_db_{ds}"), db.master_slaves())
            .unwrap();
        sharding = sharding.with_source(&ds.to_string(), Arc::new(cluster));
        dbs.push(db);
    }
    (sharding, dbs)
}

pub fn select(ds: &str, db: &str) -> Query {
    Query::new(String::from("SELECT `served_by` FROM `t`;"), vec![]).with_target(ds, db)
}

pub fn delete(ds: &str, db: &str) -> Query {
    Query::new(String::from("DELETE FROM `t` WHERE `id`=?;"), vec![SqlValue::Int(1)])
        .with_target(ds, db)
}

pub fn served_by(rows: &Rows) -> &SqlValue {
    &rows.rows[0][0]
}
