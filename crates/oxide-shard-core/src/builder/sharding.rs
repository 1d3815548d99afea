//! Sharded rendering: one statement per destination.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{Deleter, Inserter, Selector, Updater};
use crate::context::Context;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::expr::Op;
use crate::meta::TableMeta;
use crate::query::Query;
use crate::sharding::router::route;
use crate::sharding::{Destination, Request, ShardingAlgorithm};

/// A statement bound to the destination it must run on.
///
/// The query's `datasource` and `database` mirror the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardedQuery {
    /// Where the statement runs.
    pub destination: Destination,
    /// The rendered statement.
    pub query: Query,
}

impl ShardedQuery {
    fn new(destination: Destination, query: Query) -> Self {
        let query = query.with_target(&destination.datasource, &destination.database);
        Self { destination, query }
    }
}

fn algorithm_of(meta: &TableMeta) -> Result<&dyn ShardingAlgorithm> {
    meta.sharding_algorithm
        .as_deref()
        .ok_or_else(|| Error::NoShardingAlgorithm(String::from(meta.type_name)))
}

fn sharding_keys(algorithm: &dyn ShardingAlgorithm) -> Result<Vec<String>> {
    let keys = algorithm.sharding_keys();
    if keys.is_empty() {
        return Err(Error::MissingShardingKey);
    }
    Ok(keys)
}

impl<T: Entity> Inserter<'_, T> {
    /// Groups rows by destination and renders one multi-row INSERT per
    /// group, in destination order.
    ///
    /// # Errors
    ///
    /// - [`Error::NoShardingAlgorithm`] for unsharded entities
    /// - [`Error::InsertShardingKeyNotFound`] when a sharding key is not inserted
    /// - [`Error::InsertFindingDst`] when a row does not map to exactly one
    ///   destination
    pub fn build_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        let meta = self.core().registry().get::<T>()?;
        let algorithm = algorithm_of(&meta)?;
        let keys = sharding_keys(algorithm)?;
        if self.rows().is_empty() {
            return Err(Error::InsertZeroRows);
        }

        let inserted = self.insert_columns(&meta)?;
        if let Some(missing) = keys
            .iter()
            .find(|k| !inserted.iter().any(|c| &c.field_name == *k))
        {
            return Err(Error::InsertShardingKeyNotFound(missing.clone()));
        }

        let valuer = self.core().valuer();
        let mut groups: BTreeMap<Destination, Vec<&T>> = BTreeMap::new();
        for row in self.rows() {
            let mut sharding_values = HashMap::with_capacity(keys.len());
            for key in &keys {
                let value = valuer.field(&meta, *row, key)?;
                sharding_values.insert(key.clone(), value.value);
            }
            let request = Request {
                op: Op::Eq,
                sharding_values,
            };
            let mut found = algorithm.sharding(ctx, &request)?.destinations;
            if found.len() != 1 {
                return Err(Error::InsertFindingDst(found.len()));
            }
            if let Some(dst) = found.pop() {
                groups.entry(dst).or_default().push(*row);
            }
        }

        debug!(table = %meta.table_name, shards = groups.len(), "sharded insert");
        groups
            .into_iter()
            .map(|(dst, rows)| {
                let query = self.render(&meta, &rows, Some(&dst))?;
                Ok(ShardedQuery::new(dst, query))
            })
            .collect()
    }
}

impl<T: Entity> Updater<'_, T> {
    /// Routes the WHERE clause and renders one UPDATE per destination.
    ///
    /// Sharding keys are left out of the implicit every-column SET list.
    ///
    /// # Errors
    ///
    /// - [`Error::NoShardingAlgorithm`] for unsharded entities
    /// - [`Error::UpdateShardingKeyUnsupported`] when an assignment writes a
    ///   sharding key
    /// - routing errors, see [`route`]
    pub fn build_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        let meta = self.core().registry().get::<T>()?;
        let algorithm = algorithm_of(&meta)?;
        let keys = sharding_keys(algorithm)?;
        for assign in self.assignments() {
            if let Some(key) = assign
                .fields()
                .into_iter()
                .find(|f| keys.iter().any(|k| k == f))
            {
                return Err(Error::UpdateShardingKeyUnsupported(String::from(key)));
            }
        }

        let destinations = route(algorithm, ctx, self.predicates())?;
        debug!(table = %meta.table_name, shards = destinations.len(), "sharded update");
        destinations
            .into_iter()
            .map(|dst| {
                let query = self.render(&meta, Some(&dst), &keys)?;
                Ok(ShardedQuery::new(dst, query))
            })
            .collect()
    }
}

impl<T: Entity> Deleter<T> {
    /// Routes the WHERE clause and renders one DELETE per destination.
    ///
    /// # Errors
    ///
    /// [`Error::NoShardingAlgorithm`] for unsharded entities, and routing
    /// errors, see [`route`].
    pub fn build_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        let meta = self.core().registry().get::<T>()?;
        let algorithm = algorithm_of(&meta)?;
        let destinations = route(algorithm, ctx, self.predicates())?;
        debug!(table = %meta.table_name, shards = destinations.len(), "sharded delete");
        destinations
            .into_iter()
            .map(|dst| {
                let query = self.render(&meta, Some(&dst))?;
                Ok(ShardedQuery::new(dst, query))
            })
            .collect()
    }
}

impl<T: Entity> Selector<T> {
    /// Routes the WHERE clause and renders one SELECT per destination.
    ///
    /// # Errors
    ///
    /// [`Error::NoShardingAlgorithm`] for unsharded entities, and routing
    /// errors, see [`route`].
    pub fn build_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        let meta = self.table_meta()?;
        let algorithm = algorithm_of(&meta)?;
        let destinations = route(algorithm, ctx, self.predicates())?;
        debug!(table = %meta.table_name, shards = destinations.len(), "sharded select");
        destinations
            .into_iter()
            .map(|dst| {
                let query = self.render(&meta, Some(&dst))?;
                Ok(ShardedQuery::new(dst, query))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::Core;
    use crate::dialect::MySqlDialect;
    use crate::expr::{assign, col};
    use crate::meta::{MetaRegistry, TableMetaOption};
    use crate::sharding::{Hash, Pattern};
    use crate::value::SqlValue;
    use oxide_shard_derive::Entity;

    #[derive(Debug, Default, Entity)]
    #[table(name = "order")]
    struct Order {
        #[column(primary_key)]
        id: i64,
        user_id: i64,
        amount: i64,
    }

    fn core() -> Core {
        let registry = Arc::new(MetaRegistry::new());
        registry
            .register::<Order>(vec![TableMetaOption::sharding_algorithm(Hash::new(
                "user_id",
                Pattern::modulo("ds_{}", 2),
                Pattern::modulo("order_db_{}", 2),
                Pattern::modulo("order_tab_{}", 3),
            ))])
            .unwrap();
        Core::new(Arc::new(MySqlDialect)).with_registry(registry)
    }

    fn order(id: i64, user_id: i64) -> Order {
        Order {
            id,
            user_id,
            amount: 10,
        }
    }

    #[test]
    fn test_insert_groups_by_destination() {
        let rows = vec![order(1, 123), order(2, 234), order(3, 129)];
        let ctx = Context::new();
        let qs = Inserter::new(&core())
            .values(&rows)
            .build_sharding(&ctx)
            .unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].destination, Destination::new("ds_0", "order_db_0", "order_tab_0"));
        assert_eq!(
            qs[0].query.sql,
            "INSERT INTO `order_db_0`.`order_tab_0`(`id`,`user_id`,`amount`) VALUES(?,?,?);"
        );
        assert_eq!(qs[0].query.datasource, "ds_0");
        assert_eq!(qs[0].query.database, "order_db_0");
        assert_eq!(qs[1].destination, Destination::new("ds_1", "order_db_1", "order_tab_0"));
        assert_eq!(
            qs[1].query.sql,
            "INSERT INTO `order_db_1`.`order_tab_0`(`id`,`user_id`,`amount`) VALUES(?,?,?),(?,?,?);"
        );
        assert_eq!(qs[1].query.args[1], SqlValue::Int(123));
        assert_eq!(qs[1].query.args[4], SqlValue::Int(129));
    }

    #[test]
    fn test_insert_without_sharding_key_column() {
        let rows = vec![order(1, 123)];
        let err = Inserter::new(&core())
            .values(&rows)
            .columns(&["id", "amount"])
            .build_sharding(&Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::InsertShardingKeyNotFound(k) if k == "user_id"));
    }

    #[test]
    fn test_unsharded_entity_is_rejected() {
        #[derive(Debug, Default, Entity)]
        struct Plain {
            id: i64,
        }
        let err = Deleter::<Plain>::new(&core())
            .build_sharding(&Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::NoShardingAlgorithm(_)));
    }

    #[test]
    fn test_select_routes_equality() {
        let qs = Selector::<Order>::new(&core())
            .where_([col("user_id").eq(123)])
            .build_sharding(&Context::new())
            .unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(
            qs[0].query.sql,
            "SELECT `id`,`user_id`,`amount` FROM `order_db_1`.`order_tab_0` WHERE `user_id`=?;"
        );
    }

    #[test]
    fn test_select_without_where_broadcasts() {
        let qs = Selector::<Order>::new(&core())
            .build_sharding(&Context::new())
            .unwrap();
        assert_eq!(qs.len(), 2 * 2 * 3);
    }

    #[test]
    fn test_update_excludes_sharding_key() {
        let o = order(1, 123);
        let qs = Updater::new(&core())
            .update(&o)
            .where_([col("user_id").eq(123)])
            .build_sharding(&Context::new())
            .unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(
            qs[0].query.sql,
            "UPDATE `order_db_1`.`order_tab_0` SET `amount`=? WHERE `user_id`=?;"
        );
    }

    #[test]
    fn test_update_of_sharding_key_is_rejected() {
        let err = Updater::<Order>::new(&core())
            .set(assign("user_id", 5))
            .where_([col("user_id").eq(123)])
            .build_sharding(&Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::UpdateShardingKeyUnsupported(k) if k == "user_id"));
    }

    #[test]
    fn test_delete_in_list() {
        let qs = Deleter::<Order>::new(&core())
            .where_([col("user_id").in_list([123, 124])])
            .build_sharding(&Context::new())
            .unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(
            qs[0].query.sql,
            "DELETE FROM `order_db_1`.`order_tab_0` WHERE `user_id` IN (?,?);"
        );
        assert_eq!(
            qs[1].query.sql,
            "DELETE FROM `order_db_0`.`order_tab_1` WHERE `user_id` IN (?,?);"
        );
    }
}
