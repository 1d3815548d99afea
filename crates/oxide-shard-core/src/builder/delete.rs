//! DELETE builder.

use std::marker::PhantomData;

use super::writer::Writer;
use super::{Core, OrderBy, count_arg};
use crate::entity::Entity;
use crate::error::Result;
use crate::expr::Predicate;
use crate::meta::TableMeta;
use crate::query::Query;
use crate::sharding::Destination;

/// Builds `DELETE FROM t [WHERE ...] [ORDER BY ...] [LIMIT ?];`.
pub struct Deleter<T> {
    core: Core,
    where_: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Deleter<T> {
    /// Creates a DELETE from `T`'s table.
    #[must_use]
    pub fn new(core: &Core) -> Self {
        Self {
            core: core.clone(),
            where_: vec![],
            order_by: vec![],
            limit: None,
            _entity: PhantomData,
        }
    }

    /// Adds WHERE predicates, combined with AND.
    #[must_use]
    pub fn where_<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.where_.extend(predicates);
        self
    }

    /// Adds an ORDER BY item.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Returns the builder settings.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Returns the WHERE predicates.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.where_
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Registration errors, or [`Error::InvalidColumn`](crate::Error::InvalidColumn)
    /// for unknown fields.
    pub fn build(&self) -> Result<Query> {
        let meta = self.core.registry().get::<T>()?;
        self.render(&meta, None)
    }

    pub(crate) fn render(&self, meta: &TableMeta, target: Option<&Destination>) -> Result<Query> {
        let mut w = Writer::new(self.core.dialect(), meta);
        w.write("DELETE FROM ");
        w.table(target);
        w.clause("WHERE", &self.where_)?;
        w.order_by(&self.order_by)?;
        if let Some(n) = self.limit {
            w.write(" LIMIT ");
            w.param(count_arg(n));
        }
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::desc;
    use crate::dialect::MySqlDialect;
    use crate::expr::col;
    use crate::meta::MetaRegistry;
    use crate::value::SqlValue;
    use oxide_shard_derive::Entity;

    #[derive(Debug, Default, Entity)]
    struct TestModel {
        #[column(primary_key)]
        id: i64,
        age: i8,
    }

    fn core() -> Core {
        Core::new(Arc::new(MySqlDialect)).with_registry(Arc::new(MetaRegistry::new()))
    }

    #[test]
    fn test_delete_all() {
        let q = Deleter::<TestModel>::new(&core()).build().unwrap();
        assert_eq!(q.sql, "DELETE FROM `test_model`;");
        assert!(q.args.is_empty());
    }

    #[test]
    fn test_delete_where_order_limit() {
        let q = Deleter::<TestModel>::new(&core())
            .where_([col("age").lt(18)])
            .order_by(desc(&["id"]))
            .limit(5)
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "DELETE FROM `test_model` WHERE `age`<? ORDER BY `id` DESC LIMIT ?;"
        );
        assert_eq!(q.args, vec![SqlValue::Int(18), SqlValue::Int(5)]);
    }

    #[test]
    fn test_delete_sql_injection_prevention() {
        let malicious = "'; DROP TABLE users; --";
        let q = Deleter::<TestModel>::new(&core())
            .where_([col("id").eq(malicious)])
            .build()
            .unwrap();
        assert_eq!(q.sql, "DELETE FROM `test_model` WHERE `id`=?;");
        assert!(matches!(&q.args[0], SqlValue::Text(s) if s == malicious));
    }
}
