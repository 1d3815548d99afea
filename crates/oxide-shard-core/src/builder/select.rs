//! SELECT builder.

use std::marker::PhantomData;
use std::sync::Arc;

use super::writer::Writer;
use super::{Core, OrderBy, count_arg};
use crate::entity::Entity;
use crate::error::Result;
use crate::expr::{Aggregate, Column, Columns, Predicate, RawExpr};
use crate::meta::{MetaRegistry, TableMeta};
use crate::query::Query;
use crate::sharding::Destination;

/// An item of the projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    /// A single column, optionally aliased.
    Column(Column),
    /// Several columns.
    Columns(Columns),
    /// An aggregate, optionally aliased.
    Aggregate(Aggregate),
    /// A raw fragment.
    Raw(RawExpr),
}

impl From<Column> for Selectable {
    fn from(c: Column) -> Self {
        Self::Column(c)
    }
}

impl From<Columns> for Selectable {
    fn from(c: Columns) -> Self {
        Self::Columns(c)
    }
}

impl From<Aggregate> for Selectable {
    fn from(a: Aggregate) -> Self {
        Self::Aggregate(a)
    }
}

impl From<RawExpr> for Selectable {
    fn from(r: RawExpr) -> Self {
        Self::Raw(r)
    }
}

/// Builds `SELECT ... FROM ... [WHERE] [GROUP BY] [HAVING] [ORDER BY]
/// [LIMIT] [OFFSET];`.
///
/// Pagination renders as `LIMIT ? OFFSET ?` rather than `OFFSET ? LIMIT ?`;
/// the limit argument binds first.
///
/// `T` is the scan destination. The table is `T`'s unless
/// [`from_entity`](Self::from_entity) names another entity, which lets a
/// scalar such as `i64` receive `COUNT(*)`.
pub struct Selector<T> {
    core: Core,
    meta_of: fn(&MetaRegistry) -> Result<Arc<TableMeta>>,
    columns: Vec<Selectable>,
    where_: Vec<Predicate>,
    group_by: Vec<String>,
    having: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    _dest: PhantomData<fn() -> T>,
}

impl<T: Entity> Selector<T> {
    /// Creates a SELECT over `T`'s table.
    #[must_use]
    pub fn new(core: &Core) -> Self {
        Self {
            core: core.clone(),
            meta_of: MetaRegistry::get::<T>,
            columns: vec![],
            where_: vec![],
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            _dest: PhantomData,
        }
    }

    /// Reads from `E`'s table instead of `T`'s.
    #[must_use]
    pub fn from_entity<E: Entity>(mut self) -> Self {
        self.meta_of = MetaRegistry::get::<E>;
        self
    }

    /// Adds a projection item. No item selects every column.
    #[must_use]
    pub fn select<S: Into<Selectable>>(mut self, item: S) -> Self {
        self.columns.push(item.into());
        self
    }

    /// Adds WHERE predicates, combined with AND.
    #[must_use]
    pub fn where_<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.where_.extend(predicates);
        self
    }

    /// Adds GROUP BY fields.
    #[must_use]
    pub fn group_by(mut self, fields: &[&str]) -> Self {
        self.group_by.extend(fields.iter().map(|s| String::from(*s)));
        self
    }

    /// Adds HAVING predicates, combined with AND.
    #[must_use]
    pub fn having<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.having.extend(predicates);
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

    /// Sets OFFSET.
    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
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

    /// Returns the meta of the table read from.
    ///
    /// # Errors
    ///
    /// Registration errors of the source entity.
    pub fn table_meta(&self) -> Result<Arc<TableMeta>> {
        (self.meta_of)(self.core.registry())
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Registration errors, or [`Error::InvalidColumn`](crate::Error::InvalidColumn)
    /// for unknown fields.
    pub fn build(&self) -> Result<Query> {
        let meta = self.table_meta()?;
        self.render(&meta, None)
    }

    pub(crate) fn render(&self, meta: &TableMeta, target: Option<&Destination>) -> Result<Query> {
        let mut w = Writer::new(self.core.dialect(), meta);
        w.write("SELECT ");
        if self.columns.is_empty() {
            for (i, c) in meta.columns.iter().enumerate() {
                if i > 0 {
                    w.write(",");
                }
                w.quote(&c.column_name);
            }
        } else {
            for (i, item) in self.columns.iter().enumerate() {
                if i > 0 {
                    w.write(",");
                }
                match item {
                    Selectable::Column(c) => w.column(c, true)?,
                    Selectable::Columns(cs) => {
                        for (j, field) in cs.0.iter().enumerate() {
                            if j > 0 {
                                w.write(",");
                            }
                            w.column_of(field)?;
                        }
                    }
                    Selectable::Aggregate(a) => w.aggregate(a, true)?,
                    Selectable::Raw(r) => w.raw(r),
                }
            }
        }
        w.write(" FROM ");
        w.table(target);
        w.clause("WHERE", &self.where_)?;
        if !self.group_by.is_empty() {
            w.write(" GROUP BY ");
            for (i, field) in self.group_by.iter().enumerate() {
                if i > 0 {
                    w.write(",");
                }
                w.column_of(field)?;
            }
        }
        w.clause("HAVING", &self.having)?;
        w.order_by(&self.order_by)?;
        if let Some(n) = self.limit {
            w.write(" LIMIT ");
            w.param(count_arg(n));
        }
        if let Some(n) = self.offset {
            w.write(" OFFSET ");
            w.param(count_arg(n));
        }
        Ok(w.finish())
    }
}
