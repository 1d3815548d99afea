//! INSERT builder.

use std::marker::PhantomData;
use std::sync::Arc;

use super::Core;
use super::writer::Writer;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::meta::{ColumnMeta, TableMeta};
use crate::query::Query;
use crate::sharding::Destination;

/// Builds `INSERT INTO t(c, ...) VALUES(?, ...), ...;` from entities.
///
/// Without explicit [`columns`](Self::columns) every mapped column is
/// inserted, minus primary keys when [`ignore_pk`](Self::ignore_pk) is set.
pub struct Inserter<'a, T> {
    core: Core,
    values: Vec<&'a T>,
    columns: Vec<String>,
    ignore_pk: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Inserter<'a, T> {
    /// Creates an INSERT into `T`'s table.
    #[must_use]
    pub fn new(core: &Core) -> Self {
        Self {
            core: core.clone(),
            values: vec![],
            columns: vec![],
            ignore_pk: false,
            _entity: PhantomData,
        }
    }

    /// Adds rows.
    #[must_use]
    pub fn values(mut self, values: &'a [T]) -> Self {
        self.values.extend(values.iter());
        self
    }

    /// Restricts the inserted columns to these fields.
    #[must_use]
    pub fn columns(mut self, fields: &[&str]) -> Self {
        self.columns = fields.iter().map(|s| String::from(*s)).collect();
        self
    }

    /// Leaves primary key columns out when inserting every column.
    #[must_use]
    pub fn ignore_pk(mut self) -> Self {
        self.ignore_pk = true;
        self
    }

    /// Returns the builder settings.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Returns the rows to insert.
    #[must_use]
    pub fn rows(&self) -> &[&'a T] {
        &self.values
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// - [`Error::InsertZeroRows`] without rows
    /// - [`Error::InvalidField`] for unknown explicit columns
    pub fn build(&self) -> Result<Query> {
        let meta = self.core.registry().get::<T>()?;
        self.render(&meta, &self.values, None)
    }

    /// Resolves the inserted columns.
    pub(crate) fn insert_columns(&self, meta: &TableMeta) -> Result<Vec<Arc<ColumnMeta>>> {
        if self.columns.is_empty() {
            return Ok(meta
                .columns
                .iter()
                .filter(|c| !(self.ignore_pk && c.is_primary_key))
                .cloned()
                .collect());
        }
        self.columns
            .iter()
            .map(|f| {
                meta.field(f)
                    .cloned()
                    .ok_or_else(|| Error::InvalidField(f.clone()))
            })
            .collect()
    }

    pub(crate) fn render(
        &self,
        meta: &TableMeta,
        rows: &[&T],
        target: Option<&Destination>,
    ) -> Result<Query> {
        if rows.is_empty() {
            return Err(Error::InsertZeroRows);
        }
        let columns = self.insert_columns(meta)?;
        let valuer = self.core.valuer();
        let policy = self.core.null_policy();

        let mut w = Writer::new(self.core.dialect(), meta);
        w.write("INSERT INTO ");
        w.table(target);
        w.write("(");
        for (i, c) in columns.iter().enumerate() {
            if i > 0 {
                w.write(",");
            }
            w.quote(&c.column_name);
        }
        w.write(") VALUES");
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                w.write(",");
            }
            w.write("(");
            for (j, c) in columns.iter().enumerate() {
                if j > 0 {
                    w.write(",");
                }
                let field = valuer.field(meta, *row, &c.field_name)?;
                w.param(policy.bind(field));
            }
            w.write(")");
        }
        Ok(w.finish())
    }
}
