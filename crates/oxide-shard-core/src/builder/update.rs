//! UPDATE builder.

use std::marker::PhantomData;

use super::Core;
use super::writer::Writer;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::expr::{Assignable, Expr, Predicate};
use crate::meta::TableMeta;
use crate::query::Query;
use crate::sharding::Destination;

/// Builds `UPDATE t SET a=?, ... [WHERE ...];`.
///
/// Without explicit assignments every non-key column is taken from the
/// update target, optionally skipping zero or `None` fields.
pub struct Updater<'a, T> {
    core: Core,
    entity: Option<&'a T>,
    assigns: Vec<Assignable>,
    where_: Vec<Predicate>,
    skip_zero: bool,
    skip_nil: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Updater<'a, T> {
    /// Creates an UPDATE of `T`'s table.
    #[must_use]
    pub fn new(core: &Core) -> Self {
        Self {
            core: core.clone(),
            entity: None,
            assigns: vec![],
            where_: vec![],
            skip_zero: false,
            skip_nil: false,
            _entity: PhantomData,
        }
    }

    /// Sets the entity column values are read from.
    #[must_use]
    pub fn update(mut self, entity: &'a T) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Adds an assignment.
    #[must_use]
    pub fn set<A: Into<Assignable>>(mut self, assign: A) -> Self {
        self.assigns.push(assign.into());
        self
    }

    /// Adds WHERE predicates, combined with AND.
    #[must_use]
    pub fn where_<I: IntoIterator<Item = Predicate>>(mut self, predicates: I) -> Self {
        self.where_.extend(predicates);
        self
    }

    /// Skips zero-valued fields when assigning every column.
    #[must_use]
    pub fn skip_zero_value(mut self) -> Self {
        self.skip_zero = true;
        self
    }

    /// Skips `None` fields when assigning every column.
    #[must_use]
    pub fn skip_nil_value(mut self) -> Self {
        self.skip_nil = true;
        self
    }

    /// Returns the builder settings.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Returns the explicit assignments.
    #[must_use]
    pub fn assignments(&self) -> &[Assignable] {
        &self.assigns
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
    /// - [`Error::ValueNotSet`] when nothing is left to assign
    /// - [`Error::InvalidColumn`] for unknown fields
    /// - [`Error::UnsupportedAssignment`] for aggregates or value lists
    pub fn build(&self) -> Result<Query> {
        let meta = self.core.registry().get::<T>()?;
        self.render(&meta, None, &[])
    }

    fn entity_value(&self, meta: &TableMeta, field: &str) -> Result<Expr> {
        let entity = self.entity.ok_or_else(|| {
            Error::UnsupportedAssignment(format!("`{field}` needs an update target"))
        })?;
        let value = self.core.valuer().field(meta, entity, field)?;
        Ok(Expr::Value(self.core.null_policy().bind(value)))
    }

    /// Resolves the SET list as `(field, value)` pairs. `excluded` fields are
    /// left out of the implicit every-column list.
    fn resolve(&self, meta: &TableMeta, excluded: &[String]) -> Result<Vec<(String, Expr)>> {
        let mut out = Vec::new();
        if self.assigns.is_empty() {
            let entity = self.entity.ok_or(Error::ValueNotSet)?;
            let valuer = self.core.valuer();
            for c in &meta.columns {
                if c.is_primary_key || excluded.contains(&c.field_name) {
                    continue;
                }
                let value = valuer.field(meta, entity, &c.field_name)?;
                if (self.skip_zero && value.is_zero) || (self.skip_nil && value.is_nil()) {
                    continue;
                }
                out.push((
                    c.field_name.clone(),
                    Expr::Value(self.core.null_policy().bind(value)),
                ));
            }
        }
        for assign in &self.assigns {
            match assign {
                Assignable::Column(c) => {
                    out.push((c.name.clone(), self.entity_value(meta, &c.name)?));
                }
                Assignable::Columns(cs) => {
                    for f in &cs.0 {
                        out.push((f.clone(), self.entity_value(meta, f)?));
                    }
                }
                Assignable::Assignment(a) => match &a.value {
                    Expr::Aggregate(_) | Expr::Values(_) => {
                        return Err(Error::UnsupportedAssignment(format!(
                            "`{}` cannot be assigned an aggregate or a value list",
                            a.field
                        )));
                    }
                    value => out.push((a.field.clone(), value.clone())),
                },
            }
        }
        if out.is_empty() {
            return Err(Error::ValueNotSet);
        }
        Ok(out)
    }

    pub(crate) fn render(
        &self,
        meta: &TableMeta,
        target: Option<&Destination>,
        excluded: &[String],
    ) -> Result<Query> {
        let assigns = self.resolve(meta, excluded)?;
        let mut w = Writer::new(self.core.dialect(), meta);
        w.write("UPDATE ");
        w.table(target);
        w.write(" SET ");
        for (i, (field, value)) in assigns.iter().enumerate() {
            if i > 0 {
                w.write(",");
            }
            w.column_of(field)?;
            w.write("=");
            w.operand(value)?;
        }
        w.clause("WHERE", &self.where_)?;
        Ok(w.finish())
    }
}
