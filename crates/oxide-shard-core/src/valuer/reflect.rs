use super::{Valuer, lookup_field, resolve_columns};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::meta::TableMeta;
use crate::value::{FieldValue, SqlValue};

/// Name-based field access through the entity's generated
/// `get_field` / `set_field`.
///
/// Embedded records are searched after the outer fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectValuer;

impl Valuer for ReflectValuer {
    fn field(&self, meta: &TableMeta, entity: &dyn Entity, name: &str) -> Result<FieldValue> {
        let column = lookup_field(meta, name)?;
        entity
            .get_field(&column.field_name)
            .ok_or_else(|| Error::InvalidField(String::from(name)))
    }

    fn set_columns(
        &self,
        meta: &TableMeta,
        entity: &mut dyn Entity,
        columns: &[String],
        values: Vec<SqlValue>,
    ) -> Result<()> {
        let targets = resolve_columns(meta, columns, &values)?;
        for (column, value) in targets.into_iter().zip(values) {
            if entity.set_field(&column.field_name, value)?.is_some() {
                return Err(Error::InvalidField(column.field_name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuer::tests::check_valuer;

    #[test]
    fn test_reflect_valuer() {
        check_valuer(&ReflectValuer);
    }
}
