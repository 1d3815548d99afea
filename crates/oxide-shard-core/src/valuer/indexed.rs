use super::{Valuer, lookup_field, resolve_columns};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::meta::TableMeta;
use crate::value::{FieldValue, SqlValue};

/// Direct addressing through each column's declared-field index path.
///
/// No name matching happens once the column is resolved; embedded fields
/// are reached by descending the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedValuer;

impl Valuer for IndexedValuer {
    fn field(&self, meta: &TableMeta, entity: &dyn Entity, name: &str) -> Result<FieldValue> {
        let column = lookup_field(meta, name)?;
        entity
            .get_indexed(&column.field_index)
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
            if entity.set_indexed(&column.field_index, value)?.is_some() {
                return Err(Error::InvalidField(column.field_name.clone()));
            }
        }
        Ok(())
    }
}
