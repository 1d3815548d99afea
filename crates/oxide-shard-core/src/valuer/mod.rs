//! Reading entity fields and writing result rows into entities.
//!
//! Two interchangeable strategies resolve a column to a field: by name
//! ([`ReflectValuer`]) or by the column's index path ([`IndexedValuer`]).
//! [`PrimitiveValuer`] wraps either one to also scan into scalars and
//! self-decoding types.

mod indexed;
mod primitive;
mod reflect;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use indexed::IndexedValuer;
pub use primitive::PrimitiveValuer;
pub use reflect::ReflectValuer;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::meta::{ColumnMeta, TableMeta};
use crate::value::{FieldValue, SqlValue};

/// Field access strategy.
pub trait Valuer: Send + Sync {
    /// Reads the field `name` of `entity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidField`] if `name` is not a mapped field.
    fn field(&self, meta: &TableMeta, entity: &dyn Entity, name: &str) -> Result<FieldValue>;

    /// Writes one result row into `entity`.
    ///
    /// # Errors
    ///
    /// - [`Error::TooManyColumns`] if the row is wider than the table
    /// - [`Error::Decode`] if the row has more or fewer values than columns
    /// - [`Error::InvalidColumn`] for unknown column names
    /// - decode errors of the destination field, after which `entity` may
    ///   hold the fields written so far
    fn set_columns(
        &self,
        meta: &TableMeta,
        entity: &mut dyn Entity,
        columns: &[String],
        values: Vec<SqlValue>,
    ) -> Result<()>;
}

/// Selects the field access strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    /// Index-path addressing.
    #[default]
    Indexed,
    /// Name-based lookup.
    Reflect,
}

impl AccessorKind {
    /// Returns the strategy, wrapped to support scalar destinations.
    #[must_use]
    pub fn valuer(self) -> Arc<dyn Valuer> {
        match self {
            Self::Indexed => Arc::new(PrimitiveValuer::new(IndexedValuer)),
            Self::Reflect => Arc::new(PrimitiveValuer::new(ReflectValuer)),
        }
    }
}

/// Resolves every returned column before anything is written.
fn resolve_columns<'m>(
    meta: &'m TableMeta,
    columns: &[String],
    values: &[SqlValue],
) -> Result<Vec<&'m ColumnMeta>> {
    if columns.len() > meta.columns.len() {
        return Err(Error::TooManyColumns);
    }
    if values.len() != columns.len() {
        return Err(Error::Decode(format!(
            "row has {} values for {} columns",
            values.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .map(|name| {
            meta.column(name)
                .map(AsRef::as_ref)
                .ok_or_else(|| Error::InvalidColumn(name.clone()))
        })
        .collect()
}

fn lookup_field<'m>(meta: &'m TableMeta, name: &str) -> Result<&'m ColumnMeta> {
    meta.field(name)
        .map(AsRef::as_ref)
        .ok_or_else(|| Error::InvalidField(String::from(name)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::meta::{MetaRegistry, TableMetaOption};
    use oxide_shard_derive::Entity;

    #[derive(Debug, Default, Clone, PartialEq, Entity)]
    pub(crate) struct Base {
        #[column(primary_key)]
        pub id: i64,
        pub ctime: i64,
    }

    #[derive(Debug, Default, Clone, PartialEq, Entity)]
    pub(crate) struct Profile {
        #[column(embed)]
        pub base: Base,
        pub first_name: String,
        pub age: Option<i32>,
        #[column(-)]
        pub cache: Vec<String>,
        pub score: f64,
    }

    pub(crate) fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| String::from(*s)).collect()
    }

    /// Behaviour every strategy must share.
    pub(crate) fn check_valuer(valuer: &dyn Valuer) {
        let registry = MetaRegistry::new();
        let meta = registry.get::<Profile>().unwrap();

        let mut p = Profile::default();
        valuer
            .set_columns(
                &meta,
                &mut p,
                &columns(&["id", "first_name", "age", "ctime"]),
                vec![
                    SqlValue::Int(3),
                    SqlValue::Text(String::from("Tom")),
                    SqlValue::Null,
                    SqlValue::Text(String::from("1700000000")),
                ],
            )
            .unwrap();
        assert_eq!(p.base.id, 3);
        assert_eq!(p.base.ctime, 1_700_000_000);
        assert_eq!(p.first_name, "Tom");
        assert_eq!(p.age, None);

        assert_eq!(
            valuer.field(&meta, &p, "first_name").unwrap().value,
            SqlValue::Text(String::from("Tom"))
        );
        assert_eq!(valuer.field(&meta, &p, "id").unwrap().value, SqlValue::Int(3));
        let age = valuer.field(&meta, &p, "age").unwrap();
        assert!(age.is_nil());
        assert!(age.is_zero);

        assert!(matches!(
            valuer.field(&meta, &p, "cache"),
            Err(Error::InvalidField(f)) if f == "cache"
        ));
        assert!(matches!(
            valuer.set_columns(&meta, &mut p, &columns(&["nope"]), vec![SqlValue::Int(1)]),
            Err(Error::InvalidColumn(c)) if c == "nope"
        ));
        let wide = columns(&["id", "ctime", "first_name", "age", "score", "extra"]);
        assert!(matches!(
            valuer.set_columns(&meta, &mut p, &wide, vec![SqlValue::Null; 6]),
            Err(Error::TooManyColumns)
        ));
    }

    #[test]
    fn test_unknown_column_writes_nothing() {
        let registry = MetaRegistry::new();
        let meta = registry.get::<Profile>().unwrap();
        let mut p = Profile::default();
        let err = IndexedValuer
            .set_columns(
                &meta,
                &mut p,
                &columns(&["first_name", "nope"]),
                vec![SqlValue::Text(String::from("Tom")), SqlValue::Int(1)],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidColumn(_)));
        assert_eq!(p.first_name, "");
    }

    #[test]
    fn test_row_width_must_match_columns() {
        let registry = MetaRegistry::new();
        let meta = registry.get::<Profile>().unwrap();
        for kind in [AccessorKind::Indexed, AccessorKind::Reflect] {
            let mut p = Profile::default();
            let err = kind
                .valuer()
                .set_columns(
                    &meta,
                    &mut p,
                    &columns(&["first_name", "score"]),
                    vec![SqlValue::Text(String::from("Tom"))],
                )
                .unwrap_err();
            assert_eq!(err.to_string(), "decode error: row has 1 values for 2 columns");
            assert_eq!(p.first_name, "");

            let err = kind
                .valuer()
                .set_columns(
                    &meta,
                    &mut p,
                    &columns(&["first_name"]),
                    vec![SqlValue::Text(String::from("Tom")), SqlValue::Int(1)],
                )
                .unwrap_err();
            assert!(matches!(err, Error::Decode(_)));
            assert_eq!(p.first_name, "");
        }
    }

    #[test]
    fn test_ignored_field_after_option() {
        let registry = MetaRegistry::new();
        let meta = registry
            .register::<Profile>(vec![TableMetaOption::ignore_fields(&["score"])])
            .unwrap();
        let p = Profile::default();
        for kind in [AccessorKind::Indexed, AccessorKind::Reflect] {
            assert!(matches!(
                kind.valuer().field(&meta, &p, "score"),
                Err(Error::InvalidField(_))
            ));
        }
    }
}
