use super::Valuer;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::meta::TableMeta;
use crate::value::{FieldValue, SqlValue};

/// Adds scalar and self-decoding destinations to a field-wise strategy.
///
/// Row scanners receive the whole row, scalars take the single column,
/// everything else goes to the wrapped strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveValuer<V> {
    inner: V,
}

impl<V: Valuer> PrimitiveValuer<V> {
    /// Wraps a field-wise strategy.
    #[must_use]
    pub const fn new(inner: V) -> Self {
        Self { inner }
    }
}

impl<V: Valuer> Valuer for PrimitiveValuer<V> {
    fn field(&self, meta: &TableMeta, entity: &dyn Entity, name: &str) -> Result<FieldValue> {
        self.inner.field(meta, entity, name)
    }

    fn set_columns(
        &self,
        meta: &TableMeta,
        entity: &mut dyn Entity,
        columns: &[String],
        values: Vec<SqlValue>,
    ) -> Result<()> {
        if let Some(scanner) = entity.as_scanner() {
            return scanner.scan(columns, values);
        }
        if entity.is_scalar() {
            let mut values = values.into_iter();
            return match (values.next(), values.next()) {
                (Some(value), None) => entity.set_scalar(value),
                (None, _) => Err(Error::NoRows),
                (Some(_), Some(_)) => Err(Error::TooManyColumns),
            };
        }
        self.inner.set_columns(meta, entity, columns, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDescriptor, RowScanner};
    use crate::meta::MetaRegistry;
    use crate::valuer::tests::{Profile, columns};
    use crate::valuer::{IndexedValuer, ReflectValuer};
    use crate::value::TypeKind;

    #[derive(Debug, Default)]
    struct Pair {
        seen: Vec<String>,
        sum: i64,
    }

    impl RowScanner for Pair {
        fn scan(&mut self, columns: &[String], values: Vec<SqlValue>) -> Result<()> {
            self.seen = columns.to_vec();
            self.sum = values.iter().filter_map(SqlValue::as_i64).sum();
            Ok(())
        }
    }

    impl Entity for Pair {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::scalar("Pair", TypeKind::Custom("pair"))
        }

        fn as_scanner(&mut self) -> Option<&mut dyn RowScanner> {
            Some(self)
        }
    }

    #[test]
    fn test_count_into_scalar() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let valuer = PrimitiveValuer::new(IndexedValuer);
        let mut n = 0_i64;
        valuer
            .set_columns(&meta, &mut n, &columns(&["COUNT(*)"]), vec![SqlValue::Int(7)])
            .unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn test_scalar_rejects_wide_rows() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let valuer = PrimitiveValuer::new(ReflectValuer);
        let mut n = 0_i64;
        let err = valuer
            .set_columns(
                &meta,
                &mut n,
                &columns(&["a", "b"]),
                vec![SqlValue::Int(1), SqlValue::Int(2)],
            )
            .unwrap_err();
        assert!(matches!(err, Error::TooManyColumns));
    }

    #[test]
    fn test_scanner_gets_the_row() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let valuer = PrimitiveValuer::new(IndexedValuer);
        let mut pair = Pair::default();
        valuer
            .set_columns(
                &meta,
                &mut pair,
                &columns(&["x", "y"]),
                vec![SqlValue::Int(2), SqlValue::Int(3)],
            )
            .unwrap();
        assert_eq!(pair.sum, 5);
        assert_eq!(pair.seen, columns(&["x", "y"]));
    }

    #[test]
    fn test_records_fall_through() {
        let meta = MetaRegistry::new().get::<Profile>().unwrap();
        let valuer = PrimitiveValuer::new(ReflectValuer);
        let mut p = Profile::default();
        valuer
            .set_columns(
                &meta,
                &mut p,
                &columns(&["first_name"]),
                vec![SqlValue::Text(String::from("Jerry"))],
            )
            .unwrap();
        assert_eq!(p.first_name, "Jerry");
    }
}
