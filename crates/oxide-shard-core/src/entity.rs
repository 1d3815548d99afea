//! The [`Entity`] trait: static description and field access of a record.
//!
//! `#[derive(Entity)]` implements this trait for structs. The descriptor is
//! raw material for the [`MetaRegistry`](crate::meta::MetaRegistry), which
//! parses directives, flattens embedded records and validates the result.
//!
//! Scalars (`i64`, `String`, ...) implement `Entity` as well so that a
//! single-column result such as `SELECT COUNT(*)` can be scanned into them.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::value::{FieldValue, SqlType, SqlValue, TypeKind};

/// Static description of one declared field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name as declared in the struct.
    pub name: &'static str,
    /// Explicit column name, if overridden.
    pub column: Option<&'static str>,
    /// Declared type.
    pub kind: TypeKind,
    /// Whether the field is an `Option`.
    pub nullable: bool,
    /// Raw directives from the field attribute, e.g. `["primary_key"]`.
    pub directives: &'static [&'static str],
    /// Byte offset of the field inside the struct.
    pub offset: usize,
    /// Descriptor of the embedded record, for fields marked `embed`.
    pub embedded: Option<fn() -> EntityDescriptor>,
}

/// Shape of an entity type.
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// A struct with named fields, in declaration order.
    Record(Vec<FieldDef>),
    /// A single value such as `i64`.
    Scalar(TypeKind),
}

/// Static description of an entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Rust type name, e.g. `TestModel`.
    pub type_name: &'static str,
    /// Table name declared with `#[table(name = "...")]`.
    pub table_name: Option<&'static str>,
    /// Record or scalar.
    pub kind: EntityKind,
}

impl EntityDescriptor {
    /// Describes a record.
    #[must_use]
    pub fn record(
        type_name: &'static str,
        table_name: Option<&'static str>,
        fields: Vec<FieldDef>,
    ) -> Self {
        Self {
            type_name,
            table_name,
            kind: EntityKind::Record(fields),
        }
    }

    /// Describes a scalar.
    #[must_use]
    pub fn scalar(type_name: &'static str, kind: TypeKind) -> Self {
        Self {
            type_name,
            table_name: None,
            kind: EntityKind::Scalar(kind),
        }
    }
}

/// A destination that decodes a whole row itself.
pub trait RowScanner {
    /// Decodes one row.
    ///
    /// # Errors
    ///
    /// Implementation-defined decode errors.
    fn scan(&mut self, columns: &[String], values: Vec<SqlValue>) -> Result<()>;
}

/// A record mapped to a table, or a scalar scan destination.
///
/// The `set_*` methods hand the value back as `Ok(Some(value))` when no field
/// matches, so that a parent record can offer it to its embedded records.
pub trait Entity: Send + Sync + 'static {
    /// Returns the static description of the type.
    fn descriptor() -> EntityDescriptor
    where
        Self: Sized;

    /// Reads a field by name.
    fn get_field(&self, _name: &str) -> Option<FieldValue> {
        None
    }

    /// Writes a field by name.
    ///
    /// # Errors
    ///
    /// Returns decode errors from [`SqlType::from_value`].
    fn set_field(&mut self, _name: &str, value: SqlValue) -> Result<Option<SqlValue>> {
        Ok(Some(value))
    }

    /// Reads a field by its index path.
    fn get_indexed(&self, _path: &[usize]) -> Option<FieldValue> {
        None
    }

    /// Writes a field by its index path.
    ///
    /// # Errors
    ///
    /// Returns decode errors from [`SqlType::from_value`].
    fn set_indexed(&mut self, _path: &[usize], value: SqlValue) -> Result<Option<SqlValue>> {
        Ok(Some(value))
    }

    /// Returns `true` for single-value destinations such as `i64`.
    fn is_scalar(&self) -> bool {
        false
    }

    /// Stores a single column value into a scalar destination.
    ///
    /// # Errors
    ///
    /// Records return [`Error::UnsupportedType`].
    fn set_scalar(&mut self, _value: SqlValue) -> Result<()> {
        Err(Error::UnsupportedType(String::from(
            "record entities cannot be scanned as a single value",
        )))
    }

    /// Returns the row scanner when the type decodes rows itself.
    fn as_scanner(&mut self) -> Option<&mut dyn RowScanner> {
        None
    }
}

macro_rules! impl_scalar_entity {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Entity for $ty {
                fn descriptor() -> EntityDescriptor {
                    EntityDescriptor::scalar($name, <$ty as SqlType>::KIND)
                }

                fn is_scalar(&self) -> bool {
                    true
                }

                fn set_scalar(&mut self, value: SqlValue) -> Result<()> {
                    *self = <$ty as SqlType>::from_value(value)?;
                    Ok(())
                }
            }
        )+
    };
}

impl_scalar_entity!(
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    Vec<u8> => "Vec<u8>",
    NaiveDateTime => "NaiveDateTime",
    DateTime<Utc> => "DateTime<Utc>",
    Option<i64> => "Option<i64>",
    Option<f64> => "Option<f64>",
    Option<String> => "Option<String>",
);
