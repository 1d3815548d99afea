//! SQL values, field types and the type-directed decoder.
//!
//! [`SqlValue`] is what travels as a bound argument and what comes back in a
//! result row. [`SqlType`] is implemented by every type that can live in an
//! entity field; it knows how to encode itself and how to decode a column
//! value, including textual values returned by drivers in raw-bytes mode.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// A SQL value that can be used as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Returns the integer payload, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(t) => write!(f, "{t}"),
        }
    }
}

/// Declared type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `String`
    Text,
    /// `Vec<u8>`
    Bytes,
    /// `chrono` date-times.
    Timestamp,
    /// An embedded record.
    Record,
    /// A user type implementing [`SqlType`] itself.
    Custom(&'static str),
    /// A field the registry ignores; its type is never inspected.
    Ignored,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Record => "record",
            Self::Custom(name) => name,
            Self::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

/// A type that can be stored in an entity field.
///
/// Custom column types (the equivalent of a scanner/valuer pair) implement
/// this trait directly and report [`TypeKind::Custom`].
pub trait SqlType: Sized {
    /// Declared kind of the field.
    const KIND: TypeKind;

    /// Whether the field accepts `NULL`.
    const NULLABLE: bool = false;

    /// Encodes the field into a bindable value.
    fn to_value(&self) -> SqlValue;

    /// Decodes a column value into the field type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when the value has an incompatible
    /// type and [`Error::Decode`] when a textual value cannot be parsed.
    fn from_value(value: SqlValue) -> Result<Self>;

    /// Whether the value is the zero value of its type.
    fn is_zero(&self) -> bool;
}

/// Snapshot of a single entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    /// The encoded value.
    pub value: SqlValue,
    /// Whether the field held the zero value of its type.
    pub is_zero: bool,
}

impl FieldValue {
    /// Captures the current value of a field.
    #[must_use]
    pub fn of<T: SqlType>(field: &T) -> Self {
        Self {
            value: field.to_value(),
            is_zero: field.is_zero(),
        }
    }

    /// Whether the field is a `None` option.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.value.is_null()
    }
}

fn unsupported(value: &SqlValue, kind: TypeKind) -> Error {
    Error::UnsupportedType(format!("cannot decode {} into {kind}", value.type_name()))
}

fn text_of(value: SqlValue, kind: TypeKind) -> Result<String> {
    match value {
        SqlValue::Text(s) => Ok(s),
        SqlValue::Blob(b) => {
            String::from_utf8(b).map_err(|e| Error::Decode(format!("invalid utf-8 for {kind}: {e}")))
        }
        other => Err(unsupported(&other, kind)),
    }
}

fn reject_null(value: &SqlValue, kind: TypeKind) -> Result<()> {
    if value.is_null() {
        return Err(Error::Decode(format!("NULL cannot be stored in a non-nullable {kind} field")));
    }
    Ok(())
}

fn decode_i64(value: SqlValue, kind: TypeKind) -> Result<i64> {
    reject_null(&value, kind)?;
    match value {
        SqlValue::Int(n) => Ok(n),
        SqlValue::Bool(b) => Ok(i64::from(b)),
        other => {
            let text = text_of(other, kind)?;
            text.trim()
                .parse::<i64>()
                .map_err(|e| Error::Decode(format!("invalid {kind} `{text}`: {e}")))
        }
    }
}

fn decode_f64(value: SqlValue, kind: TypeKind) -> Result<f64> {
    reject_null(&value, kind)?;
    match value {
        SqlValue::Float(x) => Ok(x),
        #[allow(clippy::cast_precision_loss)]
        SqlValue::Int(n) => Ok(n as f64),
        other => {
            let text = text_of(other, kind)?;
            text.trim()
                .parse::<f64>()
                .map_err(|e| Error::Decode(format!("invalid {kind} `{text}`: {e}")))
        }
    }
}

fn decode_bool(value: SqlValue) -> Result<bool> {
    reject_null(&value, TypeKind::Bool)?;
    match value {
        SqlValue::Bool(b) => Ok(b),
        SqlValue::Int(n) => Ok(n != 0),
        other => {
            let text = text_of(other, TypeKind::Bool)?;
            match text.trim() {
                "1" | "true" | "TRUE" | "t" => Ok(true),
                "0" | "false" | "FALSE" | "f" => Ok(false),
                _ => Err(Error::Decode(format!("invalid bool `{text}`"))),
            }
        }
    }
}

fn decode_timestamp(value: SqlValue) -> Result<NaiveDateTime> {
    reject_null(&value, TypeKind::Timestamp)?;
    match value {
        SqlValue::Timestamp(t) => Ok(t),
        other => {
            let text = text_of(other, TypeKind::Timestamp)?;
            let text = text.trim();
            if let Ok(t) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(t);
            }
            if let Ok(t) = DateTime::parse_from_rfc3339(text) {
                return Ok(t.naive_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Error::Decode(format!("invalid timestamp `{text}`")))
        }
    }
}

macro_rules! impl_sql_type_int {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl SqlType for $ty {
                const KIND: TypeKind = TypeKind::$kind;

                fn to_value(&self) -> SqlValue {
                    SqlValue::Int(i64::from(*self))
                }

                fn from_value(value: SqlValue) -> Result<Self> {
                    let n = decode_i64(value, Self::KIND)?;
                    <$ty>::try_from(n)
                        .map_err(|_| Error::Decode(format!("{n} is out of range for {}", Self::KIND)))
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )+
    };
}

impl_sql_type_int!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, u8 => U8, u16 => U16, u32 => U32);

impl SqlType for f64 {
    const KIND: TypeKind = TypeKind::F64;

    fn to_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        decode_f64(value, Self::KIND)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl SqlType for f32 {
    const KIND: TypeKind = TypeKind::F32;

    fn to_value(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: SqlValue) -> Result<Self> {
        decode_f64(value, Self::KIND).map(|x| x as Self)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl SqlType for bool {
    const KIND: TypeKind = TypeKind::Bool;

    fn to_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        decode_bool(value)
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl SqlType for String {
    const KIND: TypeKind = TypeKind::Text;

    fn to_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        reject_null(&value, Self::KIND)?;
        match value {
            SqlValue::Int(n) => Ok(n.to_string()),
            SqlValue::Float(x) => Ok(x.to_string()),
            SqlValue::Bool(b) => Ok(b.to_string()),
            SqlValue::Timestamp(t) => Ok(t.to_string()),
            other => text_of(other, Self::KIND),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl SqlType for Vec<u8> {
    const KIND: TypeKind = TypeKind::Bytes;

    fn to_value(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        reject_null(&value, Self::KIND)?;
        match value {
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => Err(unsupported(&other, Self::KIND)),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl SqlType for NaiveDateTime {
    const KIND: TypeKind = TypeKind::Timestamp;

    fn to_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        decode_timestamp(value)
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl SqlType for DateTime<Utc> {
    const KIND: TypeKind = TypeKind::Timestamp;

    fn to_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.naive_utc())
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        decode_timestamp(value).map(|t| Utc.from_utc_datetime(&t))
    }

    fn is_zero(&self) -> bool {
        self.timestamp() == 0 && self.timestamp_subsec_nanos() == 0
    }
}

impl<T: SqlType> SqlType for Option<T> {
    const KIND: TypeKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> SqlValue {
        self.as_ref().map_or(SqlValue::Null, SqlType::to_value)
    }

    fn from_value(value: SqlValue) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

macro_rules! impl_to_sql_value_via_sql_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlType::to_value(&self)
                }
            }
        )+
    };
}

impl_to_sql_value_via_sql_type!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    NaiveDateTime,
    DateTime<Utc>,
);

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}
