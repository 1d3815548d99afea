//! SQL builders.
//!
//! Every builder renders into a pooled buffer through the shared writer and
//! returns a [`Query`](crate::query::Query) whose `?` placeholders match its
//! arguments left to right.
//!
//! # Example
//!
//! ```rust
//! use oxide_shard_core::builder::{Core, Selector};
//! use oxide_shard_core::dialect::MySqlDialect;
//! use oxide_shard_core::expr::{col, columns};
//! use oxide_shard_core::{Entity, SqlValue};
//! # use oxide_shard_core::{EntityDescriptor, FieldDef, FieldValue, TypeKind};
//! # #[derive(Default)]
//! # struct TestModel { id: i64, age: i32 }
//! # impl Entity for TestModel {
//! #     fn descriptor() -> EntityDescriptor {
//! #         let field = |name, kind| FieldDef {
//! #             name, column: None, kind, nullable: false,
//! #             directives: &[], offset: 0, embedded: None,
//! #         };
//! #         EntityDescriptor::record("TestModel", None, vec![
//! #             field("id", TypeKind::I64), field("age", TypeKind::I32),
//! #         ])
//! #     }
//! # }
//! let core = Core::new(std::sync::Arc::new(MySqlDialect));
//! let query = Selector::<TestModel>::new(&core)
//!     .select(columns(&["id", "age"]))
//!     .where_([col("id").eq(18)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query.sql, "SELECT `id`,`age` FROM `test_model` WHERE `id`=?;");
//! assert_eq!(query.args, vec![SqlValue::Int(18)]);
//! ```

mod delete;
mod insert;
mod select;
mod sharding;
mod update;
mod writer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use delete::Deleter;
pub use insert::Inserter;
pub use select::{Selectable, Selector};
pub use sharding::ShardedQuery;
pub use update::Updater;

use crate::dialect::{Dialect, MySqlDialect, dialect_for_driver};
use crate::error::Result;
use crate::meta::{MetaRegistry, default_registry};
use crate::valuer::{AccessorKind, Valuer};
use crate::value::{FieldValue, SqlValue};

/// When an entity field binds as `NULL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Only `None` binds `NULL`.
    #[default]
    NilIsNull,
    /// Zero values (`0`, `""`, `false`, ...) bind `NULL` as well.
    ZeroIsNull,
}

impl NullPolicy {
    /// Returns the argument bound for a field.
    #[must_use]
    pub fn bind(self, field: FieldValue) -> SqlValue {
        match self {
            Self::ZeroIsNull if field.is_zero => SqlValue::Null,
            _ => field.value,
        }
    }
}

/// Settings shared by every builder: dialect, metadata, field access and
/// null policy.
#[derive(Clone)]
pub struct Core {
    dialect: Arc<dyn Dialect>,
    registry: Arc<MetaRegistry>,
    accessor: AccessorKind,
    valuer: Arc<dyn Valuer>,
    null_policy: NullPolicy,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("dialect", &self.dialect)
            .field("accessor", &self.accessor)
            .field("null_policy", &self.null_policy)
            .finish_non_exhaustive()
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new(Arc::new(MySqlDialect))
    }
}

impl Core {
    /// Creates a core using the process-wide registry.
    #[must_use]
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        let accessor = AccessorKind::default();
        Self {
            dialect,
            registry: default_registry(),
            accessor,
            valuer: accessor.valuer(),
            null_policy: NullPolicy::default(),
        }
    }

    /// Creates a core for a driver name such as `mysql` or `sqlite3`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedDriver`](crate::Error::UnsupportedDriver).
    pub fn for_driver(driver: &str) -> Result<Self> {
        Ok(Self::new(dialect_for_driver(driver)?))
    }

    /// Renders with another dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Uses another metadata registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<MetaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Selects the field access strategy.
    #[must_use]
    pub fn with_accessor(mut self, accessor: AccessorKind) -> Self {
        self.accessor = accessor;
        self.valuer = accessor.valuer();
        self
    }

    /// Sets the null policy.
    #[must_use]
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the metadata registry.
    #[must_use]
    pub fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    /// Returns the field access strategy.
    #[must_use]
    pub fn valuer(&self) -> &dyn Valuer {
        self.valuer.as_ref()
    }

    /// Returns the configured accessor kind.
    #[must_use]
    pub const fn accessor(&self) -> AccessorKind {
        self.accessor
    }

    /// Returns the null policy.
    #[must_use]
    pub const fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }
}

/// An ORDER BY item: one or more fields sharing a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub(crate) fields: Vec<String>,
    pub(crate) desc: bool,
}

/// Orders ascending by `fields`.
#[must_use]
pub fn asc(fields: &[&str]) -> OrderBy {
    OrderBy {
        fields: fields.iter().map(|s| String::from(*s)).collect(),
        desc: false,
    }
}

/// Orders descending by `fields`.
#[must_use]
pub fn desc(fields: &[&str]) -> OrderBy {
    OrderBy {
        fields: fields.iter().map(|s| String::from(*s)).collect(),
        desc: true,
    }
}

/// Converts a row count into an argument.
fn count_arg(n: u64) -> SqlValue {
    SqlValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_policy() {
        let zero = FieldValue {
            value: SqlValue::Int(0),
            is_zero: true,
        };
        assert_eq!(NullPolicy::NilIsNull.bind(zero.clone()), SqlValue::Int(0));
        assert_eq!(NullPolicy::ZeroIsNull.bind(zero), SqlValue::Null);

        let set = FieldValue::of(&5_i64);
        assert_eq!(NullPolicy::ZeroIsNull.bind(set), SqlValue::Int(5));
    }

    #[test]
    fn test_core_settings() {
        let core = Core::for_driver("sqlite3")
            .unwrap()
            .with_accessor(AccessorKind::Reflect)
            .with_null_policy(NullPolicy::ZeroIsNull);
        assert_eq!(core.dialect().name(), "sqlite");
        assert_eq!(core.accessor(), AccessorKind::Reflect);
        assert_eq!(core.null_policy(), NullPolicy::ZeroIsNull);
        assert!(Core::for_driver("oracle").is_err());
    }
}
