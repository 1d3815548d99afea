//! The database handle.

use std::sync::Arc;

use oxide_shard_core::builder::{Core, Deleter, Inserter, NullPolicy, Selector, Updater};
use oxide_shard_core::dialect::Dialect;
use oxide_shard_core::valuer::AccessorKind;
use oxide_shard_core::{Entity, MetaRegistry, Result};
use oxide_shard_datasource::{DataSource, SqlxDataSource};

/// A data source plus the builder settings used against it.
///
/// The source can be a single pool or a whole sharded tree; executors pick
/// the sharded path from the entity's metadata, not from the source.
///
/// ```rust
/// use std::sync::Arc;
///
/// use oxide_shard_core::builder::NullPolicy;
/// use oxide_shard_core::valuer::AccessorKind;
/// use oxide_shard_datasource::MockDataSource;
/// use oxide_shard_orm::DB;
///
/// let db = DB::new(Arc::new(MockDataSource::new("main")))
///     .accessor(AccessorKind::Reflect)
///     .null_policy(NullPolicy::ZeroIsNull);
/// assert_eq!(db.core().accessor(), AccessorKind::Reflect);
/// ```
#[derive(Debug, Clone)]
pub struct DB {
    source: Arc<dyn DataSource>,
    core: Core,
}

impl DB {
    /// Wraps `source` with MySQL rendering and the process-wide registry.
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            core: Core::default(),
        }
    }

    /// Opens a lazily connected pool for `driver` at `url`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedDriver`](oxide_shard_core::Error::UnsupportedDriver)
    /// or [`Error::InvalidDsn`](oxide_shard_core::Error::InvalidDsn).
    pub fn open(driver: &str, url: &str, max_connections: u32) -> Result<Self> {
        let core = Core::for_driver(driver)?;
        let source = SqlxDataSource::connect_lazy(url, max_connections)?;
        Ok(Self {
            source: Arc::new(source),
            core,
        })
    }

    /// Renders with `dialect`.
    #[must_use]
    pub fn dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.core = self.core.with_dialect(dialect);
        self
    }

    /// Selects the field access strategy.
    #[must_use]
    pub fn accessor(mut self, accessor: AccessorKind) -> Self {
        self.core = self.core.with_accessor(accessor);
        self
    }

    /// Sets when entity fields bind `NULL`.
    #[must_use]
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.core = self.core.with_null_policy(policy);
        self
    }

    /// Reads entity metadata, sharding algorithms included, from `registry`.
    #[must_use]
    pub fn registry(mut self, registry: Arc<MetaRegistry>) -> Self {
        self.core = self.core.with_registry(registry);
        self
    }

    /// Returns the builder settings.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Returns the data source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Starts a SELECT scanning into `T`.
    #[must_use]
    pub fn select<T: Entity>(&self) -> Selector<T> {
        Selector::new(&self.core)
    }

    /// Starts an INSERT of `T` rows.
    #[must_use]
    pub fn insert<'a, T: Entity>(&self) -> Inserter<'a, T> {
        Inserter::new(&self.core)
    }

    /// Starts an UPDATE of `T`'s table.
    #[must_use]
    pub fn update<'a, T: Entity>(&self) -> Updater<'a, T> {
        Updater::new(&self.core)
    }

    /// Starts a DELETE from `T`'s table.
    #[must_use]
    pub fn delete<T: Entity>(&self) -> Deleter<T> {
        Deleter::new(&self.core)
    }

    /// Closes the data source.
    ///
    /// # Errors
    ///
    /// Close errors of the source.
    pub async fn close(&self) -> Result<()> {
        self.source.close().await
    }
}
