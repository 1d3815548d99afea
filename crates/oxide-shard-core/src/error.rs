//! Error types shared by every oxide-shard crate.

use thiserror::Error;

use crate::expr::Op;

/// Errors raised while describing entities, building SQL, routing shards or
/// talking to a data source.
#[derive(Debug, Error)]
pub enum Error {
    /// The type handed to the registry does not describe a record.
    #[error("only struct entities can be registered, `{0}` is not a record")]
    PointerOnly(&'static str),

    /// A query returned zero rows where one was expected.
    #[error("no rows in result set")]
    NoRows,

    /// The result set has more columns than the entity has fields.
    #[error("too many columns in result set")]
    TooManyColumns,

    /// Unknown field name.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Unknown column name.
    #[error("invalid column: {0}")]
    InvalidColumn(String),

    /// Two fields with the same name reached the same entity through embedding.
    #[error("field conflict: `{0}` is declared more than once")]
    FieldConflict(String),

    /// Two fields map to the same column name.
    #[error("column conflict: `{0}` is mapped by more than one field")]
    ColumnConflict(String),

    /// A field marked `embed` does not describe a record.
    #[error("embedded field `{0}` is not a struct")]
    CombinationNotStruct(String),

    /// A value cannot be encoded or decoded as the requested type.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// No dialect is known for the driver name.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// The sharding algorithm cannot evaluate this operator.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(Op),

    /// The right-hand side of an assignment cannot be used in a SET clause.
    #[error("unsupported assignment: {0}")]
    UnsupportedAssignment(String),

    /// An UPDATE has nothing to set.
    #[error("update has no value to set")]
    ValueNotSet,

    /// An INSERT has no rows.
    #[error("insert has no rows")]
    InsertZeroRows,

    /// The sharding router cannot analyse the predicate.
    #[error("predicate is too complex to route: {0}")]
    TooComplexQuery(String),

    /// The sharding key is not among the inserted columns.
    #[error("sharding key `{0}` is not among the inserted columns")]
    InsertShardingKeyNotFound(String),

    /// An inserted entity did not resolve to exactly one destination.
    #[error("insert resolved to {0} destinations, expected exactly one")]
    InsertFindingDst(usize),

    /// An UPDATE tried to assign the sharding key.
    #[error("updating sharding key `{0}` is not supported")]
    UpdateShardingKeyUnsupported(String),

    /// The sharding algorithm has no sharding key configured.
    #[error("sharding algorithm has no sharding key")]
    MissingShardingKey,

    /// A sharded builder was used on an entity without a sharding algorithm.
    #[error("entity `{0}` has no sharding algorithm")]
    NoShardingAlgorithm(String),

    /// No slave is available to serve a read.
    #[error("no slave available")]
    SlaveNotFound,

    /// The cluster has no database under this name.
    #[error("target database not found: {0}")]
    NotFoundTargetDb(String),

    /// The sharding data source has no data source under this name.
    #[error("target data source not found: {0}")]
    NotFoundTargetDataSource(String),

    /// A database was registered twice under the same name.
    #[error("database already registered: {0}")]
    RepeatedSetDb(String),

    /// A DSN could not be parsed.
    #[error("invalid dsn: {0}")]
    InvalidDsn(String),

    /// A column value could not be decoded into the destination field.
    #[error("decode error: {0}")]
    Decode(String),

    /// Error reported by the database driver.
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline elapsed.
    #[error("context deadline exceeded")]
    Timeout,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Several errors occurred, in dispatch order.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<Error>),
}

impl Error {
    /// Wraps a driver error.
    #[must_use]
    pub fn database<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database(Box::new(err))
    }

    /// Combines errors while keeping their order.
    ///
    /// Returns `None` for an empty list and the error itself for a single one.
    #[must_use]
    pub fn combine(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

/// Result type alias used across oxide-shard.
pub type Result<T> = std::result::Result<T, Error>;
