//! Rendered statements and driver-neutral results.

use crate::value::SqlValue;

/// A rendered statement with its positional arguments.
///
/// `datasource` and `database` are empty for unsharded statements; the
/// data source layer dispatches on them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Arguments, in placeholder order.
    pub args: Vec<SqlValue>,
    /// Target datasource name.
    pub datasource: String,
    /// Target database name.
    pub database: String,
}

impl Query {
    /// Creates an unsharded query.
    #[must_use]
    pub const fn new(sql: String, args: Vec<SqlValue>) -> Self {
        Self {
            sql,
            args,
            datasource: String::new(),
            database: String::new(),
        }
    }

    /// Sets the datasource and database the query targets.
    #[must_use]
    pub fn with_target(mut self, datasource: &str, database: &str) -> Self {
        self.datasource = String::from(datasource);
        self.database = String::from(database);
        self
    }
}

/// Rows returned by a query, fully buffered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    /// Column names, in result order.
    pub columns: Vec<String>,
    /// Row values, each in column order.
    pub rows: Vec<Vec<SqlValue>>,
}

impl Rows {
    /// Creates a result set.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    /// Returns `true` when no row was returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Number of rows written.
    pub rows_affected: u64,
    /// Last generated id, when the driver reports one.
    pub last_insert_id: Option<i64>,
}
