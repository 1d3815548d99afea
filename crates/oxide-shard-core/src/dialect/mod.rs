//! SQL Dialect support.
//!
//! Different databases quote identifiers differently. The builders only need
//! the quote character, the placeholder style and the dialect name; everything
//! else is standard SQL.

mod generic;
mod mysql;
mod postgres;
mod sqlite;

use std::sync::Arc;

pub use generic::GenericDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: std::fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the parameter placeholder style.
    fn parameter_placeholder(&self) -> &'static str {
        "?"
    }

    /// Returns `true` when placeholders carry their 1-based position.
    fn numbered_placeholders(&self) -> bool {
        false
    }

    /// Returns the placeholder of the `n`th argument, counting from 1.
    fn placeholder(&self, n: usize) -> String {
        if self.numbered_placeholders() {
            format!("{}{n}", self.parameter_placeholder())
        } else {
            String::from(self.parameter_placeholder())
        }
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        format!("{quote}{name}{quote}")
    }
}

/// Returns the dialect registered for a driver name.
///
/// # Errors
///
/// Returns [`Error::UnsupportedDriver`] for unknown drivers.
pub fn dialect_for_driver(driver: &str) -> Result<Arc<dyn Dialect>> {
    match driver {
        "mysql" => Ok(Arc::new(MySqlDialect)),
        "sqlite3" | "sqlite" => Ok(Arc::new(SqliteDialect)),
        "postgres" | "postgresql" => Ok(Arc::new(PostgresDialect)),
        other => Err(Error::UnsupportedDriver(String::from(other))),
    }
}
