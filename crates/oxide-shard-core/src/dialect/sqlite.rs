//! SQLite dialect.

use super::Dialect;

/// SQLite accepts MySQL-style backtick quoting.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }
}
