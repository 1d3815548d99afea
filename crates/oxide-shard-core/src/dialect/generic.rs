//! ANSI dialect.

use super::Dialect;

/// Quotes identifiers with double quotes.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}
