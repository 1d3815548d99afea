//! PostgreSQL dialect.

use super::Dialect;

/// Double-quoted identifiers and `$1, $2, ...` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn parameter_placeholder(&self) -> &'static str {
        "$"
    }

    fn numbered_placeholders(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_placeholder() {
        assert_eq!(PostgresDialect.placeholder(1), "$1");
        assert_eq!(PostgresDialect.placeholder(12), "$12");
        assert_eq!(PostgresDialect.quote_identifier("order"), "\"order\"");
    }
}
