//! Sharding algorithms and predicate routing.
//!
//! An algorithm maps a comparison on its sharding key to a set of
//! [`Destination`]s. [`router::route`] walks a predicate tree and combines
//! the per-leaf answers.

mod hash;
pub mod router;
mod shadow;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use hash::{Hash, Pattern};
pub use shadow::Shadow;

use crate::context::Context;
use crate::error::Result;
use crate::expr::Op;
use crate::value::SqlValue;

/// A physical location: datasource, database and table names.
///
/// Ordering compares the datasource first, then the database, then the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Destination {
    /// Datasource name.
    pub datasource: String,
    /// Database name.
    pub database: String,
    /// Table name.
    pub table: String,
}

impl Destination {
    /// Creates a destination.
    #[must_use]
    pub fn new(datasource: &str, database: &str, table: &str) -> Self {
        Self {
            datasource: String::from(datasource),
            database: String::from(database),
            table: String::from(table),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.datasource, self.database, self.table)
    }
}

/// A single comparison handed to an algorithm: `key op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Comparison operator.
    pub op: Op,
    /// Sharding key field name to compared value.
    pub sharding_values: HashMap<String, SqlValue>,
}

impl Request {
    /// Creates a request comparing one field.
    #[must_use]
    pub fn new(op: Op, field: &str, value: SqlValue) -> Self {
        let mut sharding_values = HashMap::with_capacity(1);
        sharding_values.insert(String::from(field), value);
        Self {
            op,
            sharding_values,
        }
    }
}

/// Destinations answered by an algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// Matching destinations.
    pub destinations: Vec<Destination>,
}

/// A routing policy from sharding key values to destinations.
pub trait ShardingAlgorithm: fmt::Debug + Send + Sync {
    /// Returns the field names used as sharding keys.
    fn sharding_keys(&self) -> Vec<String>;

    /// Resolves the destinations matching a comparison.
    ///
    /// # Errors
    ///
    /// Implementation-defined; see [`Hash`].
    fn sharding(&self, ctx: &Context, request: &Request) -> Result<Response>;

    /// Returns every destination.
    fn broadcast(&self, ctx: &Context) -> Vec<Destination>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_ordering() {
        let a = Destination::new("ds_0", "db_1", "tab_0");
        let b = Destination::new("ds_1", "db_0", "tab_0");
        let c = Destination::new("ds_0", "db_1", "tab_1");
        let mut all = vec![b.clone(), c.clone(), a.clone()];
        all.sort();
        assert_eq!(all, vec![a, c, b]);
    }

    #[test]
    fn test_destination_display() {
        let d = Destination::new("ds_0", "order_db_1", "order_tab_2");
        assert_eq!(d.to_string(), "ds_0/order_db_1.order_tab_2");
    }
}
