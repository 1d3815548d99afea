use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Destination, Request, Response, ShardingAlgorithm};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expr::Op;
use crate::value::SqlType;

/// How one dimension of a destination is named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Not sharded: every key value uses this literal name.
    Fixed(String),
    /// Sharded: `{}` in `template` is replaced by `value mod base`.
    Modulo {
        /// Name template, e.g. `order_db_{}`.
        template: String,
        /// Modulo base.
        base: u32,
    },
}

impl Pattern {
    /// Creates a fixed pattern.
    #[must_use]
    pub fn fixed(name: &str) -> Self {
        Self::Fixed(String::from(name))
    }

    /// Creates a modulo pattern.
    #[must_use]
    pub fn modulo(template: &str, base: u32) -> Self {
        Self::Modulo {
            template: String::from(template),
            base,
        }
    }

    fn resolve(&self, value: i64) -> Result<String> {
        match self {
            Self::Fixed(name) => Ok(name.clone()),
            Self::Modulo { template, base } => {
                let n = value
                    .checked_rem_euclid(i64::from(*base))
                    .ok_or_else(|| Error::Config(format!("modulo base of `{template}` is zero")))?;
                Ok(template.replace("{}", &n.to_string()))
            }
        }
    }

    fn all(&self) -> Vec<String> {
        match self {
            Self::Fixed(name) => vec![name.clone()],
            Self::Modulo { template, base } => (0..*base)
                .map(|n| template.replace("{}", &n.to_string()))
                .collect(),
        }
    }
}

/// Hash-modulo sharding over one integer key.
///
/// Each dimension is either fixed or named after `key mod base`. Equality
/// resolves to exactly one destination; range and inequality comparisons
/// cannot narrow the search and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    /// Field name of the sharding key.
    pub sharding_key: String,
    /// Datasource naming.
    pub datasource: Pattern,
    /// Database naming.
    pub database: Pattern,
    /// Table naming.
    pub table: Pattern,
}

impl Hash {
    /// Creates a hash algorithm.
    #[must_use]
    pub fn new(sharding_key: &str, datasource: Pattern, database: Pattern, table: Pattern) -> Self {
        Self {
            sharding_key: String::from(sharding_key),
            datasource,
            database,
            table,
        }
    }

    /// Checks that the key is set and no modulo base is zero.
    ///
    /// # Errors
    ///
    /// [`Error::MissingShardingKey`] or [`Error::Config`].
    pub fn validate(&self) -> Result<()> {
        if self.sharding_key.is_empty() {
            return Err(Error::MissingShardingKey);
        }
        for pattern in [&self.datasource, &self.database, &self.table] {
            pattern.resolve(0)?;
        }
        Ok(())
    }

    fn destination(&self, value: i64) -> Result<Destination> {
        Ok(Destination {
            datasource: self.datasource.resolve(value)?,
            database: self.database.resolve(value)?,
            table: self.table.resolve(value)?,
        })
    }
}

impl ShardingAlgorithm for Hash {
    fn sharding_keys(&self) -> Vec<String> {
        vec![self.sharding_key.clone()]
    }

    fn sharding(&self, ctx: &Context, request: &Request) -> Result<Response> {
        if self.sharding_key.is_empty() {
            return Err(Error::MissingShardingKey);
        }
        let Some(value) = request.sharding_values.get(&self.sharding_key) else {
            return Ok(Response {
                destinations: self.broadcast(ctx),
            });
        };
        match request.op {
            Op::Eq => {
                let key = i64::from_value(value.clone())?;
                let dst = self.destination(key)?;
                debug!(key, destination = %dst, "resolved sharding key");
                Ok(Response {
                    destinations: vec![dst],
                })
            }
            Op::Gt | Op::GtEq | Op::Lt | Op::LtEq | Op::Neq | Op::NotIn => Ok(Response {
                destinations: self.broadcast(ctx),
            }),
            op => Err(Error::UnsupportedOperator(op)),
        }
    }

    fn broadcast(&self, _ctx: &Context) -> Vec<Destination> {
        let datasources = self.datasource.all();
        let databases = self.database.all();
        let tables = self.table.all();
        let mut out = Vec::with_capacity(datasources.len() * databases.len() * tables.len());
        for ds in &datasources {
            for db in &databases {
                for tbl in &tables {
                    out.push(Destination::new(ds, db, tbl));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    fn order_hash() -> Hash {
        Hash::new(
            "user_id",
            Pattern::modulo("{}.db.cluster.local:3306", 2),
            Pattern::modulo("order_db_{}", 2),
            Pattern::modulo("order_tab_{}", 3),
        )
    }

    #[test]
    fn test_eq_resolves_one_destination() {
        let ctx = Context::new();
        let resp = order_hash()
            .sharding(&ctx, &Request::new(Op::Eq, "user_id", SqlValue::Int(5)))
            .unwrap();
        assert_eq!(
            resp.destinations,
            vec![Destination::new(
                "1.db.cluster.local:3306",
                "order_db_1",
                "order_tab_2"
            )]
        );
    }

    #[test]
    fn test_range_broadcasts() {
        let ctx = Context::new();
        let hash = order_hash();
        for op in [Op::Gt, Op::GtEq, Op::Lt, Op::LtEq, Op::Neq, Op::NotIn] {
            let resp = hash
                .sharding(&ctx, &Request::new(op, "user_id", SqlValue::Int(5)))
                .unwrap();
            assert_eq!(resp.destinations.len(), 12, "{op}");
        }
    }

    #[test]
    fn test_missing_key_value_broadcasts() {
        let ctx = Context::new();
        let resp = order_hash()
            .sharding(&ctx, &Request::new(Op::Eq, "order_id", SqlValue::Int(5)))
            .unwrap();
        assert_eq!(resp.destinations, order_hash().broadcast(&ctx));
    }

    #[test]
    fn test_unsupported_operator() {
        let ctx = Context::new();
        let err = order_hash()
            .sharding(&ctx, &Request::new(Op::Like, "user_id", SqlValue::Int(5)))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator(Op::Like)));
    }

    #[test]
    fn test_empty_key() {
        let ctx = Context::new();
        let mut hash = order_hash();
        hash.sharding_key.clear();
        let err = hash
            .sharding(&ctx, &Request::new(Op::Eq, "user_id", SqlValue::Int(5)))
            .unwrap_err();
        assert!(matches!(err, Error::MissingShardingKey));
        assert!(matches!(hash.validate(), Err(Error::MissingShardingKey)));
    }

    #[test]
    fn test_broadcast_with_fixed_dimensions() {
        let hash = Hash::new(
            "user_id",
            Pattern::fixed("order_ds"),
            Pattern::fixed("order_db"),
            Pattern::modulo("order_tab_{}", 3),
        );
        let all = hash.broadcast(&Context::new());
        assert_eq!(
            all,
            vec![
                Destination::new("order_ds", "order_db", "order_tab_0"),
                Destination::new("order_ds", "order_db", "order_tab_1"),
                Destination::new("order_ds", "order_db", "order_tab_2"),
            ]
        );
    }

    #[test]
    fn test_negative_key_uses_euclidean_modulo() {
        let ctx = Context::new();
        let resp = order_hash()
            .sharding(&ctx, &Request::new(Op::Eq, "user_id", SqlValue::Int(-1)))
            .unwrap();
        assert_eq!(resp.destinations[0].table, "order_tab_2");
    }

    #[test]
    fn test_zero_base_is_rejected() {
        let hash = Hash::new(
            "user_id",
            Pattern::fixed("ds"),
            Pattern::fixed("db"),
            Pattern::modulo("tab_{}", 0),
        );
        assert!(matches!(hash.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{
            "sharding_key": "user_id",
            "datasource": {"fixed": "ds"},
            "database": {"modulo": {"template": "db_{}", "base": 2}},
            "table": {"modulo": {"template": "tab_{}", "base": 3}}
        }"#;
        let hash: Hash = serde_json::from_str(json).unwrap();
        assert_eq!(hash.database, Pattern::modulo("db_{}", 2));
        assert_eq!(hash.broadcast(&Context::new()).len(), 6);
    }
}
