//! Running builders against a [`DB`].
//!
//! Entities whose metadata carries a sharding algorithm are routed and
//! fanned out; every other entity runs one statement on the source as is.

use std::sync::Arc;

use async_trait::async_trait;
use oxide_shard_core::builder::{Core, Deleter, Inserter, Selector, ShardedQuery, Updater};
use oxide_shard_core::meta::TableMeta;
use oxide_shard_core::{
    Context, Destination, Entity, EntityKind, Error, ExecResult, Query, Result, Rows,
};
use tracing::debug;

use crate::db::DB;
use crate::sharding::{ShardingResult, dispatch, exec_all};

/// A builder that renders to one statement, or one per destination.
pub trait Statement: Send + Sync {
    /// Returns the meta of the table the statement targets.
    ///
    /// # Errors
    ///
    /// Registration errors of the entity.
    fn table_meta(&self) -> Result<Arc<TableMeta>>;

    /// Renders the unsharded statement.
    ///
    /// # Errors
    ///
    /// Build errors of the builder.
    fn render(&self) -> Result<Query>;

    /// Renders one statement per destination.
    ///
    /// # Errors
    ///
    /// Build and routing errors of the builder.
    fn render_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>>;

    /// Returns `true` when the target table has a sharding algorithm.
    ///
    /// # Errors
    ///
    /// Registration errors of the entity.
    fn is_sharded(&self) -> Result<bool> {
        Ok(self.table_meta()?.sharding_algorithm.is_some())
    }
}

impl<T: Entity> Statement for Inserter<'_, T> {
    fn table_meta(&self) -> Result<Arc<TableMeta>> {
        self.core().registry().get::<T>()
    }

    fn render(&self) -> Result<Query> {
        self.build()
    }

    fn render_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        self.build_sharding(ctx)
    }
}

impl<T: Entity> Statement for Updater<'_, T> {
    fn table_meta(&self) -> Result<Arc<TableMeta>> {
        self.core().registry().get::<T>()
    }

    fn render(&self) -> Result<Query> {
        self.build()
    }

    fn render_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        self.build_sharding(ctx)
    }
}

impl<T: Entity> Statement for Deleter<T> {
    fn table_meta(&self) -> Result<Arc<TableMeta>> {
        self.core().registry().get::<T>()
    }

    fn render(&self) -> Result<Query> {
        self.build()
    }

    fn render_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        self.build_sharding(ctx)
    }
}

impl<T: Entity> Statement for Selector<T> {
    fn table_meta(&self) -> Result<Arc<TableMeta>> {
        Selector::table_meta(self)
    }

    fn render(&self) -> Result<Query> {
        self.build()
    }

    fn render_sharding(&self, ctx: &Context) -> Result<Vec<ShardedQuery>> {
        self.build_sharding(ctx)
    }
}

/// Executes INSERT, UPDATE and DELETE builders.
#[async_trait]
pub trait Exec: Statement {
    /// Runs the statement and returns the combined outcome.
    ///
    /// Sharded statements run on every destination in parallel; rows
    /// affected are summed.
    ///
    /// # Errors
    ///
    /// Build errors before anything runs, then driver errors. Several failed
    /// destinations yield [`Error::Multiple`].
    async fn exec(&self, ctx: &Context, db: &DB) -> Result<ExecResult> {
        if self.is_sharded()? {
            return self.exec_sharding(ctx, db).await?.into_result();
        }
        let query = self.render()?;
        db.source().exec(ctx, &query).await
    }

    /// Runs the statement on every destination and keeps each outcome.
    ///
    /// # Errors
    ///
    /// Build and routing errors only; driver errors land in the result.
    async fn exec_sharding(&self, ctx: &Context, db: &DB) -> Result<ShardingResult> {
        let queries = self.render_sharding(ctx)?;
        Ok(exec_all(db.source(), ctx, queries).await)
    }
}

impl<T: Entity> Exec for Inserter<'_, T> {}
impl<T: Entity> Exec for Updater<'_, T> {}
impl<T: Entity> Exec for Deleter<T> {}

/// Executes SELECT builders, scanning rows into `T`.
///
/// Across shards, results are kept per destination or concatenated in
/// destination order; no merge sort is applied.
#[async_trait]
pub trait Fetch<T>: Send + Sized {
    /// Returns the first row, adding `LIMIT 1`.
    ///
    /// # Errors
    ///
    /// [`Error::NoRows`] when nothing matches, plus build, driver and scan
    /// errors.
    async fn get(self, ctx: &Context, db: &DB) -> Result<T>;

    /// Returns every row.
    ///
    /// # Errors
    ///
    /// Build, driver and scan errors.
    async fn get_multi(self, ctx: &Context, db: &DB) -> Result<Vec<T>>;

    /// Returns the rows of every destination, in destination order.
    ///
    /// # Errors
    ///
    /// [`Error::NoShardingAlgorithm`] for unsharded entities; failed
    /// destinations combine into [`Error::Multiple`].
    async fn get_per_shard(self, ctx: &Context, db: &DB) -> Result<Vec<(Destination, Vec<T>)>>;
}

#[async_trait]
impl<T: Entity + Default> Fetch<T> for Selector<T> {
    async fn get(self, ctx: &Context, db: &DB) -> Result<T> {
        let selector = self.limit(1);
        let rows = if selector.is_sharded()? {
            selector
                .get_per_shard(ctx, db)
                .await?
                .into_iter()
                .flat_map(|(_, rows)| rows)
                .next()
        } else {
            selector.get_multi(ctx, db).await?.into_iter().next()
        };
        rows.ok_or(Error::NoRows)
    }

    async fn get_multi(self, ctx: &Context, db: &DB) -> Result<Vec<T>> {
        if self.is_sharded()? {
            let shards = self.get_per_shard(ctx, db).await?;
            return Ok(shards.into_iter().flat_map(|(_, rows)| rows).collect());
        }
        let query = self.build()?;
        let rows = db.source().query(ctx, &query).await?;
        scan(self.core(), &self.table_meta()?, rows)
    }

    async fn get_per_shard(self, ctx: &Context, db: &DB) -> Result<Vec<(Destination, Vec<T>)>> {
        let queries = self.build_sharding(ctx)?;
        let slots = dispatch(db.source(), ctx, queries, |source, ctx, query| async move {
            source.query(&ctx, &query).await
        })
        .await;

        let source_meta = Selector::table_meta(&self)?;
        let mut shards = Vec::with_capacity(slots.len());
        let mut errors = Vec::new();
        for (dst, res) in slots {
            match res.and_then(|rows| scan(self.core(), &source_meta, rows)) {
                Ok(rows) => shards.push((dst, rows)),
                Err(err) => errors.push(err),
            }
        }
        if let Some(err) = Error::combine(errors) {
            return Err(err);
        }
        debug!(shards = shards.len(), "sharded select scanned");
        Ok(shards)
    }
}

/// Decodes rows into `T`.
///
/// Scalars and row scanners decode themselves; records use their own meta,
/// which may differ from the table read.
fn scan<T: Entity + Default>(core: &Core, source_meta: &Arc<TableMeta>, rows: Rows) -> Result<Vec<T>> {
    let meta = match T::descriptor().kind {
        EntityKind::Scalar(_) => Arc::clone(source_meta),
        EntityKind::Record(_) => core.registry().get::<T>()?,
    };
    let Rows { columns, rows } = rows;
    rows.into_iter()
        .map(|values| {
            let mut entity = T::default();
            core.valuer().set_columns(&meta, &mut entity, &columns, values)?;
            Ok(entity)
        })
        .collect()
}
