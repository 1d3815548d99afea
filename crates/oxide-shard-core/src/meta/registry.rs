use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use super::{ColumnMeta, TableMeta, snake_case};
use crate::entity::{Entity, EntityDescriptor, EntityKind, FieldDef};
use crate::error::{Error, Result};
use crate::sharding::ShardingAlgorithm;

static DEFAULT_REGISTRY: Lazy<Arc<MetaRegistry>> = Lazy::new(|| Arc::new(MetaRegistry::new()));

/// Returns the process-wide registry.
#[must_use]
pub fn default_registry() -> Arc<MetaRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Adjustment applied to a [`TableMeta`] after it is built from the
/// descriptor, in the order given.
#[derive(Clone)]
pub enum TableMetaOption {
    /// Removes fields from the columns and both lookup maps.
    IgnoreFields(Vec<String>),
    /// Attaches a routing policy.
    WithShardingAlgorithm(Arc<dyn ShardingAlgorithm>),
    /// Overrides the table name.
    WithTableName(String),
}

impl TableMetaOption {
    /// Creates an [`IgnoreFields`](Self::IgnoreFields) option.
    #[must_use]
    pub fn ignore_fields(fields: &[&str]) -> Self {
        Self::IgnoreFields(fields.iter().map(|s| String::from(*s)).collect())
    }

    /// Creates a [`WithShardingAlgorithm`](Self::WithShardingAlgorithm) option.
    #[must_use]
    pub fn sharding_algorithm<A: ShardingAlgorithm + 'static>(algorithm: A) -> Self {
        Self::WithShardingAlgorithm(Arc::new(algorithm))
    }

    /// Creates a [`WithTableName`](Self::WithTableName) option.
    #[must_use]
    pub fn table_name(name: &str) -> Self {
        Self::WithTableName(String::from(name))
    }

    fn apply(self, meta: &mut TableMeta) {
        match self {
            Self::IgnoreFields(fields) => {
                for f in &fields {
                    meta.remove_field(f);
                }
            }
            Self::WithShardingAlgorithm(alg) => meta.sharding_algorithm = Some(alg),
            Self::WithTableName(name) => meta.table_name = name,
        }
    }
}

impl fmt::Debug for TableMetaOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoreFields(fields) => f.debug_tuple("IgnoreFields").field(fields).finish(),
            Self::WithShardingAlgorithm(alg) => {
                f.debug_tuple("WithShardingAlgorithm").field(alg).finish()
            }
            Self::WithTableName(name) => f.debug_tuple("WithTableName").field(name).finish(),
        }
    }
}

/// Thread-safe cache of [`TableMeta`] keyed by entity type.
///
/// Readers share the published `Arc`; a racing registration of the same type
/// replaces the previous one with an equivalent meta.
#[derive(Debug, Default)]
pub struct MetaRegistry {
    metas: RwLock<HashMap<TypeId, Arc<TableMeta>>>,
}

impl MetaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the meta of `T`, registering it without options on first use.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn get<T: Entity>(&self) -> Result<Arc<TableMeta>> {
        if let Some(meta) = self.metas.read().get(&TypeId::of::<T>()) {
            return Ok(Arc::clone(meta));
        }
        self.register::<T>(Vec::new())
    }

    /// Builds the meta of `T`, applies `options` and publishes it.
    ///
    /// # Errors
    ///
    /// - [`Error::PointerOnly`] if `T` is not a record
    /// - [`Error::FieldConflict`] if embedding declares a field twice
    /// - [`Error::ColumnConflict`] if two fields map to one column
    /// - [`Error::CombinationNotStruct`] if an embedded field is not a record
    pub fn register<T: Entity>(&self, options: Vec<TableMetaOption>) -> Result<Arc<TableMeta>> {
        let mut meta = build(T::descriptor(), TypeId::of::<T>())?;
        for option in options {
            option.apply(&mut meta);
        }
        let meta = Arc::new(meta);
        debug!(
            entity = meta.type_name,
            table = %meta.table_name,
            columns = meta.columns.len(),
            sharded = meta.sharding_algorithm.is_some(),
            "registered table meta"
        );
        self.metas.write().insert(meta.type_id, Arc::clone(&meta));
        Ok(meta)
    }
}

fn build(desc: EntityDescriptor, type_id: TypeId) -> Result<TableMeta> {
    let EntityKind::Record(fields) = desc.kind else {
        return Err(Error::PointerOnly(desc.type_name));
    };
    let mut columns = Vec::with_capacity(fields.len());
    let mut seen = HashSet::new();
    collect(&fields, &[], &mut columns, &mut seen)?;

    let columns: Vec<Arc<ColumnMeta>> = columns.into_iter().map(Arc::new).collect();
    let field_map = columns
        .iter()
        .map(|c| (c.field_name.clone(), Arc::clone(c)))
        .collect();
    let mut column_map = HashMap::with_capacity(columns.len());
    for c in &columns {
        if column_map
            .insert(c.column_name.clone(), Arc::clone(c))
            .is_some()
        {
            return Err(Error::ColumnConflict(c.column_name.clone()));
        }
    }

    Ok(TableMeta {
        table_name: desc
            .table_name
            .map_or_else(|| snake_case(desc.type_name), String::from),
        columns,
        field_map,
        column_map,
        type_id,
        type_name: desc.type_name,
        sharding_algorithm: None,
    })
}

fn collect(
    fields: &[FieldDef],
    prefix: &[usize],
    out: &mut Vec<ColumnMeta>,
    seen: &mut HashSet<&'static str>,
) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        let directives = Directives::parse(field.directives);
        if directives.ignore {
            continue;
        }
        let mut path = prefix.to_vec();
        path.push(i);

        if let Some(embedded) = field.embedded {
            let inner = embedded();
            let EntityKind::Record(inner_fields) = inner.kind else {
                return Err(Error::CombinationNotStruct(String::from(field.name)));
            };
            collect(&inner_fields, &path, out, seen)?;
            continue;
        }

        if !seen.insert(field.name) {
            return Err(Error::FieldConflict(String::from(field.name)));
        }
        out.push(ColumnMeta {
            column_name: field
                .column
                .map_or_else(|| snake_case(field.name), String::from),
            field_name: String::from(field.name),
            kind: field.kind,
            nullable: field.nullable,
            is_primary_key: directives.primary_key,
            is_auto_increment: directives.auto_increment,
            offset: field.offset,
            field_index: path,
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Directives {
    primary_key: bool,
    auto_increment: bool,
    ignore: bool,
}

impl Directives {
    fn parse(raw: &[&str]) -> Self {
        let mut out = Self::default();
        for d in raw {
            match d.trim() {
                "primary_key" => out.primary_key = true,
                "auto_increment" => out.auto_increment = true,
                "-" => out.ignore = true,
                _ => {}
            }
        }
        out
    }
}
