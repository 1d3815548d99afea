//! Entity metadata: table and column descriptions, cached per type.
//!
//! A [`TableMeta`] is built once per entity type from its
//! [`EntityDescriptor`](crate::entity::EntityDescriptor), then shared
//! read-only through an `Arc`.

mod registry;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use registry::{MetaRegistry, TableMetaOption, default_registry};

use crate::sharding::ShardingAlgorithm;
use crate::value::TypeKind;

/// Description of one mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name in the database.
    pub column_name: String,
    /// Field name in the entity.
    pub field_name: String,
    /// Declared field type.
    pub kind: TypeKind,
    /// Whether the field is an `Option`.
    pub nullable: bool,
    /// Part of the primary key.
    pub is_primary_key: bool,
    /// Generated by the database.
    pub is_auto_increment: bool,
    /// Byte offset inside the record that declares the field.
    pub offset: usize,
    /// Declared-field index path from the outer entity, through embedded
    /// records.
    pub field_index: Vec<usize>,
}

/// Description of the table an entity maps to.
#[derive(Clone)]
pub struct TableMeta {
    /// Table name.
    pub table_name: String,
    /// Columns in declaration order.
    pub columns: Vec<Arc<ColumnMeta>>,
    /// Field name to column.
    pub field_map: HashMap<String, Arc<ColumnMeta>>,
    /// Column name to column.
    pub column_map: HashMap<String, Arc<ColumnMeta>>,
    /// Entity type identity.
    pub type_id: TypeId,
    /// Entity type name.
    pub type_name: &'static str,
    /// Routing policy for sharded entities.
    pub sharding_algorithm: Option<Arc<dyn ShardingAlgorithm>>,
}

impl TableMeta {
    /// Looks up a column by field name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Arc<ColumnMeta>> {
        self.field_map.get(name)
    }

    /// Looks up a column by column name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Arc<ColumnMeta>> {
        self.column_map.get(name)
    }

    fn remove_field(&mut self, field: &str) {
        if let Some(c) = self.field_map.remove(field) {
            self.column_map.remove(&c.column_name);
            self.columns.retain(|m| m.field_name != field);
        }
    }
}

impl fmt::Debug for TableMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMeta")
            .field("table_name", &self.table_name)
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .field("sharding_algorithm", &self.sharding_algorithm)
            .finish_non_exhaustive()
    }
}

/// Converts a name to snake_case.
///
/// Acronyms stay together: `UserID` becomes `user_id`, `HTTPServer` becomes
/// `http_server`.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev != '_' && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)) {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
