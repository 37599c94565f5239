//! Storage-level access used by cleanup and verification
//!
//! Field metadata lives in the ORM registry but values live in table columns.
//! Verification looks at the columns directly when it can, and field
//! definitions are only ever removed through a direct connection.

mod orm;
mod postgres;

pub use orm::OrmStorageProbe;
pub use postgres::PgStorage;

use crate::error::Result;

/// Shown whenever a step needs `pg_url` and none is configured
pub const DIRECT_STORAGE_REQUIRED: &str = "Removing Studio field definitions needs a direct \
                                           database connection - set pg_url in the instance \
                                           config or ODOO_PG_URL";

/// What an unset value looks like in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsetValue {
    /// Only `NULL`
    Null,
    /// `NULL` or `false`; boolean columns store an unchecked box as `false`
    NullOrFalse,
}

impl UnsetValue {
    /// Match the ORM's `!= False` semantics for a field of `field_type`
    pub fn for_field_type(field_type: &str) -> Self {
        if field_type == "boolean" {
            Self::NullOrFalse
        } else {
            Self::Null
        }
    }
}

/// Read-only view of the underlying storage columns
pub trait StorageProbe {
    /// Whether `column` exists on `table`
    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Number of rows of `table` where `column` holds a value
    fn non_null_count(&self, table: &str, column: &str, unset: UnsetValue) -> Result<u64>;
}

/// Storage table backing a model: `sale.order` lives in `sale_order`
pub fn table_name(model: &str) -> String {
    model.replace('.', "_")
}
