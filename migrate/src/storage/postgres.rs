//! Direct PostgreSQL access
//!
//! The rest of the tool is blocking, so the connection owns a current-thread
//! tokio runtime and blocks on each query.

use std::sync::LazyLock;

use error_stack::{Report, ResultExt};
use regex::Regex;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{StorageProbe, UnsetValue};
use crate::error::{Error, Result};

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").ok());

/// Removes the registry row only; the ORM's `unlink` would also drop the column
const DELETE_FIELD_DEFINITION: &str = "DELETE FROM ir_model_fields WHERE id = $1";

const COLUMN_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
                             WHERE table_name = $1 AND column_name = $2)";

/// A direct database connection to the instance's PostgreSQL
pub struct PgStorage {
    runtime: Runtime,
    pool:    PgPool,
}

impl PgStorage {
    /// Open a single-connection pool to `url`
    pub fn connect(url: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .change_context(Error::Storage("failed to start runtime".to_string()))?;

        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(1).connect(url))
            .change_context(Error::Storage("failed to connect to PostgreSQL".to_string()))?;

        debug!("Connected to PostgreSQL");
        Ok(Self { runtime, pool })
    }

    /// Delete one `ir_model_fields` row, leaving the field's column and data alone
    ///
    /// True when exactly one row went away.
    pub fn delete_field_definition(&self, field_id: i64) -> Result<bool> {
        let result = self
            .runtime
            .block_on(
                sqlx::query(DELETE_FIELD_DEFINITION)
                    .bind(field_id)
                    .execute(&self.pool),
            )
            .change_context(Error::Storage(format!(
                "delete of field definition {field_id}"
            )))?;
        info!("Deleted field definition {field_id} ({} rows)", result.rows_affected());
        Ok(result.rows_affected() == 1)
    }
}

impl StorageProbe for PgStorage {
    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.runtime
            .block_on(
                sqlx::query_scalar::<_, bool>(COLUMN_EXISTS)
                    .bind(table)
                    .bind(column)
                    .fetch_one(&self.pool),
            )
            .change_context(Error::Storage(format!("column lookup for {table}.{column}")))
    }

    fn non_null_count(&self, table: &str, column: &str, unset: UnsetValue) -> Result<u64> {
        let sql = count_query(validate_identifier(table)?, validate_identifier(column)?, unset);

        let count = self
            .runtime
            .block_on(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool))
            .change_context(Error::Storage(format!("count for {table}.{column}")))?;

        u64::try_from(count).change_context(Error::Storage(format!(
            "negative count for {table}.{column}"
        )))
    }
}

/// Count of rows holding a value, with the same notion of "set" as the ORM
fn count_query(table: &str, column: &str, unset: UnsetValue) -> String {
    let predicate = match unset {
        UnsetValue::Null => format!(r#""{column}" IS NOT NULL"#),
        UnsetValue::NullOrFalse => {
            format!(r#""{column}" IS NOT NULL AND "{column}" IS DISTINCT FROM false"#)
        },
    };
    format!(r#"SELECT COUNT(*) FROM "{table}" WHERE {predicate}"#)
}

/// Identifiers are interpolated into SQL, so only plain lowercase names pass
fn validate_identifier(identifier: &str) -> Result<&str> {
    let valid = IDENTIFIER
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(identifier));
    if valid {
        Ok(identifier)
    } else {
        Err(Report::new(Error::invalid("SQL identifier", identifier)))
    }
}
