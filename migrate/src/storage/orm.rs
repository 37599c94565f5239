use error_stack::Report;

use super::{StorageProbe, UnsetValue};
use crate::error::{Error, Result};
use crate::remote::constants::MODEL_MODELS;
use crate::remote::{Domain, Operator, RecordAccess, RemoteApi};

/// Storage probe answered through the ORM when no database URL is configured
///
/// The ORM exposes no column catalog, so `column_exists` always fails and every
/// field comes back as unverifiable. Counts still go through `search_count`,
/// which works while some definition of the field is registered.
pub struct OrmStorageProbe<'a> {
    remote: &'a dyn RemoteApi,
}

impl<'a> OrmStorageProbe<'a> {
    pub fn new(remote: &'a dyn RemoteApi) -> Self {
        Self { remote }
    }

    /// Model owning `table`, resolved through the model registry
    fn model_for(&self, table: &str) -> Result<Option<String>> {
        let leading = table.split('_').next().unwrap_or(table);
        let models = self.remote.search_read(
            MODEL_MODELS,
            &Domain::all().with("model", Operator::Like, leading),
            &["model"],
            None,
        )?;
        Ok(models
            .iter()
            .filter_map(|record| record.text("model"))
            .find(|model| model.replace('.', "_") == table)
            .map(ToString::to_string))
    }
}

impl StorageProbe for OrmStorageProbe<'_> {
    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Err(Report::new(Error::Storage(format!(
            "unverifiable: {table}.{column} has no column catalog through the ORM, configure \
             pg_url"
        ))))
    }

    fn non_null_count(&self, table: &str, column: &str, _unset: UnsetValue) -> Result<u64> {
        let Some(model) = self.model_for(table)? else {
            return Ok(0);
        };
        self.remote.count(&model, &Domain::is_set(column))
    }
}
