//! The narrow capability set every pipeline stage talks to
//!
//! Stages never see the transport. They are handed a `&dyn RemoteApi` (the real
//! JSON-RPC adapter in production, the in-memory fake in tests).

use serde_json::{Map, Value};

use super::domain::Domain;
use crate::error::Result;

/// A record as returned by `read`: field name to value
pub type Record = Map<String, Value>;

/// Database id of a record
pub type RecordId = i64;

/// Blocking object-model API of the remote platform
pub trait RemoteApi {
    /// Ids of `model` records matching `domain`, at most `limit` when given
    fn search(&self, model: &str, domain: &Domain, limit: Option<usize>) -> Result<Vec<RecordId>>;

    /// Number of `model` records matching `domain`
    fn count(&self, model: &str, domain: &Domain) -> Result<u64>;

    /// Read `fields` of the given records; `id` is always included
    fn read(&self, model: &str, ids: &[RecordId], fields: &[&str]) -> Result<Vec<Record>>;

    /// Write `values` onto one record
    fn write(&self, model: &str, id: RecordId, values: &Record) -> Result<bool>;

    /// Remove one manual field definition from the field registry
    fn delete_metadata(&self, field_id: RecordId) -> Result<bool>;

    /// `search` followed by `read`; adapters with a native combined call override this
    fn search_read(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        let ids = self.search(model, domain, limit)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(model, &ids, fields)
    }
}

/// Typed accessors over loosely-typed records
///
/// The platform encodes "no value" as `false`, so every accessor treats `false`
/// and `null` alike.
pub trait RecordAccess {
    /// String value of `field`, `None` for false/null/non-string
    fn text(&self, field: &str) -> Option<&str>;

    /// Boolean flag, false when absent
    fn flag(&self, field: &str) -> bool;

    /// Integer value of `field`
    fn integer(&self, field: &str) -> Option<i64>;

    /// The id half of a many2one `[id, display_name]` pair, or a bare id
    fn reference_id(&self, field: &str) -> Option<i64>;
}

impl RecordAccess for Record {
    fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    fn reference_id(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Array(pair) => pair.first().and_then(Value::as_i64),
            other => other.as_i64(),
        }
    }
}

/// Whether a value counts as "set" on the platform
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
