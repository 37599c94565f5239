//! In-memory `RemoteApi` and `StorageProbe` used by tests
//!
//! Tables are keyed by model name. Domains are evaluated locally, every call is
//! logged, and failures can be injected per model, per field or per delete.
//!
//! `delete_metadata` models `OdooClient` with a direct database connection: the
//! registry row goes and the stored values stay, as with the plain SQL delete.
//! `refuse_deletes` models a client without one.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use error_stack::Report;
use regex::Regex;
use serde_json::Value;

use super::api::{Record, RecordId, RemoteApi, is_truthy};
use super::constants::MODEL_FIELDS;
use super::domain::{Condition, Domain, Operator};
use crate::error::{Error, Result};
use crate::storage::{DIRECT_STORAGE_REQUIRED, StorageProbe, UnsetValue};

/// One logged call against the fake
#[derive(Debug, Clone)]
pub struct LoggedCall {
    pub method: &'static str,
    pub model:  String,
    pub domain: Option<Domain>,
}

#[derive(Default)]
pub struct InMemoryRemote {
    tables:           RefCell<BTreeMap<String, BTreeMap<RecordId, Record>>>,
    next_id:          Cell<RecordId>,
    calls:            RefCell<Vec<LoggedCall>>,
    mutations:        Cell<usize>,
    failing_models:   RefCell<BTreeSet<String>>,
    failing_fields:   RefCell<BTreeSet<(String, String)>>,
    failing_deletes:  RefCell<BTreeSet<RecordId>>,
    refusing_deletes: Cell<bool>,
    failing_probes:   RefCell<BTreeSet<(String, String)>>,
    dropped_columns:  RefCell<BTreeSet<(String, String)>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record built from a JSON object and return its id
    pub fn insert(&self, model: &str, values: Value) -> RecordId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let mut record = match values {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        record.insert("id".to_string(), Value::from(id));
        self.tables
            .borrow_mut()
            .entry(model.to_string())
            .or_default()
            .insert(id, record);
        id
    }

    /// Insert `count` records of `model`, the first `with_value` of which hold `value` in `field`
    pub fn populate(&self, model: &str, field: &str, count: usize, with_value: usize, value: &Value) {
        for index in 0..count {
            let mut record = Record::new();
            record.insert(
                field.to_string(),
                if index < with_value {
                    value.clone()
                } else {
                    Value::Bool(false)
                },
            );
            self.insert(model, Value::Object(record));
        }
    }

    /// Every call on `model` fails
    pub fn fail_model(&self, model: &str) {
        self.failing_models.borrow_mut().insert(model.to_string());
    }

    /// Searches and counts on `model` that filter on `field` fail
    pub fn fail_field(&self, model: &str, field: &str) {
        self.failing_fields
            .borrow_mut()
            .insert((model.to_string(), field.to_string()));
    }

    /// Deleting this field definition fails
    pub fn fail_delete(&self, field_id: RecordId) {
        self.failing_deletes.borrow_mut().insert(field_id);
    }

    /// Every field definition delete is refused as with no database connection
    pub fn refuse_deletes(&self) {
        self.refusing_deletes.set(true);
    }

    /// Probing this storage column fails
    pub fn fail_probe(&self, table: &str, column: &str) {
        self.failing_probes
            .borrow_mut()
            .insert((table.to_string(), column.to_string()));
    }

    /// Simulate the storage column of `model.field` being dropped
    pub fn drop_column(&self, model: &str, field: &str) {
        self.dropped_columns
            .borrow_mut()
            .insert((model.to_string(), field.to_string()));
    }

    /// Clear `field` on the first `n` records of `model` that hold a value
    pub fn clear_values(&self, model: &str, field: &str, n: usize) {
        if let Some(table) = self.tables.borrow_mut().get_mut(model) {
            table
                .values_mut()
                .filter(|record| record.get(field).is_some_and(is_truthy))
                .take(n)
                .for_each(|record| {
                    record.insert(field.to_string(), Value::Bool(false));
                });
        }
    }

    pub fn calls(&self) -> Vec<LoggedCall> {
        self.calls.borrow().clone()
    }

    /// Number of logged calls of `method` on `model`
    pub fn call_count(&self, method: &str, model: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.method == method && call.model == model)
            .count()
    }

    pub fn mutations(&self) -> usize {
        self.mutations.get()
    }

    pub fn record(&self, model: &str, id: RecordId) -> Option<Record> {
        self.tables.borrow().get(model)?.get(&id).cloned()
    }

    pub fn contains(&self, model: &str, id: RecordId) -> bool {
        self.record(model, id).is_some()
    }

    fn log(&self, method: &'static str, model: &str, domain: Option<&Domain>) {
        self.calls.borrow_mut().push(LoggedCall {
            method,
            model: model.to_string(),
            domain: domain.cloned(),
        });
    }

    fn check_failures(&self, model: &str, domain: Option<&Domain>) -> Result<()> {
        if self.failing_models.borrow().contains(model) {
            return Err(Report::new(Error::remote_failed(
                "query model",
                format!("injected failure on {model}"),
            )));
        }
        if let Some(domain) = domain {
            let failing = self.failing_fields.borrow();
            if let Some(condition) = domain
                .conditions()
                .iter()
                .find(|c| failing.contains(&(model.to_string(), c.field.clone())))
            {
                return Err(Report::new(Error::remote_failed(
                    "query field",
                    format!("injected failure on {model}.{}", condition.field),
                )));
            }
        }
        Ok(())
    }

    fn matching_ids(&self, model: &str, domain: &Domain) -> Result<Vec<RecordId>> {
        let tables = self.tables.borrow();
        let Some(table) = tables.get(model) else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for (id, record) in table {
            if matches_domain(record, domain)? {
                ids.push(*id);
            }
        }
        Ok(ids)
    }

    fn model_for_table(&self, table: &str) -> Option<String> {
        self.tables
            .borrow()
            .keys()
            .find(|model| model.replace('.', "_") == table)
            .cloned()
    }
}

impl RemoteApi for InMemoryRemote {
    fn search(&self, model: &str, domain: &Domain, limit: Option<usize>) -> Result<Vec<RecordId>> {
        self.log("search", model, Some(domain));
        self.check_failures(model, Some(domain))?;
        let mut ids = self.matching_ids(model, domain)?;
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        Ok(ids)
    }

    fn count(&self, model: &str, domain: &Domain) -> Result<u64> {
        self.log("count", model, Some(domain));
        self.check_failures(model, Some(domain))?;
        Ok(self.matching_ids(model, domain)?.len() as u64)
    }

    fn read(&self, model: &str, ids: &[RecordId], fields: &[&str]) -> Result<Vec<Record>> {
        self.log("read", model, None);
        self.check_failures(model, None)?;
        let tables = self.tables.borrow();
        let table = tables.get(model);
        Ok(ids
            .iter()
            .filter_map(|id| table.and_then(|t| t.get(id)))
            .map(|record| {
                let mut projected = Record::new();
                projected.insert("id".to_string(), record.get("id").cloned().unwrap_or(Value::Null));
                for field in fields {
                    projected.insert(
                        (*field).to_string(),
                        record.get(*field).cloned().unwrap_or(Value::Bool(false)),
                    );
                }
                projected
            })
            .collect())
    }

    fn write(&self, model: &str, id: RecordId, values: &Record) -> Result<bool> {
        self.log("write", model, None);
        self.check_failures(model, None)?;
        let mut tables = self.tables.borrow_mut();
        let record = tables
            .get_mut(model)
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(|| {
                Report::new(Error::remote_failed("write", format!("{model}({id}) does not exist")))
            })?;
        for (key, value) in values {
            record.insert(key.clone(), value.clone());
        }
        self.mutations.set(self.mutations.get() + 1);
        Ok(true)
    }

    fn delete_metadata(&self, field_id: RecordId) -> Result<bool> {
        self.log("delete", MODEL_FIELDS, None);
        if self.refusing_deletes.get() {
            return Err(Report::new(Error::precondition(DIRECT_STORAGE_REQUIRED)));
        }
        self.check_failures(MODEL_FIELDS, None)?;
        if self.failing_deletes.borrow().contains(&field_id) {
            return Err(Report::new(Error::remote_failed(
                "delete field",
                format!("injected failure on field {field_id}"),
            )));
        }
        let removed = self
            .tables
            .borrow_mut()
            .get_mut(MODEL_FIELDS)
            .and_then(|table| table.remove(&field_id));
        if removed.is_none() {
            return Err(Report::new(Error::remote_failed(
                "delete field",
                format!("field {field_id} does not exist"),
            )));
        }
        self.mutations.set(self.mutations.get() + 1);
        Ok(true)
    }
}

impl StorageProbe for InMemoryRemote {
    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        if self
            .failing_probes
            .borrow()
            .contains(&(table.to_string(), column.to_string()))
        {
            return Err(Report::new(Error::Storage(format!(
                "injected probe failure on {table}.{column}"
            ))));
        }
        let Some(model) = self.model_for_table(table) else {
            return Ok(false);
        };
        if self
            .dropped_columns
            .borrow()
            .contains(&(model.clone(), column.to_string()))
        {
            return Ok(false);
        }
        Ok(self
            .tables
            .borrow()
            .get(&model)
            .is_some_and(|records| records.values().any(|r| r.contains_key(column))))
    }

    fn non_null_count(&self, table: &str, column: &str, _unset: UnsetValue) -> Result<u64> {
        let Some(model) = self.model_for_table(table) else {
            return Ok(0);
        };
        Ok(self.tables.borrow().get(&model).map_or(0, |records| {
            records
                .values()
                .filter(|r| r.get(column).is_some_and(is_truthy))
                .count() as u64
        }))
    }
}

fn matches_domain(record: &Record, domain: &Domain) -> Result<bool> {
    for condition in domain.conditions() {
        if !matches_condition(record, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_condition(record: &Record, condition: &Condition) -> Result<bool> {
    let actual = record.get(&condition.field).cloned().unwrap_or(Value::Bool(false));
    let equal = |expected: &Value| {
        if expected == &Value::Bool(false) {
            !is_truthy(&actual)
        } else {
            &actual == expected
        }
    };
    Ok(match condition.operator {
        Operator::Eq => equal(&condition.value),
        Operator::Ne => !equal(&condition.value),
        Operator::Like => like(&actual, &condition.value, true)?,
        Operator::EqLike => like(&actual, &condition.value, false)?,
        Operator::In => condition
            .value
            .as_array()
            .is_some_and(|values| values.iter().any(equal)),
        Operator::NotIn => !condition
            .value
            .as_array()
            .is_some_and(|values| values.iter().any(equal)),
    })
}

fn like(actual: &Value, pattern: &Value, contains: bool) -> Result<bool> {
    let (Some(text), Some(pattern)) = (actual.as_str(), pattern.as_str()) else {
        return Ok(false);
    };
    let mut expression = String::from("^");
    if contains {
        expression.push_str(".*");
    }
    for ch in pattern.chars() {
        match ch {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    if contains {
        expression.push_str(".*");
    }
    expression.push('$');
    let regex = Regex::new(&expression)
        .map_err(|e| Report::new(Error::invalid("like pattern", e)))?;
    Ok(regex.is_match(text))
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "tests panic on setup failure")]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn domain_evaluation_covers_every_operator() {
        let remote = InMemoryRemote::new();
        remote.insert("res.partner", json!({"ref": "V100", "supplier_rank": 0}));
        remote.insert("res.partner", json!({"ref": "C200", "supplier_rank": 1}));
        remote.insert("res.partner", json!({"ref": false}));

        let count = |domain: Domain| remote.count("res.partner", &domain).expect("count");

        assert_eq!(count(Domain::all()), 3);
        assert_eq!(count(Domain::is_set("ref")), 2);
        assert_eq!(count(Domain::all().with("ref", Operator::EqLike, "V%")), 1);
        assert_eq!(count(Domain::all().with("ref", Operator::Like, "20")), 1);
        assert_eq!(count(Domain::all().with("supplier_rank", Operator::Eq, 1)), 1);
        assert_eq!(
            count(Domain::all().with("ref", Operator::In, json!(["V100", "C200"]))),
            2
        );
        assert_eq!(
            count(Domain::all().with("ref", Operator::NotIn, json!(["V100"]))),
            2
        );
    }

    #[test]
    fn writes_are_counted_and_logged() {
        let remote = InMemoryRemote::new();
        let id = remote.insert("res.partner", json!({"customer_rank": 0}));
        let mut values = Record::new();
        values.insert("customer_rank".to_string(), json!(1));

        remote.write("res.partner", id, &values).expect("write");

        assert_eq!(remote.mutations(), 1);
        assert_eq!(remote.call_count("write", "res.partner"), 1);
        assert_eq!(
            remote.record("res.partner", id).and_then(|r| r.get("customer_rank").cloned()),
            Some(json!(1))
        );
    }

    #[test]
    fn injected_field_failure_only_hits_that_field() {
        let remote = InMemoryRemote::new();
        remote.insert("sale.order", json!({"x_studio_a": "x", "x_studio_b": "y"}));
        remote.fail_field("sale.order", "x_studio_b");

        assert!(remote.count("sale.order", &Domain::is_set("x_studio_a")).is_ok());
        assert!(remote.count("sale.order", &Domain::is_set("x_studio_b")).is_err());
        assert!(remote.count("sale.order", &Domain::all()).is_ok());
    }

    #[test]
    fn storage_survives_metadata_deletion() {
        let remote = InMemoryRemote::new();
        remote.populate("res.partner", "x_studio_tier", 4, 3, &json!("gold"));
        let field_id = remote.insert(
            MODEL_FIELDS,
            json!({"model": "res.partner", "name": "x_studio_tier", "state": "manual"}),
        );

        remote.delete_metadata(field_id).expect("delete");

        assert!(!remote.contains(MODEL_FIELDS, field_id));
        assert!(remote.column_exists("res_partner", "x_studio_tier").expect("probe"));
        assert_eq!(
            remote
                .non_null_count("res_partner", "x_studio_tier", UnsetValue::Null)
                .expect("probe"),
            3
        );
    }

    #[test]
    fn refused_deletes_change_nothing() {
        let remote = InMemoryRemote::new();
        let field_id = remote.insert(
            MODEL_FIELDS,
            json!({"model": "res.partner", "name": "x_studio_tier", "state": "manual"}),
        );
        remote.refuse_deletes();

        let error = remote.delete_metadata(field_id).expect_err("refused");

        assert!(error.current_context().is_precondition());
        assert!(remote.contains(MODEL_FIELDS, field_id));
        assert_eq!(remote.mutations(), 0);
    }
}
