//! Concrete `RemoteApi` adapter over Odoo's JSON-RPC endpoint
//!
//! Field definitions are never removed through the ORM: `ir.model.fields.unlink`
//! drops the storage column along with the row. Deletes go through an attached
//! database connection and are refused when there is none.

use error_stack::{Report, ResultExt};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::api::{Record, RecordId, RemoteApi};
use super::constants::{MODEL_USERS, SERVICE_COMMON, SERVICE_OBJECT};
use super::domain::Domain;
use super::http_client::RpcHttpClient;
use super::json_rpc_builder::JsonRpcBuilder;
use super::types::ResponseStatus;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::storage::{DIRECT_STORAGE_REQUIRED, PgStorage};

/// Authenticated session against one Odoo database
pub struct OdooClient {
    http:     RpcHttpClient,
    database: String,
    password: String,
    uid:      i64,
    direct:   Option<PgStorage>,
}

impl OdooClient {
    /// Authenticate and return a ready client
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let http = RpcHttpClient::new(&config.url)?;

        let body = JsonRpcBuilder::new(SERVICE_COMMON, "authenticate")
            .arg(config.database.as_str())
            .arg(config.username.as_str())
            .arg(config.password.as_str())
            .arg(json!({}))
            .build();

        let result = expect_success(http.call(&body, "authenticate")?, "authenticate")
            .change_context(Error::Connectivity("Authentication call rejected".to_string()))?;

        let uid = result.as_i64().filter(|uid| *uid > 0).ok_or_else(|| {
            warn!("Authentication failed for '{}' on '{}'", config.username, config.database);
            Report::new(Error::Connectivity(
                "Authentication failed - check username/password".to_string(),
            ))
            .attach(format!("Database: {}, URL: {}", config.database, config.url))
        })?;

        info!("Authenticated as uid {uid} on {} via {}", config.database, http.url());

        Ok(Self {
            http,
            database: config.database.clone(),
            password: config.password.clone(),
            uid,
            direct: None,
        })
    }

    /// Route field definition deletes through `storage`
    #[must_use]
    pub fn with_direct_storage(mut self, storage: PgStorage) -> Self {
        self.direct = Some(storage);
        self
    }

    pub const fn direct_storage(&self) -> Option<&PgStorage> {
        self.direct.as_ref()
    }

    pub const fn uid(&self) -> i64 {
        self.uid
    }

    /// Server version information from the `common` service
    pub fn server_version(&self) -> Result<Value> {
        let body = JsonRpcBuilder::new(SERVICE_COMMON, "version").build();
        expect_success(self.http.call(&body, "version")?, "version")
    }

    /// Name, login and company of the authenticated user
    pub fn current_user(&self) -> Result<Record> {
        self.read(MODEL_USERS, &[self.uid], &["name", "login", "company_id"])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Report::new(Error::remote_failed(
                    "read current user",
                    format!("uid {} not found", self.uid),
                ))
            })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Invoke `model.method(*args, **kwargs)` through `object/execute_kw`
    pub fn execute_kw(
        &self,
        model: &str,
        method: &'static str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let label = format!("{model}.{method}");
        let body = self.execute_kw_body(model, method, args, kwargs);
        debug!("execute_kw {label}");
        expect_success(self.http.call(&body, &label)?, &label)
    }

    fn execute_kw_body(
        &self,
        model: &str,
        method: &'static str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Value {
        JsonRpcBuilder::new(SERVICE_OBJECT, "execute_kw")
            .arg(self.database.as_str())
            .arg(self.uid)
            .arg(self.password.as_str())
            .arg(model)
            .arg(method)
            .arg(args)
            .arg(kwargs)
            .build()
    }
}

impl RemoteApi for OdooClient {
    fn search(&self, model: &str, domain: &Domain, limit: Option<usize>) -> Result<Vec<RecordId>> {
        let mut kwargs = Map::new();
        if let Some(limit) = limit {
            kwargs.insert("limit".to_string(), json!(limit));
        }
        let value = self.execute_kw(model, "search", vec![domain.to_wire()], kwargs)?;
        decode(value, model, "search")
    }

    fn count(&self, model: &str, domain: &Domain) -> Result<u64> {
        let value = self.execute_kw(model, "search_count", vec![domain.to_wire()], Map::new())?;
        decode(value, model, "search_count")
    }

    fn read(&self, model: &str, ids: &[RecordId], fields: &[&str]) -> Result<Vec<Record>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".to_string(), json!(fields));
        let value = self.execute_kw(model, "read", vec![json!(ids)], kwargs)?;
        decode(value, model, "read")
    }

    fn write(&self, model: &str, id: RecordId, values: &Record) -> Result<bool> {
        let value = self.execute_kw(
            model,
            "write",
            vec![json!([id]), Value::Object(values.clone())],
            Map::new(),
        )?;
        decode(value, model, "write")
    }

    fn delete_metadata(&self, field_id: RecordId) -> Result<bool> {
        let Some(storage) = &self.direct else {
            return Err(Report::new(Error::precondition(DIRECT_STORAGE_REQUIRED))
                .attach(format!("Field definition {field_id} was left in place")));
        };
        storage.delete_field_definition(field_id)
    }

    fn search_read(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<Record>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".to_string(), json!(fields));
        if let Some(limit) = limit {
            kwargs.insert("limit".to_string(), json!(limit));
        }
        let value = self.execute_kw(model, "search_read", vec![domain.to_wire()], kwargs)?;
        decode(value, model, "search_read")
    }
}

fn expect_success(status: ResponseStatus, label: &str) -> Result<Value> {
    match status {
        ResponseStatus::Success(value) => Ok(value),
        ResponseStatus::Fault(fault) => {
            warn!("JSON-RPC {label}: server returned fault - {fault}");
            Err(Report::new(Error::remote_failed(label, &fault.message))
                .attach(format!("Remote exception: {fault}")))
        },
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, model: &str, method: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        Report::new(Error::remote_failed(
            &format!("decode {model}.{method} result"),
            e,
        ))
    })
}
