//! HTTP transport for the Odoo JSON-RPC endpoint
//!
//! Owns URL building, request sending, status checking and envelope parsing.
//! Every failure below the JSON-RPC layer is a connectivity error.

use std::time::Duration;

use error_stack::Report;
use serde_json::Value;
use tracing::{debug, warn};

use super::constants::{JSONRPC_PATH, REQUEST_TIMEOUT_SECS};
use super::types::{JsonRpcResponse, ResponseStatus};
use crate::error::{Error, Result};

/// Blocking HTTP client bound to one server
pub struct RpcHttpClient {
    client: reqwest::blocking::Client,
    url:    String,
}

impl RpcHttpClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                Report::new(Error::Connectivity("HTTP client setup failed".to_string()))
                    .attach(format!("Error: {e}"))
            })?;

        Ok(Self {
            client,
            url: format!("{}{JSONRPC_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// Endpoint every request is posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one JSON-RPC envelope and decode the response
    pub fn call(&self, body: &Value, label: &str) -> Result<ResponseStatus> {
        debug!("JSON-RPC {label}: POST {}", self.url);

        let response = match self.client.post(&self.url).json(body).send() {
            Ok(resp) => resp,
            Err(e) => return Err(self.handle_error(&e, label)),
        };

        self.check_status(&response, label)?;

        let envelope: JsonRpcResponse = response.json().map_err(|e| {
            warn!("JSON-RPC {label}: response parsing failed - error={e}");
            Report::new(Error::Connectivity("JSON parsing failed".to_string()))
                .attach(format!("Failed to parse JSON-RPC response for {label}"))
                .attach(format!("URL: {}", self.url))
                .attach(format!("Error: {e}"))
        })?;

        Ok(ResponseStatus::from(envelope))
    }

    /// Check if the HTTP response status is successful
    fn check_status(&self, response: &reqwest::blocking::Response, label: &str) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            warn!("JSON-RPC {label}: HTTP status error - status={status}");
            return Err(Report::new(Error::Connectivity("HTTP error".to_string()))
                .attach(format!(
                    "Server returned HTTP error {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown error")
                ))
                .attach(format!("Call: {label}, URL: {}", self.url)));
        }
        Ok(())
    }

    /// Classify a transport error
    fn handle_error(&self, e: &reqwest::Error, label: &str) -> Report<Error> {
        warn!("JSON-RPC {label}: HTTP request failed - error={e}");

        let error_type = if e.is_timeout() {
            "Timeout"
        } else if e.is_connect() {
            "Connection failed"
        } else if e.is_request() {
            "Request error"
        } else if e.is_body() {
            "Body error"
        } else if e.is_decode() {
            "Decode error"
        } else {
            "Unknown error type"
        };

        Report::new(Error::Connectivity(format!(
            "HTTP request failed for {label} - {error_type}: {e}"
        )))
        .attach(format!("URL: {}", self.url))
        .attach(format!("Full error: {e:?}"))
    }
}
